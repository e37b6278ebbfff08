//! In-process table store.
//!
//! Each table is a single [`Region`]: a sorted skip list of cell versions.
//! Nothing is written to disk. The store can be switched offline to stand
//! in for an unreachable cluster.

pub mod region;
pub mod row_lock;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cell::RowResult;
use crate::descriptor::TableDescriptor;
use crate::error::{Error, Result};
use crate::request::{Action, BatchOutcome, Condition, Get, Mutation, Scan};
use crate::store::TableStore;

pub use region::Region;
pub use row_lock::RowLocks;

/// Hands out strictly increasing millisecond timestamps, so a later write
/// to a column always becomes its newest version.
#[derive(Debug, Default)]
pub struct Clock {
    last: AtomicU64,
}

impl Clock {
    pub fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Arc<Region>>>,
    clock: Clock,
    online: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            clock: Clock::default(),
            online: AtomicBool::new(true),
        }
    }

    /// Takes the store on or offline. While offline every call fails with
    /// `Error::Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        tracing::info!(online, "memory store availability changed");
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable("memory store is offline".to_string()))
        }
    }

    fn region(&self, table: &str) -> Result<Arc<Region>> {
        self.ensure_online()?;
        self.tables
            .read()?
            .get(table)
            .cloned()
            .ok_or_else(|| Error::TableNotFound(table.to_string()))
    }

    /// Bytes held by a table's keys and values.
    pub fn table_size(&self, table: &str) -> Result<usize> {
        Ok(self.region(table)?.size())
    }
}

impl TableStore for MemoryStore {
    fn table_exists(&self, table: &str) -> Result<bool> {
        self.ensure_online()?;
        Ok(self.tables.read()?.contains_key(table))
    }

    fn create_table(&self, descriptor: TableDescriptor) -> Result<()> {
        self.ensure_online()?;
        descriptor.validate()?;

        let mut tables = self.tables.write()?;
        if tables.contains_key(descriptor.name()) {
            return Err(Error::TableExists(descriptor.name().to_string()));
        }
        let name = descriptor.name().to_string();
        tables.insert(name.clone(), Arc::new(Region::new(descriptor)));
        tracing::debug!(table = %name, "region created");
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        self.ensure_online()?;
        Ok(self
            .tables
            .read()?
            .values()
            .map(|region| region.descriptor().clone())
            .collect())
    }

    fn get(&self, table: &str, get: &Get) -> Result<RowResult> {
        self.region(table)?.get(get)
    }

    fn mutate(&self, table: &str, mutation: &Mutation) -> Result<()> {
        self.region(table)?.mutate(mutation, &self.clock)
    }

    fn batch(&self, table: &str, actions: &[Action]) -> Result<Vec<Result<BatchOutcome>>> {
        let region = self.region(table)?;

        // Entries are applied in input order.
        Ok(actions
            .iter()
            .map(|action| match action {
                Action::Get(get) => region.get(get).map(BatchOutcome::Fetched),
                Action::Put(put) => region.put(put, &self.clock).map(|_| BatchOutcome::Applied),
                Action::Delete(delete) => region.delete(delete).map(|_| BatchOutcome::Applied),
            })
            .collect())
    }

    fn scan_batch(
        &self,
        table: &str,
        scan: &Scan,
        resume_after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RowResult>> {
        self.region(table)?.scan_rows(scan, resume_after, limit)
    }

    fn check_and_mutate(
        &self,
        table: &str,
        condition: &Condition,
        mutation: &Mutation,
    ) -> Result<bool> {
        self.region(table)?
            .check_and_mutate(condition, mutation, &self.clock)
    }
}
