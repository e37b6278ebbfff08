//! The table client.
//!
//! [`TableClient`] turns parameterized calls into [`TableStore`] requests.
//! Arguments are checked before anything is sent, so a caller error never
//! costs a round trip. In batches a malformed entry fails only its own
//! slot while the remaining entries still go out in one call.

use std::sync::Arc;

use crate::admin::Admin;
use crate::cell::{Cell, RowResult};
use crate::config::ClientConfig;
use crate::descriptor::{ColumnFamilyDescriptor, TableDescriptor};
use crate::encoding::format::Raw;
use crate::error::{Error, Result};
use crate::request::{Action, BatchOutcome, Condition, Delete, Get, Mutation, Put, Scan};
use crate::scanner::ResultScanner;
use crate::store::TableStore;

/// What `create_table` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A table of that name was already there; it was left untouched.
    AlreadyExists,
}

#[derive(Clone)]
pub struct TableClient {
    config: Arc<ClientConfig>,
    store: Arc<dyn TableStore>,
}

impl std::fmt::Debug for TableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn column_without_family() -> Error {
    Error::invalid_argument("column given without a column family")
}

impl TableClient {
    pub fn new(config: ClientConfig, store: Arc<dyn TableStore>) -> Result<Self> {
        config.validate()?;
        tracing::debug!(quorum = %config.coordination_address(), "table client ready");
        Ok(Self {
            config: Arc::new(config),
            store,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn admin(&self) -> Admin {
        Admin::new(Arc::clone(&self.store))
    }

    /// Creates `table` with the single column family `family`, unless a
    /// table of that name exists already.
    pub fn create_table(&self, table: &str, family: impl AsRef<[u8]>) -> Result<CreateOutcome> {
        let descriptor = TableDescriptor::new(table).add_family(ColumnFamilyDescriptor::new(family));
        descriptor.validate()?;

        let admin = self.admin();
        if admin.table_exists(table)? {
            tracing::info!(table, "table already exists");
            return Ok(CreateOutcome::AlreadyExists);
        }

        match admin.create_table(descriptor) {
            Ok(()) => Ok(CreateOutcome::Created),
            // Lost a race with another creator.
            Err(Error::TableExists(_)) => {
                tracing::info!(table, "table already exists");
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(err) => Err(err),
        }
    }

    pub fn put(&self, table: &str, put: Put) -> Result<()> {
        put.validate()?;
        tracing::debug!(
            table,
            row = %Raw::bytes(put.row()),
            cells = put.cells().len(),
            "put"
        );
        self.store.mutate(table, &Mutation::Put(put))
    }

    /// Writes a single cell.
    pub fn put_cell(
        &self,
        table: &str,
        row: impl AsRef<[u8]>,
        family: impl AsRef<[u8]>,
        column: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<()> {
        self.put(table, Put::new(row).add_column(family, column, value))
    }

    /// Point lookup. A missing row gives an empty result.
    pub fn get(&self, table: &str, get: &Get) -> Result<RowResult> {
        get.validate()?;
        tracing::debug!(table, row = %Raw::bytes(get.row()), "get");
        self.store.get(table, get)
    }

    /// Reads a whole row, one family of it, or the latest version of one
    /// column.
    pub fn get_cells(
        &self,
        table: &str,
        row: impl AsRef<[u8]>,
        family: Option<&[u8]>,
        column: Option<&[u8]>,
    ) -> Result<RowResult> {
        let get = match (family, column) {
            (None, None) => Get::new(row),
            (Some(family), None) => Get::new(row).add_family(family),
            (Some(family), Some(column)) => Get::new(row).add_column(family, column),
            (None, Some(_)) => return Err(column_without_family()),
        };
        self.get(table, &get)
    }

    /// Every stored version of one column, newest first.
    pub fn column_versions(
        &self,
        table: &str,
        row: impl AsRef<[u8]>,
        family: impl AsRef<[u8]>,
        column: impl AsRef<[u8]>,
    ) -> Result<Vec<Cell>> {
        let get = Get::new(row)
            .add_column(family, column)
            .max_versions(u32::MAX);
        Ok(self.get(table, &get)?.into_cells())
    }

    /// Runs all lookups in one round trip. Outcomes line up with `gets`: a
    /// missing row is an empty result in its slot, and a lookup that could
    /// not be served is a `BatchEntry` error in its slot. The outer error is
    /// for failures of the whole call.
    pub fn batch_get(&self, table: &str, gets: &[Get]) -> Result<Vec<Result<RowResult>>> {
        let actions: Vec<Action> = gets.iter().cloned().map(Action::Get).collect();
        Ok(self
            .submit(table, &actions)?
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| match outcome {
                Ok(BatchOutcome::Fetched(result)) => Ok(result),
                Ok(BatchOutcome::Applied) => Err(Error::BatchEntry {
                    index,
                    source: Box::new(Error::Decode("get answered without a result".to_string())),
                }),
                Err(err) => Err(Error::BatchEntry {
                    index,
                    source: Box::new(err),
                }),
            })
            .collect())
    }

    /// Opens a lazy scanner. Nothing is fetched until the first row is
    /// pulled.
    pub fn scan(&self, table: &str, scan: Scan) -> Result<ResultScanner> {
        scan.validate()?;
        let caching = scan.caching_rows().unwrap_or(self.config.scanner_caching);
        tracing::debug!(
            table,
            start = %scan.start_row().map(Raw::bytes).unwrap_or_default(),
            stop = %scan.stop_row().map(Raw::bytes).unwrap_or_default(),
            caching,
            "scan"
        );
        Ok(ResultScanner::new(
            Arc::clone(&self.store),
            table,
            scan,
            caching,
        ))
    }

    /// Scans `[start, stop)`; a missing bound is open.
    pub fn scan_range(
        &self,
        table: &str,
        start: Option<&[u8]>,
        stop: Option<&[u8]>,
    ) -> Result<ResultScanner> {
        let mut scan = Scan::new();
        if let Some(start) = start {
            scan = scan.with_start_row(start);
        }
        if let Some(stop) = stop {
            scan = scan.with_stop_row(stop);
        }
        self.scan(table, scan)
    }

    pub fn delete(&self, table: &str, delete: &Delete) -> Result<()> {
        delete.validate()?;
        tracing::debug!(
            table,
            row = %Raw::bytes(delete.row()),
            whole_row = delete.is_whole_row(),
            "delete"
        );
        self.store.mutate(table, &Mutation::Delete(delete.clone()))
    }

    /// Deletes a whole row, one family of it, or every version of one
    /// column.
    pub fn delete_cells(
        &self,
        table: &str,
        row: impl AsRef<[u8]>,
        family: Option<&[u8]>,
        column: Option<&[u8]>,
    ) -> Result<()> {
        let delete = match (family, column) {
            (None, None) => Delete::new(row),
            (Some(family), None) => Delete::new(row).add_family(family),
            (Some(family), Some(column)) => Delete::new(row).add_columns(family, column),
            (None, Some(_)) => return Err(column_without_family()),
        };
        self.delete(table, &delete)
    }

    /// Submits puts and deletes in one round trip. Outcomes line up with
    /// `mutations`. There is no atomicity across entries: a failed slot
    /// leaves the others applied.
    pub fn batch_mutate(&self, table: &str, mutations: &[Mutation]) -> Result<Vec<Result<()>>> {
        let actions: Vec<Action> = mutations.iter().cloned().map(Action::from).collect();
        Ok(self
            .submit(table, &actions)?
            .into_iter()
            .map(|outcome| outcome.map(|_| ()))
            .collect())
    }

    pub fn put_batch(&self, table: &str, puts: Vec<Put>) -> Result<Vec<Result<()>>> {
        if puts.is_empty() {
            return Err(Error::invalid_argument("put batch is empty"));
        }
        let mutations: Vec<Mutation> = puts.into_iter().map(Mutation::Put).collect();
        self.batch_mutate(table, &mutations)
    }

    pub fn delete_batch(&self, table: &str, deletes: Vec<Delete>) -> Result<Vec<Result<()>>> {
        if deletes.is_empty() {
            return Err(Error::invalid_argument("delete batch is empty"));
        }
        let mutations: Vec<Mutation> = deletes.into_iter().map(Mutation::Delete).collect();
        self.batch_mutate(table, &mutations)
    }

    /// Mixed gets, puts and deletes in one round trip, aligned with
    /// `actions`.
    pub fn batch(&self, table: &str, actions: &[Action]) -> Result<Vec<Result<BatchOutcome>>> {
        self.submit(table, actions)
    }

    /// Applies `put` if the cell `family:column` of `row` currently holds
    /// `expected` (or is absent when `expected` is `None`). Returns whether
    /// the put was applied.
    pub fn check_and_put(
        &self,
        table: &str,
        row: impl AsRef<[u8]>,
        family: impl AsRef<[u8]>,
        column: impl AsRef<[u8]>,
        expected: Option<&[u8]>,
        put: Put,
    ) -> Result<bool> {
        let condition = Condition::new(row, family, column, expected);
        self.check_and_mutate(table, condition, Mutation::Put(put))
    }

    /// Like `check_and_put`, with a delete.
    pub fn check_and_delete(
        &self,
        table: &str,
        row: impl AsRef<[u8]>,
        family: impl AsRef<[u8]>,
        column: impl AsRef<[u8]>,
        expected: Option<&[u8]>,
        delete: Delete,
    ) -> Result<bool> {
        let condition = Condition::new(row, family, column, expected);
        self.check_and_mutate(table, condition, Mutation::Delete(delete))
    }

    fn check_and_mutate(&self, table: &str, condition: Condition, mutation: Mutation) -> Result<bool> {
        condition.validate_for(&mutation)?;
        let applied = self.store.check_and_mutate(table, &condition, &mutation)?;
        tracing::debug!(
            table,
            row = %Raw::bytes(&condition.row),
            applied,
            "check and mutate"
        );
        Ok(applied)
    }

    /// Validates every action, sends the valid ones in one store call and
    /// merges the answers back into input order.
    fn submit(&self, table: &str, actions: &[Action]) -> Result<Vec<Result<BatchOutcome>>> {
        let mut slots: Vec<Option<Result<BatchOutcome>>> = Vec::with_capacity(actions.len());
        let mut positions = Vec::with_capacity(actions.len());
        let mut valid = Vec::with_capacity(actions.len());

        for (index, action) in actions.iter().enumerate() {
            match action.validate() {
                Ok(()) => {
                    positions.push(index);
                    valid.push(action.clone());
                    slots.push(None);
                }
                Err(err) => slots.push(Some(Err(err))),
            }
        }

        if !valid.is_empty() {
            let outcomes = self.store.batch(table, &valid)?;
            if outcomes.len() != valid.len() {
                return Err(Error::Decode(format!(
                    "batch response with {} entries for {} actions",
                    outcomes.len(),
                    valid.len()
                )));
            }
            for (index, outcome) in positions.into_iter().zip(outcomes) {
                slots[index] = Some(outcome);
            }
        }

        let results: Vec<Result<BatchOutcome>> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(Error::Decode("batch entry without outcome".to_string())))
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!(table, entries = results.len(), failed, "batch finished with failures");
        } else {
            tracing::debug!(table, entries = results.len(), "batch");
        }
        Ok(results)
    }
}
