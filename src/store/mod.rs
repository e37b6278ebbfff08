//! The remote table store, seen from the client.
//!
//! [`TableStore`] is the request/response vocabulary a client speaks to the
//! cluster. Every call blocks until the store answers. Region location,
//! retries and durability belong to the implementation behind the trait,
//! not to the caller.

pub mod memory;

use crate::cell::RowResult;
use crate::descriptor::TableDescriptor;
use crate::error::Result;
use crate::request::{Action, BatchOutcome, Condition, Get, Mutation, Scan};

pub use memory::MemoryStore;

pub trait TableStore: Send + Sync {
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Creates a table. Fails with `TableExists` if the name is taken.
    fn create_table(&self, descriptor: TableDescriptor) -> Result<()>;

    fn list_tables(&self) -> Result<Vec<TableDescriptor>>;

    /// Point lookup. A missing row is an empty result.
    fn get(&self, table: &str, get: &Get) -> Result<RowResult>;

    fn mutate(&self, table: &str, mutation: &Mutation) -> Result<()>;

    /// Runs every action in one round trip. The outer error covers the whole
    /// call (unreachable store, unknown table); the inner results are
    /// per action, aligned with the input.
    fn batch(&self, table: &str, actions: &[Action]) -> Result<Vec<Result<BatchOutcome>>>;

    /// Returns up to `limit` non-empty rows of `scan`, starting after
    /// `resume_after` when given.
    fn scan_batch(
        &self,
        table: &str,
        scan: &Scan,
        resume_after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RowResult>>;

    /// Applies `mutation` only if the condition cell currently matches,
    /// atomically with respect to other writes to the row. The mutation must
    /// target the condition's row; otherwise the call fails with
    /// `RowMismatch` and nothing is written.
    fn check_and_mutate(&self, table: &str, condition: &Condition, mutation: &Mutation)
        -> Result<bool>;
}
