//! Request builders: Put, Get, Delete, Scan and the batch/condition types
//! built from them.
//!
//! Requests are plain owned values. They are built, handed to a
//! [`TableClient`](crate::TableClient) call, and dropped. Caller errors
//! (empty row keys, a Put without cells, ...) are reported by `validate`,
//! which the client runs before anything is sent to the store.

use std::collections::{BTreeMap, BTreeSet};

use crate::cell::RowResult;
use crate::encoding::format::Raw;
use crate::error::{Error, Result};

/// Longest row key accepted, in bytes.
pub const MAX_ROW_LENGTH: usize = i16::MAX as usize;

fn validate_row(row: &[u8]) -> Result<()> {
    if row.is_empty() {
        return Err(Error::invalid_argument("row key is empty"));
    }
    if row.len() > MAX_ROW_LENGTH {
        return Err(Error::invalid_argument(format!(
            "row key is {} bytes, limit is {}",
            row.len(),
            MAX_ROW_LENGTH
        )));
    }
    Ok(())
}

fn validate_max_versions(versions: u32) -> Result<()> {
    if versions == 0 {
        return Err(Error::invalid_argument("max versions must be at least 1"));
    }
    Ok(())
}

/// A single cell write carried by a [`Put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCell {
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    /// Explicit version; the store assigns one when `None`.
    pub timestamp: Option<u64>,
    pub value: Vec<u8>,
}

/// Writes one or more cells of a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put {
    row: Vec<u8>,
    cells: Vec<PutCell>,
}

impl Put {
    pub fn new(row: impl AsRef<[u8]>) -> Self {
        Self {
            row: row.as_ref().to_vec(),
            cells: Vec::new(),
        }
    }

    pub fn add_column(
        mut self,
        family: impl AsRef<[u8]>,
        qualifier: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Self {
        self.cells.push(PutCell {
            family: family.as_ref().to_vec(),
            qualifier: qualifier.as_ref().to_vec(),
            timestamp: None,
            value: value.as_ref().to_vec(),
        });
        self
    }

    pub fn add_column_at(
        mut self,
        family: impl AsRef<[u8]>,
        qualifier: impl AsRef<[u8]>,
        timestamp: u64,
        value: impl AsRef<[u8]>,
    ) -> Self {
        self.cells.push(PutCell {
            family: family.as_ref().to_vec(),
            qualifier: qualifier.as_ref().to_vec(),
            timestamp: Some(timestamp),
            value: value.as_ref().to_vec(),
        });
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn cells(&self) -> &[PutCell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        validate_row(&self.row)?;
        if self.cells.is_empty() {
            return Err(Error::invalid_argument(format!(
                "put for row {} has no columns to insert",
                Raw::bytes(&self.row)
            )));
        }
        if self.cells.iter().any(|c| c.family.is_empty()) {
            return Err(Error::invalid_argument("put cell without a column family"));
        }
        Ok(())
    }
}

/// Families and qualifiers a read is restricted to. Empty means every family.
///
/// A family mapped to `None` selects the whole family; `Some(set)` selects
/// only the named qualifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    families: BTreeMap<Vec<u8>, Option<BTreeSet<Vec<u8>>>>,
}

impl ColumnSelection {
    pub fn add_family(&mut self, family: &[u8]) {
        self.families.insert(family.to_vec(), None);
    }

    pub fn add_column(&mut self, family: &[u8], qualifier: &[u8]) {
        self.families
            .entry(family.to_vec())
            .or_insert(None)
            .get_or_insert_with(BTreeSet::new)
            .insert(qualifier.to_vec());
    }

    pub fn is_all(&self) -> bool {
        self.families.is_empty()
    }

    /// Families named explicitly by the selection.
    pub fn families(&self) -> impl Iterator<Item = &[u8]> {
        self.families.keys().map(Vec::as_slice)
    }

    pub fn accepts(&self, family: &[u8], qualifier: &[u8]) -> bool {
        if self.is_all() {
            return true;
        }
        match self.families.get(family) {
            Some(None) => true,
            Some(Some(qualifiers)) => qualifiers.contains(qualifier),
            None => false,
        }
    }
}

/// Point lookup of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Get {
    row: Vec<u8>,
    columns: ColumnSelection,
    max_versions: u32,
}

impl Get {
    pub fn new(row: impl AsRef<[u8]>) -> Self {
        Self {
            row: row.as_ref().to_vec(),
            columns: ColumnSelection::default(),
            max_versions: 1,
        }
    }

    /// Restrict to a whole family. Widens any earlier column restriction on it.
    pub fn add_family(mut self, family: impl AsRef<[u8]>) -> Self {
        self.columns.add_family(family.as_ref());
        self
    }

    /// Restrict to a single column. Narrows an earlier whole-family restriction.
    pub fn add_column(mut self, family: impl AsRef<[u8]>, qualifier: impl AsRef<[u8]>) -> Self {
        self.columns.add_column(family.as_ref(), qualifier.as_ref());
        self
    }

    pub fn max_versions(mut self, versions: u32) -> Self {
        self.max_versions = versions;
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn columns(&self) -> &ColumnSelection {
        &self.columns
    }

    pub fn versions(&self) -> u32 {
        self.max_versions
    }

    pub fn validate(&self) -> Result<()> {
        validate_row(&self.row)?;
        validate_max_versions(self.max_versions)
    }
}

/// What a [`Delete`] removes within its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    /// Every cell of a family.
    Family(Vec<u8>),
    /// The newest version of a column.
    LatestVersion(Vec<u8>, Vec<u8>),
    /// Every version of a column.
    AllVersions(Vec<u8>, Vec<u8>),
}

impl DeleteTarget {
    pub fn family(&self) -> &[u8] {
        match self {
            DeleteTarget::Family(f)
            | DeleteTarget::LatestVersion(f, _)
            | DeleteTarget::AllVersions(f, _) => f,
        }
    }
}

/// Removes a whole row, or the families and columns added to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    row: Vec<u8>,
    targets: Vec<DeleteTarget>,
}

impl Delete {
    /// Deletes the entire row unless narrowed.
    pub fn new(row: impl AsRef<[u8]>) -> Self {
        Self {
            row: row.as_ref().to_vec(),
            targets: Vec::new(),
        }
    }

    pub fn add_family(mut self, family: impl AsRef<[u8]>) -> Self {
        self.targets
            .push(DeleteTarget::Family(family.as_ref().to_vec()));
        self
    }

    /// Deletes only the newest version of the column.
    pub fn add_column(mut self, family: impl AsRef<[u8]>, qualifier: impl AsRef<[u8]>) -> Self {
        self.targets.push(DeleteTarget::LatestVersion(
            family.as_ref().to_vec(),
            qualifier.as_ref().to_vec(),
        ));
        self
    }

    /// Deletes every version of the column.
    pub fn add_columns(mut self, family: impl AsRef<[u8]>, qualifier: impl AsRef<[u8]>) -> Self {
        self.targets.push(DeleteTarget::AllVersions(
            family.as_ref().to_vec(),
            qualifier.as_ref().to_vec(),
        ));
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn targets(&self) -> &[DeleteTarget] {
        &self.targets
    }

    pub fn is_whole_row(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        validate_row(&self.row)?;
        if self.targets.iter().any(|t| t.family().is_empty()) {
            return Err(Error::invalid_argument("delete target without a column family"));
        }
        Ok(())
    }
}

/// Default number of rows fetched per scanner round trip.
pub const DEFAULT_SCANNER_CACHING: usize = 100;

/// Forward iteration over `[start_row, stop_row)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    start_row: Option<Vec<u8>>,
    stop_row: Option<Vec<u8>>,
    columns: ColumnSelection,
    max_versions: u32,
    caching: Option<usize>,
}

impl Default for Scan {
    fn default() -> Self {
        Self::new()
    }
}

impl Scan {
    /// Scans the entire table.
    pub fn new() -> Self {
        Self {
            start_row: None,
            stop_row: None,
            columns: ColumnSelection::default(),
            max_versions: 1,
            caching: None,
        }
    }

    /// Inclusive lower bound.
    pub fn with_start_row(mut self, row: impl AsRef<[u8]>) -> Self {
        self.start_row = Some(row.as_ref().to_vec());
        self
    }

    /// Exclusive upper bound.
    pub fn with_stop_row(mut self, row: impl AsRef<[u8]>) -> Self {
        self.stop_row = Some(row.as_ref().to_vec());
        self
    }

    pub fn add_family(mut self, family: impl AsRef<[u8]>) -> Self {
        self.columns.add_family(family.as_ref());
        self
    }

    pub fn add_column(mut self, family: impl AsRef<[u8]>, qualifier: impl AsRef<[u8]>) -> Self {
        self.columns.add_column(family.as_ref(), qualifier.as_ref());
        self
    }

    pub fn max_versions(mut self, versions: u32) -> Self {
        self.max_versions = versions;
        self
    }

    /// Rows fetched per round trip. Falls back to the client configuration.
    pub fn caching(mut self, rows: usize) -> Self {
        self.caching = Some(rows);
        self
    }

    pub fn start_row(&self) -> Option<&[u8]> {
        self.start_row.as_deref()
    }

    pub fn stop_row(&self) -> Option<&[u8]> {
        self.stop_row.as_deref()
    }

    pub fn columns(&self) -> &ColumnSelection {
        &self.columns
    }

    pub fn versions(&self) -> u32 {
        self.max_versions
    }

    pub fn caching_rows(&self) -> Option<usize> {
        self.caching
    }

    pub fn validate(&self) -> Result<()> {
        validate_max_versions(self.max_versions)?;
        if self.caching == Some(0) {
            return Err(Error::invalid_argument("scanner caching must be at least 1"));
        }
        if let (Some(start), Some(stop)) = (&self.start_row, &self.stop_row) {
            // An empty stop row means "to the end of the table".
            if !stop.is_empty() && start > stop {
                return Err(Error::invalid_argument(format!(
                    "start row {} sorts after stop row {}",
                    Raw::bytes(start),
                    Raw::bytes(stop)
                )));
            }
        }
        Ok(())
    }
}

/// A write submitted on its own or inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Put(Put),
    Delete(Delete),
}

impl Mutation {
    pub fn row(&self) -> &[u8] {
        match self {
            Mutation::Put(put) => put.row(),
            Mutation::Delete(delete) => delete.row(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Mutation::Put(put) => put.validate(),
            Mutation::Delete(delete) => delete.validate(),
        }
    }
}

impl From<Put> for Mutation {
    fn from(put: Put) -> Self {
        Mutation::Put(put)
    }
}

impl From<Delete> for Mutation {
    fn from(delete: Delete) -> Self {
        Mutation::Delete(delete)
    }
}

/// One entry of a heterogeneous batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Get(Get),
    Put(Put),
    Delete(Delete),
}

impl Action {
    pub fn row(&self) -> &[u8] {
        match self {
            Action::Get(get) => get.row(),
            Action::Put(put) => put.row(),
            Action::Delete(delete) => delete.row(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Action::Get(get) => get.validate(),
            Action::Put(put) => put.validate(),
            Action::Delete(delete) => delete.validate(),
        }
    }
}

impl From<Get> for Action {
    fn from(get: Get) -> Self {
        Action::Get(get)
    }
}

impl From<Put> for Action {
    fn from(put: Put) -> Self {
        Action::Put(put)
    }
}

impl From<Delete> for Action {
    fn from(delete: Delete) -> Self {
        Action::Delete(delete)
    }
}

impl From<Mutation> for Action {
    fn from(mutation: Mutation) -> Self {
        match mutation {
            Mutation::Put(put) => Action::Put(put),
            Mutation::Delete(delete) => Action::Delete(delete),
        }
    }
}

/// Outcome of one successful batch entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Result of a Get entry; empty when the row does not exist.
    Fetched(RowResult),
    /// A Put or Delete entry was applied.
    Applied,
}

/// Expected state of one cell for check-and-mutate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    /// `None` requires the cell to be absent.
    pub expected: Option<Vec<u8>>,
}

impl Condition {
    pub fn new(
        row: impl AsRef<[u8]>,
        family: impl AsRef<[u8]>,
        qualifier: impl AsRef<[u8]>,
        expected: Option<&[u8]>,
    ) -> Self {
        Self {
            row: row.as_ref().to_vec(),
            family: family.as_ref().to_vec(),
            qualifier: qualifier.as_ref().to_vec(),
            expected: expected.map(<[u8]>::to_vec),
        }
    }

    /// Checks the condition can be paired with `mutation`: both must target
    /// the same row.
    pub fn validate_for(&self, mutation: &Mutation) -> Result<()> {
        validate_row(&self.row)?;
        if self.family.is_empty() {
            return Err(Error::invalid_argument("condition without a column family"));
        }
        mutation.validate()?;
        if mutation.row() != self.row.as_slice() {
            return Err(Error::RowMismatch {
                check: self.row.clone(),
                mutation: mutation.row().to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_put_validation() {
        assert!(Put::new("row1").add_column("f", "q", "v").validate().is_ok());

        let err = Put::new("row1").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Caller);

        assert!(Put::new("").add_column("f", "q", "v").validate().is_err());
        assert!(Put::new("row1").add_column("", "q", "v").validate().is_err());

        let long_row = vec![b'r'; MAX_ROW_LENGTH + 1];
        assert!(Put::new(&long_row).add_column("f", "q", "v").validate().is_err());
    }

    #[test]
    fn test_selection_widen_and_narrow() {
        // Family then column: narrows to the column.
        let get = Get::new("r").add_family("f").add_column("f", "q1");
        assert!(get.columns().accepts(b"f", b"q1"));
        assert!(!get.columns().accepts(b"f", b"q2"));

        // Column then family: widens to the family.
        let get = Get::new("r").add_column("f", "q1").add_family("f");
        assert!(get.columns().accepts(b"f", b"q2"));
        assert!(!get.columns().accepts(b"g", b"q1"));

        // No restriction accepts everything.
        assert!(Get::new("r").columns().accepts(b"any", b"thing"));
    }

    #[test]
    fn test_delete_targets() {
        let delete = Delete::new("row1");
        assert!(delete.is_whole_row());

        let delete = Delete::new("row1")
            .add_family("f")
            .add_column("f", "q")
            .add_columns("g", "q");
        assert_eq!(
            delete.targets(),
            &[
                DeleteTarget::Family(b"f".to_vec()),
                DeleteTarget::LatestVersion(b"f".to_vec(), b"q".to_vec()),
                DeleteTarget::AllVersions(b"g".to_vec(), b"q".to_vec()),
            ]
        );
        assert!(Delete::new("row1").add_columns("", "q").validate().is_err());
    }

    #[test]
    fn test_scan_validation() {
        assert!(Scan::new().validate().is_ok());
        assert!(Scan::new()
            .with_start_row("a")
            .with_stop_row("b")
            .validate()
            .is_ok());
        assert!(Scan::new()
            .with_start_row("b")
            .with_stop_row("a")
            .validate()
            .is_err());
        assert!(Scan::new().caching(0).validate().is_err());
        assert!(Scan::new().max_versions(0).validate().is_err());
    }

    #[test]
    fn test_condition_row_mismatch() {
        let condition = Condition::new("row1", "f", "q", Some(&b"v"[..]));
        let mutation = Mutation::from(Put::new("row2").add_column("f", "q", "x"));
        let err = condition.validate_for(&mutation).unwrap_err();
        assert!(matches!(err, Error::RowMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::Caller);

        let mutation = Mutation::from(Delete::new("row1"));
        assert!(condition.validate_for(&mutation).is_ok());
    }
}
