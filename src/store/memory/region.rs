//! A table's cells held in a concurrent skip list.
//!
//! Every cell version is one map entry keyed by its encoded [`CellKey`], so
//! the map order is row, then family, then qualifier, then newest version
//! first. A row, a family within a row and a single column are each one
//! contiguous key range, which is how gets, deletes and scans address them.
//!
//! Reads walk the skip list without locking. Writes to a row serialize on
//! its [`RowLocks`] stripe; gets take the same lock so they never observe a
//! half-applied Put.

use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_skiplist::SkipMap;

use super::row_lock::RowLocks;
use super::Clock;
use crate::cell::{Cell, RowResult};
use crate::descriptor::TableDescriptor;
use crate::encoding::format::Raw;
use crate::encoding::keycode::{prefix_end, CellKey};
use crate::error::{Error, Result};
use crate::request::{ColumnSelection, Condition, Delete, DeleteTarget, Get, Mutation, Put, Scan};

#[derive(Debug)]
pub struct Region {
    descriptor: TableDescriptor,
    data: SkipMap<Vec<u8>, Vec<u8>>,
    size: AtomicUsize,
    locks: RowLocks,
}

fn prefix_range(prefix: Vec<u8>) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    let end = prefix_end(&prefix);
    (Bound::Included(prefix), end)
}

impl Region {
    pub fn new(descriptor: TableDescriptor) -> Self {
        Self {
            descriptor,
            data: SkipMap::new(),
            size: AtomicUsize::new(0),
            locks: RowLocks::default(),
        }
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    /// size returns the bytes held by keys and values.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Number of stored cell versions.
    pub fn cell_count(&self) -> usize {
        self.data.len()
    }

    fn check_family(&self, family: &[u8]) -> Result<()> {
        if self.descriptor.has_family(family) {
            Ok(())
        } else {
            Err(Error::NoSuchColumnFamily {
                table: self.descriptor.name().to_string(),
                family: family.to_vec(),
            })
        }
    }

    fn check_selection(&self, columns: &ColumnSelection) -> Result<()> {
        columns.families().try_for_each(|f| self.check_family(f))
    }

    pub fn get(&self, get: &Get) -> Result<RowResult> {
        self.check_selection(get.columns())?;

        let _guard = self.locks.lock(get.row())?;
        let mut collector = RowCollector::new(get.columns(), get.versions());
        for entry in self.data.range(prefix_range(CellKey::row_prefix(get.row()))) {
            collector.offer(CellKey::decode(entry.key())?, entry.value());
        }
        Ok(collector.finish().unwrap_or_default())
    }

    pub fn mutate(&self, mutation: &Mutation, clock: &Clock) -> Result<()> {
        match mutation {
            Mutation::Put(put) => self.put(put, clock),
            Mutation::Delete(delete) => self.delete(delete),
        }
    }

    pub fn put(&self, put: &Put, clock: &Clock) -> Result<()> {
        for cell in put.cells() {
            self.check_family(&cell.family)?;
        }
        let _guard = self.locks.lock(put.row())?;
        self.put_locked(put, clock)
    }

    pub fn delete(&self, delete: &Delete) -> Result<()> {
        for target in delete.targets() {
            self.check_family(target.family())?;
        }
        let _guard = self.locks.lock(delete.row())?;
        self.delete_locked(delete);
        Ok(())
    }

    /// Compares the condition cell's latest value and applies `mutation` if
    /// it matches, all under the row lock.
    pub fn check_and_mutate(
        &self,
        condition: &Condition,
        mutation: &Mutation,
        clock: &Clock,
    ) -> Result<bool> {
        // Only one row lock is taken, so the mutation must stay on that row.
        if mutation.row() != condition.row.as_slice() {
            return Err(Error::RowMismatch {
                check: condition.row.clone(),
                mutation: mutation.row().to_vec(),
            });
        }
        self.check_family(&condition.family)?;
        match mutation {
            Mutation::Put(put) => {
                for cell in put.cells() {
                    self.check_family(&cell.family)?;
                }
            }
            Mutation::Delete(delete) => {
                for target in delete.targets() {
                    self.check_family(target.family())?;
                }
            }
        }

        let _guard = self.locks.lock(&condition.row)?;
        let prefix = CellKey::column_prefix(&condition.row, &condition.family, &condition.qualifier);
        let current = self
            .data
            .range(prefix_range(prefix))
            .next()
            .map(|entry| entry.value().clone());

        if current != condition.expected {
            return Ok(false);
        }
        match mutation {
            Mutation::Put(put) => self.put_locked(put, clock)?,
            Mutation::Delete(delete) => self.delete_locked(delete),
        }
        Ok(true)
    }

    /// Returns up to `limit` non-empty rows within the scan bounds, starting
    /// after `resume_after` when given.
    pub fn scan_rows(
        &self,
        scan: &Scan,
        resume_after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<RowResult>> {
        self.check_selection(scan.columns())?;

        let start = match resume_after {
            // Skip every cell of the last row handed out.
            Some(row) => match prefix_end(&CellKey::row_prefix(row)) {
                Bound::Excluded(key) => Bound::Included(key),
                _ => return Ok(Vec::new()),
            },
            None => match scan.start_row() {
                Some(row) => Bound::Included(CellKey::row_prefix(row)),
                None => Bound::Unbounded,
            },
        };
        let end = match scan.stop_row() {
            Some(row) if !row.is_empty() => Bound::Excluded(CellKey::row_prefix(row)),
            _ => Bound::Unbounded,
        };

        let mut rows = Vec::new();
        let mut current: Option<(Vec<u8>, RowCollector<'_>)> = None;

        for entry in self.data.range((start, end)) {
            let key = CellKey::decode(entry.key())?;
            let same_row = matches!(&current, Some((row, _)) if *row == key.row);
            if !same_row {
                if let Some((_, collector)) = current.take() {
                    if let Some(result) = collector.finish() {
                        rows.push(result);
                        if rows.len() >= limit {
                            return Ok(rows);
                        }
                    }
                }
                current = Some((
                    key.row.clone(),
                    RowCollector::new(scan.columns(), scan.versions()),
                ));
            }
            if let Some((_, collector)) = current.as_mut() {
                collector.offer(key, entry.value());
            }
        }

        if let Some(result) = current.and_then(|(_, collector)| collector.finish()) {
            rows.push(result);
        }
        Ok(rows)
    }

    fn put_locked(&self, put: &Put, clock: &Clock) -> Result<()> {
        // Cells without an explicit version share one timestamp.
        let now = clock.next();

        for cell in put.cells() {
            let key = CellKey {
                row: put.row().to_vec(),
                family: cell.family.clone(),
                qualifier: cell.qualifier.clone(),
                timestamp: cell.timestamp.unwrap_or(now),
            }
            .encode();

            let added = key.len() + cell.value.len();
            if let Some(old) = self.data.get(&key) {
                self.size
                    .fetch_sub(old.key().len() + old.value().len(), Ordering::SeqCst);
            }
            tracing::trace!(key = %Raw::cell_key(&key), "insert cell");
            self.data.insert(key, cell.value.clone());
            self.size.fetch_add(added, Ordering::SeqCst);

            self.trim_versions(put.row(), &cell.family, &cell.qualifier)?;
        }
        Ok(())
    }

    /// Drops versions beyond the family's retention limit.
    fn trim_versions(&self, row: &[u8], family: &[u8], qualifier: &[u8]) -> Result<()> {
        let keep = self
            .descriptor
            .family(family)
            .map(|f| f.versions() as usize)
            .ok_or_else(|| Error::NoSuchColumnFamily {
                table: self.descriptor.name().to_string(),
                family: family.to_vec(),
            })?;

        let prefix = CellKey::column_prefix(row, family, qualifier);
        for entry in self.data.range(prefix_range(prefix)).skip(keep) {
            self.remove_entry(&entry);
        }
        Ok(())
    }

    fn delete_locked(&self, delete: &Delete) {
        let row = delete.row();
        if delete.is_whole_row() {
            self.remove_prefix(CellKey::row_prefix(row));
            return;
        }
        for target in delete.targets() {
            match target {
                DeleteTarget::Family(family) => {
                    self.remove_prefix(CellKey::family_prefix(row, family));
                }
                DeleteTarget::AllVersions(family, qualifier) => {
                    self.remove_prefix(CellKey::column_prefix(row, family, qualifier));
                }
                DeleteTarget::LatestVersion(family, qualifier) => {
                    let prefix = CellKey::column_prefix(row, family, qualifier);
                    if let Some(entry) = self.data.range(prefix_range(prefix)).next() {
                        self.remove_entry(&entry);
                    }
                }
            }
        }
    }

    fn remove_prefix(&self, prefix: Vec<u8>) {
        for entry in self.data.range(prefix_range(prefix)) {
            self.remove_entry(&entry);
        }
    }

    fn remove_entry(&self, entry: &crossbeam_skiplist::map::Entry<'_, Vec<u8>, Vec<u8>>) {
        if entry.remove() {
            tracing::trace!(key = %Raw::cell_key(entry.key()), "remove cell");
            self.size
                .fetch_sub(entry.key().len() + entry.value().len(), Ordering::SeqCst);
        }
    }
}

/// Gathers the cells of one row that pass a column selection, keeping at
/// most `max_versions` per column. Expects cells in storage order.
struct RowCollector<'a> {
    columns: &'a ColumnSelection,
    max_versions: u32,
    cells: Vec<Cell>,
    column: Option<(Vec<u8>, Vec<u8>)>,
    versions: u32,
}

impl<'a> RowCollector<'a> {
    fn new(columns: &'a ColumnSelection, max_versions: u32) -> Self {
        Self {
            columns,
            max_versions,
            cells: Vec::new(),
            column: None,
            versions: 0,
        }
    }

    fn offer(&mut self, key: CellKey, value: &[u8]) {
        if !self.columns.accepts(&key.family, &key.qualifier) {
            return;
        }
        let same_column = matches!(
            &self.column,
            Some((family, qualifier)) if *family == key.family && *qualifier == key.qualifier
        );
        if same_column {
            if self.versions >= self.max_versions {
                return;
            }
            self.versions += 1;
        } else {
            self.column = Some((key.family.clone(), key.qualifier.clone()));
            self.versions = 1;
        }
        self.cells.push(Cell::new(
            key.row,
            key.family,
            key.qualifier,
            key.timestamp,
            value.to_vec(),
        ));
    }

    fn finish(self) -> Option<RowResult> {
        if self.cells.is_empty() {
            None
        } else {
            Some(RowResult::new(self.cells))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ColumnFamilyDescriptor;

    fn region() -> Region {
        Region::new(
            TableDescriptor::new("userinfo")
                .add_family(ColumnFamilyDescriptor::new("vio1"))
                .add_family(ColumnFamilyDescriptor::new("hist").max_versions(3)),
        )
    }

    fn values(result: &RowResult) -> Vec<String> {
        result
            .cells()
            .iter()
            .map(|c| {
                format!(
                    "{}:{}={}",
                    String::from_utf8_lossy(c.family()),
                    String::from_utf8_lossy(c.qualifier()),
                    String::from_utf8_lossy(c.value())
                )
            })
            .collect()
    }

    #[test]
    fn test_put_and_get() {
        let region = region();
        let clock = Clock::default();

        region
            .put(
                &Put::new("row1")
                    .add_column("vio1", "col1", "hello1")
                    .add_column("vio1", "col2", "hello2"),
                &clock,
            )
            .expect("Put failed");

        let result = region.get(&Get::new("row1")).expect("Get failed");
        assert_eq!(result.len(), 2);
        assert_eq!(result.value(b"vio1", b"col1"), Some(&b"hello1"[..]));
        assert_eq!(result.value(b"vio1", b"col2"), Some(&b"hello2"[..]));

        assert!(region.get(&Get::new("row2")).unwrap().is_empty());
        assert!(region.size() > 0);
    }

    #[test]
    fn test_cells_of_one_put_share_timestamp() {
        let region = region();
        let clock = Clock::default();
        region
            .put(
                &Put::new("row1")
                    .add_column("vio1", "a", "1")
                    .add_column("vio1", "b", "2"),
                &clock,
            )
            .unwrap();

        let result = region.get(&Get::new("row1")).unwrap();
        assert_eq!(result.cells()[0].timestamp(), result.cells()[1].timestamp());
    }

    #[test]
    fn test_unknown_family_rejected() {
        let region = region();
        let clock = Clock::default();

        let err = region
            .put(&Put::new("row1").add_column("nope", "q", "v"), &clock)
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchColumnFamily { .. }));
        assert_eq!(region.cell_count(), 0);

        assert!(region.get(&Get::new("row1").add_family("nope")).is_err());
        assert!(region.delete(&Delete::new("row1").add_family("nope")).is_err());
    }

    #[test]
    fn test_version_retention() {
        let region = region();
        let clock = Clock::default();

        for (ts, value) in [(1, "v1"), (2, "v2"), (3, "v3"), (4, "v4")] {
            region
                .put(&Put::new("row1").add_column_at("hist", "q", ts, value), &clock)
                .unwrap();
            region
                .put(&Put::new("row1").add_column_at("vio1", "q", ts, value), &clock)
                .unwrap();
        }

        let result = region
            .get(&Get::new("row1").add_column("hist", "q").max_versions(10))
            .unwrap();
        let versions: Vec<_> = result.cells().iter().map(Cell::timestamp).collect();
        assert_eq!(versions, vec![4, 3, 2]);

        let result = region
            .get(&Get::new("row1").add_column("vio1", "q").max_versions(10))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.value(b"vio1", b"q"), Some(&b"v4"[..]));
    }

    #[test]
    fn test_get_narrowing() {
        let region = region();
        let clock = Clock::default();
        region
            .put(
                &Put::new("row1")
                    .add_column("vio1", "col1", "a")
                    .add_column("vio1", "col2", "b")
                    .add_column("hist", "col1", "c"),
                &clock,
            )
            .unwrap();

        let family = region.get(&Get::new("row1").add_family("hist")).unwrap();
        assert_eq!(values(&family), vec!["hist:col1=c"]);

        let column = region.get(&Get::new("row1").add_column("vio1", "col2")).unwrap();
        assert_eq!(values(&column), vec!["vio1:col2=b"]);

        let missing = region.get(&Get::new("row1").add_column("vio1", "col9")).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_delete_granularities() {
        let region = region();
        let clock = Clock::default();
        let put = Put::new("row1")
            .add_column("vio1", "col1", "a")
            .add_column("vio1", "col2", "b")
            .add_column("hist", "col1", "c");
        region.put(&put, &clock).unwrap();

        region
            .delete(&Delete::new("row1").add_columns("vio1", "col1"))
            .unwrap();
        let result = region.get(&Get::new("row1")).unwrap();
        assert!(!result.contains_column(b"vio1", b"col1"));
        assert!(result.contains_column(b"vio1", b"col2"));

        region.delete(&Delete::new("row1").add_family("vio1")).unwrap();
        let result = region.get(&Get::new("row1")).unwrap();
        assert_eq!(values(&result), vec!["hist:col1=c"]);

        region.delete(&Delete::new("row1")).unwrap();
        assert!(region.get(&Get::new("row1")).unwrap().is_empty());
        assert_eq!(region.cell_count(), 0);
        assert_eq!(region.size(), 0);
    }

    #[test]
    fn test_delete_latest_version_only() {
        let region = region();
        let clock = Clock::default();
        for (ts, value) in [(1, "old"), (2, "new")] {
            region
                .put(&Put::new("row1").add_column_at("hist", "q", ts, value), &clock)
                .unwrap();
        }

        region.delete(&Delete::new("row1").add_column("hist", "q")).unwrap();
        let result = region.get(&Get::new("row1")).unwrap();
        assert_eq!(result.value(b"hist", b"q"), Some(&b"old"[..]));
    }

    #[test]
    fn test_scan_rows_ordered_and_resumable() {
        let region = region();
        let clock = Clock::default();
        for row in ["row3", "row1", "row10", "row2"] {
            region
                .put(&Put::new(row).add_column("vio1", "q", row), &clock)
                .unwrap();
        }

        let rows: Vec<_> = region
            .scan_rows(&Scan::new(), None, 100)
            .unwrap()
            .iter()
            .map(|r| r.row().unwrap().to_vec())
            .collect();
        assert_eq!(
            rows,
            vec![
                b"row1".to_vec(),
                b"row10".to_vec(),
                b"row2".to_vec(),
                b"row3".to_vec()
            ]
        );

        let first = region.scan_rows(&Scan::new(), None, 2).unwrap();
        assert_eq!(first.len(), 2);
        let rest = region
            .scan_rows(&Scan::new(), first[1].row(), 2)
            .unwrap();
        let rest: Vec<_> = rest.iter().map(|r| r.row().unwrap().to_vec()).collect();
        assert_eq!(rest, vec![b"row2".to_vec(), b"row3".to_vec()]);
    }

    #[test]
    fn test_scan_rows_bounds_and_filtering() {
        let region = region();
        let clock = Clock::default();
        region
            .put(&Put::new("a").add_column("vio1", "q", "1"), &clock)
            .unwrap();
        region
            .put(&Put::new("b").add_column("hist", "q", "2"), &clock)
            .unwrap();
        region
            .put(&Put::new("c").add_column("vio1", "q", "3"), &clock)
            .unwrap();

        let bounded = region
            .scan_rows(&Scan::new().with_start_row("b").with_stop_row("c"), None, 10)
            .unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].row(), Some(&b"b"[..]));

        // Rows with nothing in the selected family are skipped entirely.
        let filtered = region
            .scan_rows(&Scan::new().add_family("vio1"), None, 10)
            .unwrap();
        let rows: Vec<_> = filtered.iter().map(|r| r.row().unwrap().to_vec()).collect();
        assert_eq!(rows, vec![b"a".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_check_and_mutate() {
        let region = region();
        let clock = Clock::default();
        region
            .put(&Put::new("row1").add_column("vio1", "col1", "v1"), &clock)
            .unwrap();

        let update = Mutation::Put(Put::new("row1").add_column("vio1", "col1", "v2"));

        let miss = Condition::new("row1", "vio1", "col1", Some(&b"other"[..]));
        assert!(!region.check_and_mutate(&miss, &update, &clock).unwrap());
        assert_eq!(
            region.get(&Get::new("row1")).unwrap().value(b"vio1", b"col1"),
            Some(&b"v1"[..])
        );

        let hit = Condition::new("row1", "vio1", "col1", Some(&b"v1"[..]));
        assert!(region.check_and_mutate(&hit, &update, &clock).unwrap());
        assert_eq!(
            region.get(&Get::new("row1")).unwrap().value(b"vio1", b"col1"),
            Some(&b"v2"[..])
        );

        // Absent-cell condition.
        let absent = Condition::new("row1", "vio1", "col2", None);
        let create = Mutation::Put(Put::new("row1").add_column("vio1", "col2", "new"));
        assert!(region.check_and_mutate(&absent, &create, &clock).unwrap());
        assert!(!region.check_and_mutate(&absent, &create, &clock).unwrap());
    }

    #[test]
    fn test_check_and_mutate_rejects_other_row() {
        let region = region();
        let clock = Clock::default();

        let condition = Condition::new("row1", "vio1", "col1", None);
        let other_row = Mutation::Put(Put::new("row2").add_column("vio1", "col1", "v"));
        let err = region
            .check_and_mutate(&condition, &other_row, &clock)
            .unwrap_err();
        assert!(matches!(err, Error::RowMismatch { .. }));
        assert_eq!(region.cell_count(), 0);
    }
}
