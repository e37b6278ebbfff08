use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::cell::RowResult;
use crate::encoding::format::Raw;
use crate::error::Result;
use crate::request::Scan;
use crate::store::TableStore;

/// Lazy, forward iterator over the rows of a [`Scan`].
///
/// Rows are pulled from the store `caching` at a time. Each refill resumes
/// after the last row handed out, so rows written behind the cursor are not
/// seen and rows written ahead of it may be. Once the store returns a short
/// batch, or any call fails, the scanner is done for good; scanning again
/// needs a new scanner.
pub struct ResultScanner {
    store: Arc<dyn TableStore>,
    table: String,
    scan: Scan,
    caching: usize,
    buffer: VecDeque<RowResult>,
    last_row: Option<Vec<u8>>,
    exhausted: bool,
    round_trips: usize,
}

impl std::fmt::Debug for ResultScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultScanner")
            .field("table", &self.table)
            .field("caching", &self.caching)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl ResultScanner {
    pub(crate) fn new(store: Arc<dyn TableStore>, table: &str, scan: Scan, caching: usize) -> Self {
        Self {
            store,
            table: table.to_string(),
            scan,
            caching: caching.max(1),
            buffer: VecDeque::new(),
            last_row: None,
            exhausted: false,
            round_trips: 0,
        }
    }

    /// Number of store calls made so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    fn fill(&mut self) -> Result<()> {
        let rows = self.store.scan_batch(
            &self.table,
            &self.scan,
            self.last_row.as_deref(),
            self.caching,
        )?;
        self.round_trips += 1;

        tracing::trace!(
            table = %self.table,
            after = %self.last_row.as_deref().map(Raw::bytes).unwrap_or_default(),
            rows = rows.len(),
            "scanner refill"
        );

        if rows.len() < self.caching {
            self.exhausted = true;
        }
        if let Some(row) = rows.last().and_then(RowResult::row) {
            self.last_row = Some(row.to_vec());
        }
        self.buffer.extend(rows);
        Ok(())
    }
}

impl Iterator for ResultScanner {
    type Item = Result<RowResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl FusedIterator for ResultScanner {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnFamilyDescriptor, TableDescriptor};
    use crate::error::Error;
    use crate::request::{Mutation, Put};
    use crate::store::MemoryStore;

    fn store_with_rows(rows: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .create_table(TableDescriptor::new("t").add_family(ColumnFamilyDescriptor::new("f")))
            .unwrap();
        for row in rows {
            store
                .mutate("t", &Mutation::Put(Put::new(row).add_column("f", "q", row)))
                .unwrap();
        }
        store
    }

    fn row_names(scanner: ResultScanner) -> Vec<String> {
        scanner
            .map(|r| String::from_utf8(r.unwrap().row().unwrap().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_scanner_pages_through_table() {
        let store = store_with_rows(&["e", "a", "d", "b", "c"]);
        let scanner = ResultScanner::new(store, "t", Scan::new(), 2);
        assert_eq!(row_names(scanner), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_scanner_round_trips() {
        let store = store_with_rows(&["a", "b", "c", "d"]);
        let mut scanner = ResultScanner::new(store, "t", Scan::new(), 2);
        assert_eq!(scanner.by_ref().count(), 4);
        // Two full pages, then an empty one ends the scan.
        assert_eq!(scanner.round_trips(), 3);
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_scanner_respects_bounds() {
        let store = store_with_rows(&["a", "b", "c", "d"]);
        let scan = Scan::new().with_start_row("b").with_stop_row("d");
        let scanner = ResultScanner::new(store, "t", scan, 1);
        assert_eq!(row_names(scanner), vec!["b", "c"]);
    }

    #[test]
    fn test_scanner_is_lazy() {
        let store = store_with_rows(&["a", "b", "c"]);
        let mut scanner = ResultScanner::new(store.clone(), "t", Scan::new(), 1);
        assert_eq!(scanner.round_trips(), 0);
        assert!(scanner.next().is_some());

        // Written ahead of the cursor, so picked up by a later refill.
        store
            .mutate("t", &Mutation::Put(Put::new("bb").add_column("f", "q", "x")))
            .unwrap();
        let rest: Vec<_> = scanner
            .map(|r| r.unwrap().row().unwrap().to_vec())
            .collect();
        assert_eq!(rest, vec![b"b".to_vec(), b"bb".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_scanner_stops_after_error() {
        let store = store_with_rows(&["a"]);
        store.set_online(false);
        let mut scanner = ResultScanner::new(store, "t", Scan::new(), 10);
        assert!(matches!(scanner.next(), Some(Err(Error::Unavailable(_)))));
        assert!(scanner.next().is_none());
    }
}
