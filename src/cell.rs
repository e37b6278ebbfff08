//! Cells and per-row read results.

use std::collections::BTreeMap;
use std::fmt;

/// One version of one column of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    row: Vec<u8>,
    family: Vec<u8>,
    qualifier: Vec<u8>,
    timestamp: u64,
    value: Vec<u8>,
}

impl Cell {
    pub fn new(
        row: Vec<u8>,
        family: Vec<u8>,
        qualifier: Vec<u8>,
        timestamp: u64,
        value: Vec<u8>,
    ) -> Self {
        Self {
            row,
            family,
            qualifier,
            timestamp,
            value,
        }
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn family(&self) -> &[u8] {
        &self.family
    }

    pub fn qualifier(&self) -> &[u8] {
        &self.qualifier
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    fn is_column(&self, family: &[u8], qualifier: &[u8]) -> bool {
        self.family == family && self.qualifier == qualifier
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[row:{}],[family:{}],[qualifier:{}],[value:{}]",
            String::from_utf8_lossy(&self.row),
            String::from_utf8_lossy(&self.family),
            String::from_utf8_lossy(&self.qualifier),
            String::from_utf8_lossy(&self.value)
        )
    }
}

/// The cells returned for a single row, sorted by family, then qualifier,
/// then newest version first.
///
/// A lookup of a row that does not exist (or has nothing in the requested
/// families) yields an empty result rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowResult {
    cells: Vec<Cell>,
}

impl RowResult {
    /// Builds a result from cells of one row already in storage order.
    pub fn new(cells: Vec<Cell>) -> Self {
        debug_assert!(cells.windows(2).all(|w| w[0].row == w[1].row));
        Self { cells }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// The row key, or `None` for an empty result.
    pub fn row(&self) -> Option<&[u8]> {
        self.cells.first().map(Cell::row)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Latest version of a column.
    pub fn latest_cell(&self, family: &[u8], qualifier: &[u8]) -> Option<&Cell> {
        self.cells.iter().find(|c| c.is_column(family, qualifier))
    }

    /// Latest value of a column.
    pub fn value(&self, family: &[u8], qualifier: &[u8]) -> Option<&[u8]> {
        self.latest_cell(family, qualifier).map(Cell::value)
    }

    /// Every returned version of a column, newest first.
    pub fn column_cells(&self, family: &[u8], qualifier: &[u8]) -> Vec<&Cell> {
        self.cells
            .iter()
            .filter(|c| c.is_column(family, qualifier))
            .collect()
    }

    pub fn contains_column(&self, family: &[u8], qualifier: &[u8]) -> bool {
        self.latest_cell(family, qualifier).is_some()
    }

    /// Qualifier to latest value, for one family.
    pub fn family_map(&self, family: &[u8]) -> BTreeMap<&[u8], &[u8]> {
        let mut map = BTreeMap::new();
        for cell in self.cells.iter().filter(|c| c.family == family) {
            // Newest version comes first; keep it.
            map.entry(cell.qualifier()).or_insert(cell.value());
        }
        map
    }
}

impl<'a> IntoIterator for &'a RowResult {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
