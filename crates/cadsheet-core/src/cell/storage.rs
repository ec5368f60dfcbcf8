//! Sparse cell storage
//!
//! Only non-empty cells are stored, using a row-based BTreeMap structure.
//! Structural edits (row/column insertion and removal) are implemented here
//! as pure key-shifting operations; alias and dependency bookkeeping live
//! above this layer.

use std::collections::BTreeMap;

use super::CellValue;
use crate::cell::CellRange;
use crate::style::StylePool;

/// Complete data for a single cell
#[derive(Debug, Clone)]
pub struct CellData {
    /// The cell's value
    pub value: CellValue,
    /// Index into the style pool (0 = default style)
    pub style_index: u32,
}

impl CellData {
    /// Create a new cell with a value and default style
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            style_index: 0,
        }
    }

    /// Create a new cell with a value and style
    pub fn with_style(value: CellValue, style_index: u32) -> Self {
        Self { value, style_index }
    }

    /// Create an empty cell
    pub fn empty() -> Self {
        Self {
            value: CellValue::Empty,
            style_index: 0,
        }
    }

    /// Check if this cell is effectively empty (no value and default style)
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style_index == 0
    }
}

impl Default for CellData {
    fn default() -> Self {
        Self::empty()
    }
}

/// Sparse row-based storage for sheet cells
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, CellData>>`. The
/// ordered maps give row-major iteration (needed for CSV export) and make
/// row shifting a cheap `split_off`/reinsert.
#[derive(Debug, Default)]
pub struct CellStorage {
    /// Row index → column map
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,

    /// Shared style pool for deduplication
    style_pool: StylePool,

    /// Merged cell regions (anchor = region start)
    merged_regions: Vec<CellRange>,
}

impl CellStorage {
    /// Create a new empty cell storage
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            style_pool: StylePool::new(),
            merged_regions: Vec::new(),
        }
    }

    /// Get a cell
    pub fn get(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Get a mutable cell
    pub fn get_mut(&mut self, row: u32, col: u16) -> Option<&mut CellData> {
        self.rows.get_mut(&row).and_then(|r| r.get_mut(&col))
    }

    /// Set a cell
    ///
    /// If the cell data is empty (no value, default style), the cell is
    /// removed instead.
    pub fn set(&mut self, row: u32, col: u16, data: CellData) {
        if data.is_empty() {
            self.remove(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, data);
        }
    }

    /// Set just the cell value (preserving style)
    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        if let Some(cell) = self.get_mut(row, col) {
            cell.value = value;
            if self.get(row, col).is_some_and(|c| c.is_empty()) {
                self.remove(row, col);
            }
        } else if !value.is_empty() {
            self.set(row, col, CellData::new(value));
        }
    }

    /// Set just the cell style (preserving value)
    pub fn set_style(&mut self, row: u32, col: u16, style_index: u32) {
        if let Some(cell) = self.get_mut(row, col) {
            cell.style_index = style_index;
            if self.get(row, col).is_some_and(|c| c.is_empty()) {
                self.remove(row, col);
            }
        } else if style_index != 0 {
            self.set(row, col, CellData::with_style(CellValue::Empty, style_index));
        }
    }

    /// Remove a cell
    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellData> {
        let result = self.rows.get_mut(&row).and_then(|r| r.remove(&col));

        if self.rows.get(&row).is_some_and(|r| r.is_empty()) {
            self.rows.remove(&row);
        }

        result
    }

    /// Clear all cells and merges
    pub fn clear(&mut self) {
        self.rows.clear();
        self.merged_regions.clear();
    }

    /// Get the number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Check if storage is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the bounds of used cells
    ///
    /// Returns (min_row, min_col, max_row, max_col) or None if empty
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;

        let mut min_col = u16::MAX;
        let mut max_col = 0u16;

        for row_data in self.rows.values() {
            if let Some(&col) = row_data.keys().next() {
                min_col = min_col.min(col);
            }
            if let Some(&col) = row_data.keys().next_back() {
                max_col = max_col.max(col);
            }
        }

        Some((min_row, min_col, max_row, max_col))
    }

    /// Iterate over all cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, data)| (row, col, data)))
    }

    // === Structural edits ===

    /// Shift all rows at or after `at` up by `count` (row insertion)
    pub fn insert_rows(&mut self, at: u32, count: u32) {
        let tail = self.rows.split_off(&at);
        for (row, cols) in tail {
            self.rows.insert(row + count, cols);
        }
        self.shift_merges_rows(at, count);
    }

    /// Remove rows `[at, at + count)` and close the gap
    ///
    /// Returns the cells that were destroyed.
    pub fn remove_rows(&mut self, at: u32, count: u32) -> Vec<(u32, u16, CellData)> {
        let mut tail = self.rows.split_off(&at);
        let rest = tail.split_off(&(at + count));

        let removed = tail
            .into_iter()
            .flat_map(|(row, cols)| cols.into_iter().map(move |(col, data)| (row, col, data)))
            .collect();

        for (row, cols) in rest {
            self.rows.insert(row - count, cols);
        }
        self.unshift_merges_rows(at, count);
        removed
    }

    /// Shift all columns at or after `at` right by `count` (column insertion)
    pub fn insert_cols(&mut self, at: u16, count: u16) {
        for cols in self.rows.values_mut() {
            let tail = cols.split_off(&at);
            for (col, data) in tail {
                cols.insert(col + count, data);
            }
        }
        self.shift_merges_cols(at, count);
    }

    /// Remove columns `[at, at + count)` and close the gap
    ///
    /// Returns the cells that were destroyed.
    pub fn remove_cols(&mut self, at: u16, count: u16) -> Vec<(u32, u16, CellData)> {
        let mut removed = Vec::new();
        let mut emptied = Vec::new();

        for (&row, cols) in self.rows.iter_mut() {
            let mut tail = cols.split_off(&at);
            let rest = tail.split_off(&(at + count));

            removed.extend(tail.into_iter().map(|(col, data)| (row, col, data)));

            for (col, data) in rest {
                cols.insert(col - count, data);
            }
            if cols.is_empty() {
                emptied.push(row);
            }
        }

        for row in emptied {
            self.rows.remove(&row);
        }
        self.unshift_merges_cols(at, count);
        removed
    }

    // === Merged regions ===

    /// Get merged regions
    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged_regions
    }

    /// Add a merged region
    pub fn add_merged_region(&mut self, range: CellRange) {
        self.merged_regions.push(range);
    }

    /// Remove the merged region anchored at the given cell
    pub fn remove_merged_region_at(&mut self, row: u32, col: u16) -> Option<CellRange> {
        let idx = self
            .merged_regions
            .iter()
            .position(|r| r.start.row == row && r.start.col == col)?;
        Some(self.merged_regions.remove(idx))
    }

    /// Get the merged region containing a cell, if any
    pub fn merge_region_of(&self, row: u32, col: u16) -> Option<&CellRange> {
        let addr = crate::CellAddress::new(row, col);
        self.merged_regions.iter().find(|r| r.contains(&addr))
    }

    fn shift_merges_rows(&mut self, at: u32, count: u32) {
        for region in &mut self.merged_regions {
            if region.start.row >= at {
                region.start.row += count;
                region.end.row += count;
            } else if region.end.row >= at {
                // Insertion inside a merged region grows it
                region.end.row += count;
            }
        }
    }

    fn unshift_merges_rows(&mut self, at: u32, count: u32) {
        let end = at + count;
        self.merged_regions.retain_mut(|region| {
            // Region entirely inside the removed span disappears with it
            if region.start.row >= at && region.end.row < end {
                return false;
            }
            region.start.row = match region.start.row {
                r if r < at => r,
                r if r >= end => r - count,
                _ => at,
            };
            region.end.row = match region.end.row {
                r if r < at => r,
                r if r >= end => r - count,
                // Tail swallowed; the not-fully-removed check above
                // guarantees at > 0 here
                _ => at - 1,
            };
            !region.is_single_cell()
        });
    }

    fn shift_merges_cols(&mut self, at: u16, count: u16) {
        for region in &mut self.merged_regions {
            if region.start.col >= at {
                region.start.col += count;
                region.end.col += count;
            } else if region.end.col >= at {
                region.end.col += count;
            }
        }
    }

    fn unshift_merges_cols(&mut self, at: u16, count: u16) {
        let end = at + count;
        self.merged_regions.retain_mut(|region| {
            if region.start.col >= at && region.end.col < end {
                return false;
            }
            region.start.col = match region.start.col {
                c if c < at => c,
                c if c >= end => c - count,
                _ => at,
            };
            region.end.col = match region.end.col {
                c if c < at => c,
                c if c >= end => c - count,
                _ => at - 1,
            };
            !region.is_single_cell()
        });
    }

    // === Styles ===

    /// Get the style pool
    pub fn style_pool(&self) -> &StylePool {
        &self.style_pool
    }

    /// Get the style pool mutably
    pub fn style_pool_mut(&mut self) -> &mut StylePool {
        &mut self.style_pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> CellData {
        CellData::new(CellValue::Number(n))
    }

    #[test]
    fn test_basic_operations() {
        let mut storage = CellStorage::new();

        storage.set(0, 0, num(42.0));
        assert_eq!(storage.get(0, 0).unwrap().value.as_number(), Some(42.0));
        assert!(storage.get(1, 1).is_none());
    }

    #[test]
    fn test_empty_cells_not_stored() {
        let mut storage = CellStorage::new();

        storage.set(0, 0, num(42.0));
        assert_eq!(storage.cell_count(), 1);

        storage.set(0, 0, CellData::empty());
        assert_eq!(storage.cell_count(), 0);
        assert!(storage.get(0, 0).is_none());
    }

    #[test]
    fn test_used_bounds() {
        let mut storage = CellStorage::new();
        assert!(storage.used_bounds().is_none());

        storage.set(5, 3, num(1.0));
        storage.set(10, 7, num(2.0));
        storage.set(2, 1, num(3.0));

        assert_eq!(storage.used_bounds(), Some((2, 1, 10, 7)));
    }

    #[test]
    fn test_insert_rows_shifts() {
        let mut storage = CellStorage::new();
        storage.set(0, 0, num(1.0));
        storage.set(2, 0, num(3.0));

        storage.insert_rows(1, 2);

        assert_eq!(storage.get(0, 0).unwrap().value.as_number(), Some(1.0));
        assert!(storage.get(2, 0).is_none());
        assert_eq!(storage.get(4, 0).unwrap().value.as_number(), Some(3.0));
    }

    #[test]
    fn test_remove_rows_closes_gap() {
        let mut storage = CellStorage::new();
        storage.set(0, 0, num(1.0));
        storage.set(1, 0, num(2.0));
        storage.set(3, 0, num(4.0));

        let removed = storage.remove_rows(1, 2);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, 1);

        assert_eq!(storage.get(0, 0).unwrap().value.as_number(), Some(1.0));
        assert_eq!(storage.get(1, 0).unwrap().value.as_number(), Some(4.0));
        assert_eq!(storage.cell_count(), 2);
    }

    #[test]
    fn test_insert_and_remove_cols() {
        let mut storage = CellStorage::new();
        storage.set(0, 0, num(1.0));
        storage.set(0, 1, num(2.0));
        storage.set(0, 2, num(3.0));

        storage.insert_cols(1, 1);
        assert_eq!(storage.get(0, 0).unwrap().value.as_number(), Some(1.0));
        assert!(storage.get(0, 1).is_none());
        assert_eq!(storage.get(0, 2).unwrap().value.as_number(), Some(2.0));
        assert_eq!(storage.get(0, 3).unwrap().value.as_number(), Some(3.0));

        let removed = storage.remove_cols(2, 1);
        assert_eq!(removed.len(), 1);
        assert_eq!(storage.get(0, 2).unwrap().value.as_number(), Some(3.0));
    }

    #[test]
    fn test_merge_region_shifts_with_rows() {
        let mut storage = CellStorage::new();
        storage.add_merged_region(CellRange::parse("B2:C3").unwrap());

        storage.insert_rows(0, 1);
        assert_eq!(storage.merged_regions()[0].to_a1_string(), "B3:C4");

        let removed = storage.remove_rows(0, 1);
        assert!(removed.is_empty());
        assert_eq!(storage.merged_regions()[0].to_a1_string(), "B2:C3");
    }

    #[test]
    fn test_merge_region_dropped_when_rows_removed() {
        let mut storage = CellStorage::new();
        storage.add_merged_region(CellRange::parse("A2:B3").unwrap());

        storage.remove_rows(1, 2);
        assert!(storage.merged_regions().is_empty());
    }
}
