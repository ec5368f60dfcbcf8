//! Sheet type — the document grid
//!
//! A [`Sheet`] owns the sparse cell storage, the alias registry, and the
//! merged-region list for one spreadsheet document. It knows nothing about
//! formulas beyond their raw source text; parsing, dependency tracking, and
//! recalculation live in higher layers.

use crate::alias::AliasRegistry;
use crate::cell::{CellAddress, CellData, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::style::Style;
use crate::{MAX_COLS, MAX_ROWS};

/// The formula marker: content starting with this is formula source
pub const FORMULA_MARKER: char = '=';

/// Result of resolving a reference token (address, range, or alias)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRef {
    Cell(CellAddress),
    Range(CellRange),
}

/// A single-sheet spreadsheet document grid
#[derive(Debug)]
pub struct Sheet {
    /// Sheet name
    name: String,
    /// Cell storage
    cells: CellStorage,
    /// Alias registry (document-scoped)
    aliases: AliasRegistry,
}

impl Sheet {
    /// Create a new empty sheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
            aliases: AliasRegistry::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell access ===

    /// Get a cell by address
    pub fn get(&self, addr: CellAddress) -> Option<&CellData> {
        self.cells.get(addr.row, addr.col)
    }

    /// Get a cell's current effective value, resolved through merge anchors
    ///
    /// Covered cells of a merged region read as their anchor's value. For
    /// formula cells this is the last cached result; a never-evaluated
    /// formula reads as `Empty`.
    pub fn value(&self, addr: CellAddress) -> CellValue {
        let addr = self.read_anchor(addr);
        self.cells
            .get(addr.row, addr.col)
            .map(|c| c.value.effective_value().clone())
            .unwrap_or(CellValue::Empty)
    }

    /// Get a cell's raw editable content: the formula source for formula
    /// cells, the literal's display text otherwise. `None` for empty cells.
    pub fn content_text(&self, addr: CellAddress) -> Option<String> {
        let cell = self.get(addr)?;
        match &cell.value {
            CellValue::Empty => None,
            CellValue::Formula { source, .. } => Some(source.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a cell's content from raw text
    ///
    /// Text starting with `=` becomes a formula cell (source retained,
    /// result cache cleared); anything else is sniffed into a literal
    /// (number, boolean, or string). Empty text clears the value but keeps
    /// formatting. Writes to covered cells of a merged region are rejected.
    pub fn set_content(&mut self, addr: CellAddress, text: &str) -> Result<()> {
        self.check_position(addr)?;
        self.check_writable(addr)?;

        let value = if text.is_empty() {
            CellValue::Empty
        } else if text.starts_with(FORMULA_MARKER) {
            CellValue::formula(text)
        } else {
            sniff_literal(text)
        };

        self.cells.set_value(addr.row, addr.col, value);
        Ok(())
    }

    /// Store the evaluated result of a formula cell
    pub fn set_cached_result(&mut self, addr: CellAddress, value: CellValue) -> Result<()> {
        let cell = self
            .cells
            .get_mut(addr.row, addr.col)
            .ok_or_else(|| Error::InvalidAddress(format!("no cell at {}", addr)))?;

        match &mut cell.value {
            CellValue::Formula { cached, .. } => {
                *cached = Some(Box::new(value));
                Ok(())
            }
            _ => Err(Error::other(format!("cell {} is not a formula", addr))),
        }
    }

    /// Replace the source text of a formula cell, keeping its cached result
    ///
    /// Used when structural edits rewrite references: the regenerated text
    /// must match the re-resolved references without invalidating the value.
    pub fn set_formula_source(&mut self, addr: CellAddress, new_source: &str) -> Result<()> {
        let cell = self
            .cells
            .get_mut(addr.row, addr.col)
            .ok_or_else(|| Error::InvalidAddress(format!("no cell at {}", addr)))?;

        match &mut cell.value {
            CellValue::Formula { source, .. } => {
                *source = new_source.to_string();
                Ok(())
            }
            _ => Err(Error::other(format!("cell {} is not a formula", addr))),
        }
    }

    /// Set a cell's style
    pub fn set_style(&mut self, addr: CellAddress, style: &Style) -> Result<()> {
        self.check_position(addr)?;
        let style_index = self.cells.style_pool_mut().get_or_insert(*style);
        self.cells.set_style(addr.row, addr.col, style_index);
        Ok(())
    }

    /// Get the non-default style applied to a cell, if any
    pub fn style(&self, addr: CellAddress) -> Option<&Style> {
        let idx = self.get(addr).map(|c| c.style_index).unwrap_or(0);
        if idx == 0 {
            None
        } else {
            self.cells.style_pool().get(idx)
        }
    }

    /// Clear a cell entirely (value and style), unbinding its alias
    ///
    /// Returns the alias name that was unbound, if any.
    pub fn clear_cell(&mut self, addr: CellAddress) -> Option<String> {
        self.cells.remove(addr.row, addr.col);
        self.aliases.unbind_cell(addr)
    }

    // === Aliases ===

    /// Bind an alias to a cell
    pub fn set_alias(&mut self, addr: CellAddress, name: &str) -> Result<()> {
        self.check_position(addr)?;
        self.aliases.bind(name, addr)
    }

    /// Remove an alias binding by name, returning the address it was bound to
    pub fn clear_alias(&mut self, name: &str) -> Result<CellAddress> {
        self.aliases.unbind(name)
    }

    /// Get the alias bound to a cell, if any
    pub fn alias_of(&self, addr: CellAddress) -> Option<&str> {
        self.aliases.alias_of(addr)
    }

    /// Resolve an alias to its bound address
    pub fn resolve_alias(&self, name: &str) -> Option<CellAddress> {
        self.aliases.resolve(name)
    }

    /// Access the alias registry (for persistence)
    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Resolve a reference token: positional address, range, or registered
    /// alias. Returns `None` if the token matches nothing.
    pub fn resolve(&self, token: &str) -> Option<ResolvedRef> {
        if let Ok(addr) = CellAddress::parse(token) {
            return Some(ResolvedRef::Cell(addr));
        }
        if token.contains(':') {
            if let Ok(range) = CellRange::parse(token) {
                return Some(ResolvedRef::Range(range));
            }
        }
        self.aliases.resolve(token).map(ResolvedRef::Cell)
    }

    // === Merged regions ===

    /// Merge a rectangular region of cells
    ///
    /// The top-left cell becomes the merge anchor; covered cells keep their
    /// content in storage but read through to the anchor until split. Fails
    /// if the range is a single cell or overlaps an existing merge.
    pub fn merge_cells(&mut self, range: CellRange) -> Result<()> {
        self.check_position(range.end)?;

        if range.is_single_cell() {
            return Err(Error::StructuralConflict(format!(
                "cannot merge single cell {}",
                range
            )));
        }

        for existing in self.cells.merged_regions() {
            if range.overlaps(existing) {
                return Err(Error::StructuralConflict(format!(
                    "{} overlaps merged region {}",
                    range, existing
                )));
            }
        }

        self.cells.add_merged_region(range);
        Ok(())
    }

    /// Split the merged region anchored at `addr`
    ///
    /// Covered cells regain independent access to their retained pre-merge
    /// content. Fails if `addr` is not a merge anchor.
    pub fn split_cell(&mut self, addr: CellAddress) -> Result<CellRange> {
        self.cells
            .remove_merged_region_at(addr.row, addr.col)
            .ok_or_else(|| {
                Error::StructuralConflict(format!("{} is not a merge anchor", addr))
            })
    }

    /// Get all merged regions
    pub fn merged_regions(&self) -> &[CellRange] {
        self.cells.merged_regions()
    }

    /// Get the merged region containing a cell, if any
    pub fn merge_region_of(&self, addr: CellAddress) -> Option<&CellRange> {
        self.cells.merge_region_of(addr.row, addr.col)
    }

    /// Check whether a cell is covered by a merge without being its anchor
    pub fn is_covered(&self, addr: CellAddress) -> bool {
        self.merge_region_of(addr)
            .is_some_and(|region| region.start != addr)
    }

    /// Resolve a read address through its merge anchor
    pub fn read_anchor(&self, addr: CellAddress) -> CellAddress {
        self.merge_region_of(addr)
            .map(|region| region.start)
            .unwrap_or(addr)
    }

    // === Structural edits ===

    /// Insert `count` rows at `at`, shifting everything at or below down
    pub fn insert_rows(&mut self, at: u32, count: u32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if let Some((_, _, max_row, _)) = self.cells.used_bounds() {
            if max_row >= at && max_row.saturating_add(count) >= MAX_ROWS {
                return Err(Error::RowOutOfBounds(max_row + count, MAX_ROWS - 1));
            }
        }
        self.cells.insert_rows(at, count);
        self.aliases.insert_rows(at, count);
        Ok(())
    }

    /// Remove rows `[at, at + count)`, destroying their cells
    ///
    /// Returns the names of aliases that were bound to destroyed cells.
    pub fn remove_rows(&mut self, at: u32, count: u32) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.cells.remove_rows(at, count);
        Ok(self.aliases.remove_rows(at, count))
    }

    /// Insert `count` columns at `at`, shifting everything at or right over
    pub fn insert_cols(&mut self, at: u16, count: u16) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if let Some((_, _, _, max_col)) = self.cells.used_bounds() {
            if max_col >= at && max_col.saturating_add(count) >= MAX_COLS {
                return Err(Error::ColumnOutOfBounds(max_col + count, MAX_COLS - 1));
            }
        }
        self.cells.insert_cols(at, count);
        self.aliases.insert_cols(at, count);
        Ok(())
    }

    /// Remove columns `[at, at + count)`, destroying their cells
    ///
    /// Returns the names of aliases that were bound to destroyed cells.
    pub fn remove_cols(&mut self, at: u16, count: u16) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.cells.remove_cols(at, count);
        Ok(self.aliases.remove_cols(at, count))
    }

    // === Iteration ===

    /// Iterate over all non-empty cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellAddress, &CellData)> {
        self.cells
            .iter()
            .map(|(row, col, data)| (CellAddress::new(row, col), data))
    }

    /// Iterate over all formula cells: (address, source text)
    pub fn formula_cells(&self) -> impl Iterator<Item = (CellAddress, &str)> {
        self.iter_cells().filter_map(|(addr, cell)| {
            cell.value.formula_source().map(|source| (addr, source))
        })
    }

    /// Get the used range (bounds of all non-empty cells)
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(min_row, min_col, max_row, max_col)| {
                CellRange::from_indices(min_row, min_col, max_row, max_col)
            })
    }

    /// Get the number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    /// Check if the sheet is empty
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // === Internal ===

    fn check_position(&self, addr: CellAddress) -> Result<()> {
        if addr.row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(addr.row, MAX_ROWS - 1));
        }
        if addr.col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(addr.col, MAX_COLS - 1));
        }
        Ok(())
    }

    fn check_writable(&self, addr: CellAddress) -> Result<()> {
        if let Some(region) = self.merge_region_of(addr) {
            if region.start != addr {
                return Err(Error::StructuralConflict(format!(
                    "{} is covered by merged region {}",
                    addr, region
                )));
            }
        }
        Ok(())
    }
}

/// Sniff a literal's type from its text
fn sniff_literal(text: &str) -> CellValue {
    let trimmed = text.trim();

    match trimmed.to_ascii_uppercase().as_str() {
        "TRUE" => return CellValue::Boolean(true),
        "FALSE" => return CellValue::Boolean(false),
        _ => {}
    }

    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return CellValue::Number(n);
        }
    }

    CellValue::string(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_set_content_sniffs_literals() {
        let mut sheet = Sheet::new("Test");

        sheet.set_content(addr("A1"), "42").unwrap();
        sheet.set_content(addr("A2"), "hello").unwrap();
        sheet.set_content(addr("A3"), "true").unwrap();
        sheet.set_content(addr("A4"), "-3.5e2").unwrap();

        assert_eq!(sheet.value(addr("A1")), CellValue::Number(42.0));
        assert_eq!(sheet.value(addr("A2")).as_str(), Some("hello"));
        assert_eq!(sheet.value(addr("A3")), CellValue::Boolean(true));
        assert_eq!(sheet.value(addr("A4")), CellValue::Number(-350.0));
    }

    #[test]
    fn test_set_content_formula() {
        let mut sheet = Sheet::new("Test");
        sheet.set_content(addr("A1"), "=B1*2").unwrap();

        let cell = sheet.get(addr("A1")).unwrap();
        assert!(cell.value.is_formula());
        assert_eq!(cell.value.formula_source(), Some("=B1*2"));
        // Not yet evaluated
        assert_eq!(sheet.value(addr("A1")), CellValue::Empty);
    }

    #[test]
    fn test_content_text_roundtrip() {
        let mut sheet = Sheet::new("Test");
        sheet.set_content(addr("A1"), "42").unwrap();
        sheet.set_content(addr("A2"), "=A1+1").unwrap();

        assert_eq!(sheet.content_text(addr("A1")), Some("42".into()));
        assert_eq!(sheet.content_text(addr("A2")), Some("=A1+1".into()));
        assert_eq!(sheet.content_text(addr("A3")), None);
    }

    #[test]
    fn test_clear_cell_unbinds_alias() {
        let mut sheet = Sheet::new("Test");
        sheet.set_content(addr("B1"), "0.05").unwrap();
        sheet.set_alias(addr("B1"), "rate").unwrap();

        let unbound = sheet.clear_cell(addr("B1"));
        assert_eq!(unbound, Some("rate".to_string()));
        assert_eq!(sheet.resolve_alias("rate"), None);
    }

    #[test]
    fn test_resolve_token() {
        let mut sheet = Sheet::new("Test");
        sheet.set_alias(addr("B1"), "rate").unwrap();

        assert_eq!(sheet.resolve("C3"), Some(ResolvedRef::Cell(addr("C3"))));
        assert_eq!(sheet.resolve("rate"), Some(ResolvedRef::Cell(addr("B1"))));
        assert_eq!(
            sheet.resolve("A1:B2"),
            Some(ResolvedRef::Range(CellRange::parse("A1:B2").unwrap()))
        );
        assert_eq!(sheet.resolve("missing"), None);
    }

    #[test]
    fn test_merge_validation() {
        let mut sheet = Sheet::new("Test");

        let range = CellRange::parse("A1:B2").unwrap();
        sheet.merge_cells(range).unwrap();

        // Overlapping merge rejected
        let overlap = CellRange::parse("B2:C3").unwrap();
        assert!(matches!(
            sheet.merge_cells(overlap),
            Err(Error::StructuralConflict(_))
        ));

        // Single-cell merge rejected
        assert!(sheet
            .merge_cells(CellRange::single(addr("D4")))
            .is_err());

        // Split of non-anchor rejected
        assert!(sheet.split_cell(addr("B2")).is_err());
        // Split of anchor succeeds
        assert_eq!(sheet.split_cell(addr("A1")).unwrap(), range);
    }

    #[test]
    fn test_merged_reads_resolve_to_anchor() {
        let mut sheet = Sheet::new("Test");
        sheet.set_content(addr("A1"), "10").unwrap();
        sheet.set_content(addr("B2"), "99").unwrap();

        sheet.merge_cells(CellRange::parse("A1:B2").unwrap()).unwrap();

        // Covered cell reads through to the anchor
        assert_eq!(sheet.value(addr("B2")), CellValue::Number(10.0));
        assert!(sheet.is_covered(addr("B2")));
        assert!(!sheet.is_covered(addr("A1")));

        // Covered cell rejects writes
        assert!(sheet.set_content(addr("B2"), "1").is_err());

        // Split restores retained content
        sheet.split_cell(addr("A1")).unwrap();
        assert_eq!(sheet.value(addr("B2")), CellValue::Number(99.0));
    }

    #[test]
    fn test_insert_rows_moves_cells_and_aliases() {
        let mut sheet = Sheet::new("Test");
        sheet.set_content(addr("A2"), "5").unwrap();
        sheet.set_alias(addr("A2"), "depth").unwrap();

        sheet.insert_rows(1, 2).unwrap();

        assert_eq!(sheet.value(addr("A4")), CellValue::Number(5.0));
        assert_eq!(sheet.resolve_alias("depth"), Some(addr("A4")));
        assert_eq!(sheet.value(addr("A2")), CellValue::Empty);
    }
}
