//! Document — the transactional edit surface
//!
//! A [`Document`] owns the sheet, the dependency graph, the parsed formula
//! ASTs, and the dirty set. Every mutation goes through `&mut self`, so
//! edits are single-writer transactions by construction: no reader can
//! observe a half-applied structural edit, and recalculation (which is
//! deferred until [`recalculate`](Document::recalculate)) always sees a
//! fully consistent post-edit graph.
//!
//! Edit-time failures (syntax errors, alias conflicts, structural
//! conflicts) are checked before any state is touched; a rejected edit
//! leaves the document exactly as it was.

use crate::error::DocumentResult;
use ahash::{AHashMap, AHashSet};
use cadsheet_core::{
    CellAddress, CellError, CellRange, CellValue, ResolvedRef, Sheet, Style, FORMULA_MARKER,
};
use cadsheet_formula::{parse_formula, DependencyGraph, Expr, Reference};

/// A spreadsheet document: grid, aliases, dependency graph, and dirty state
#[derive(Debug)]
pub struct Document {
    pub(crate) sheet: Sheet,
    pub(crate) graph: DependencyGraph,
    pub(crate) asts: AHashMap<CellAddress, Expr>,
    /// Cells whose value changed since the last recalculation (seeds for
    /// the next dirty closure)
    pub(crate) dirty: AHashSet<CellAddress>,
    /// Cells to report in the next change notification regardless of value
    /// changes (formatting edits, shifted or re-sourced cells)
    pub(crate) pending: AHashSet<CellAddress>,
}

impl Document {
    /// Create a new empty document
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            sheet: Sheet::new(name),
            graph: DependencyGraph::new(),
            asts: AHashMap::new(),
            dirty: AHashSet::new(),
            pending: AHashSet::new(),
        }
    }

    /// Rebuild a document from a bare sheet (persistence / CSV load path)
    ///
    /// Every formula is re-parsed and the dependency graph and dirty set
    /// are rebuilt from scratch, so the first read after loading observes
    /// fully recomputed values. A persisted formula that no longer parses
    /// keeps its source text but reads as a reference error.
    pub fn from_sheet(sheet: Sheet) -> Self {
        let mut doc = Self {
            sheet,
            graph: DependencyGraph::new(),
            asts: AHashMap::new(),
            dirty: AHashSet::new(),
            pending: AHashSet::new(),
        };

        let mut parsed = Vec::new();
        let mut failed = Vec::new();
        for (addr, source) in doc.sheet.formula_cells() {
            match parse_formula(source) {
                Ok(ast) => parsed.push((addr, ast)),
                Err(e) => {
                    log::warn!("formula at {} failed to re-parse: {}", addr, e);
                    failed.push(addr);
                }
            }
        }

        for (addr, ast) in parsed {
            let reads = resolve_references(&doc.sheet, &ast);
            doc.graph.set_edges(addr, reads);
            doc.asts.insert(addr, ast);
            doc.dirty.insert(addr);
        }

        for addr in failed {
            let _ = doc
                .sheet
                .set_cached_result(addr, CellValue::Error(CellError::Unresolved));
            doc.pending.insert(addr);
        }

        doc
    }

    /// Read access to the underlying sheet (render data for the
    /// presentation layer)
    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    /// Consume the document, returning the sheet (persistence path)
    pub fn into_sheet(self) -> Sheet {
        self.sheet
    }

    /// A cell's last fully consistent value (merge-resolved)
    ///
    /// Values are served from cache; call
    /// [`recalculate`](Document::recalculate) first to observe pending
    /// edits.
    pub fn value(&self, addr: CellAddress) -> CellValue {
        self.sheet.value(addr)
    }

    /// A cell's raw editable content (formula source or literal text)
    pub fn content_text(&self, addr: CellAddress) -> Option<String> {
        self.sheet.content_text(addr)
    }

    /// Resolve a reference token (address, range, or alias)
    pub fn resolve(&self, token: &str) -> Option<ResolvedRef> {
        self.sheet.resolve(token)
    }

    // === Content edits ===

    /// Set a cell's content from raw text
    ///
    /// Formula text is parsed *before* anything is mutated: a syntax error
    /// rejects the edit and the prior cell state is untouched.
    pub fn set_content(&mut self, addr: CellAddress, text: &str) -> DocumentResult<()> {
        let ast = if text.starts_with(FORMULA_MARKER) {
            Some(parse_formula(text)?)
        } else {
            None
        };

        self.sheet.set_content(addr, text)?;

        match ast {
            Some(ast) => {
                let reads = resolve_references(&self.sheet, &ast);
                self.graph.set_edges(addr, reads);
                self.asts.insert(addr, ast);
            }
            None => {
                self.graph.clear_edges(addr);
                self.asts.remove(&addr);
            }
        }

        self.dirty.insert(addr);
        self.pending.insert(addr);
        Ok(())
    }

    /// Clear a cell entirely (content, style, and alias binding)
    pub fn clear_cell(&mut self, addr: CellAddress) {
        let removed_alias = self.sheet.clear_cell(addr);
        self.asts.remove(&addr);
        self.graph.clear_edges(addr);
        self.dirty.insert(addr);
        self.pending.insert(addr);

        if let Some(name) = removed_alias {
            self.retarget_alias(&name);
        }
    }

    /// Set a cell's formatting
    pub fn set_style(&mut self, addr: CellAddress, style: &Style) -> DocumentResult<()> {
        self.sheet.set_style(addr, style)?;
        self.pending.insert(addr);
        Ok(())
    }

    // === Alias edits ===

    /// Bind an alias to a cell
    ///
    /// Formulas already referring to the name by alias re-resolve to the
    /// new binding and are queued for recalculation.
    pub fn set_alias(&mut self, addr: CellAddress, name: &str) -> DocumentResult<()> {
        let replaced = self.sheet.alias_of(addr).map(str::to_string);
        self.sheet.set_alias(addr, name)?;

        if let Some(old_name) = replaced {
            if old_name != name {
                self.retarget_alias(&old_name);
            }
        }
        self.retarget_alias(name);
        Ok(())
    }

    /// Remove an alias binding by name
    ///
    /// Formulas referring to the name become unresolved on the next
    /// recalculation — they never silently fall back to the address.
    pub fn clear_alias(&mut self, name: &str) -> DocumentResult<CellAddress> {
        let addr = self.sheet.clear_alias(name)?;
        self.retarget_alias(name);
        Ok(addr)
    }

    /// Re-derive edges and dirty state for every formula referencing an
    /// alias whose binding changed
    fn retarget_alias(&mut self, name: &str) {
        let readers: Vec<CellAddress> = self
            .asts
            .iter()
            .filter(|(_, ast)| ast.references_alias(name))
            .map(|(&addr, _)| addr)
            .collect();

        for addr in readers {
            let reads = resolve_references(&self.sheet, &self.asts[&addr]);
            self.graph.set_edges(addr, reads);
            self.dirty.insert(addr);
        }
    }

    // === Merge edits ===

    /// Merge a rectangular region; the top-left cell becomes the anchor
    pub fn merge_cells(&mut self, range: CellRange) -> DocumentResult<()> {
        self.sheet.merge_cells(range)?;
        self.touch_covered(range);
        Ok(())
    }

    /// Split the merged region anchored at `addr`, restoring covered cells'
    /// retained content
    pub fn split_cell(&mut self, addr: CellAddress) -> DocumentResult<()> {
        let range = self.sheet.split_cell(addr)?;
        self.touch_covered(range);
        Ok(())
    }

    /// Covered cells' visible values change when a merge is created or
    /// dissolved; queue them and their readers
    fn touch_covered(&mut self, range: CellRange) {
        for addr in range.cells() {
            if addr != range.start {
                self.dirty.insert(addr);
            }
            self.pending.insert(addr);
        }
    }

    // === Structural edits ===

    /// Insert `count` rows at `at` in one atomic step: cells, merges,
    /// aliases, parsed references, and graph edges all shift together
    pub fn insert_rows(&mut self, at: u32, count: u32) -> DocumentResult<()> {
        self.sheet.insert_rows(at, count)?;

        self.apply_remap(
            |a| {
                Some(if a.row >= at {
                    CellAddress::new(a.row + count, a.col)
                } else {
                    a
                })
            },
            |r| {
                // A range straddling the insertion point grows
                let start = if r.start.row >= at {
                    CellAddress::new(r.start.row + count, r.start.col)
                } else {
                    r.start
                };
                let end = if r.end.row >= at {
                    CellAddress::new(r.end.row + count, r.end.col)
                } else {
                    r.end
                };
                Some(CellRange::new(start, end))
            },
            false,
        );

        self.touch_from_row(at);
        Ok(())
    }

    /// Remove rows `[at, at + count)` in one atomic step
    ///
    /// References into the removed span become `#REF!`; readers of removed
    /// cells (by address or by alias) are marked dirty, never left pointing
    /// at whatever slid into the vacated addresses.
    pub fn remove_rows(&mut self, at: u32, count: u32) -> DocumentResult<()> {
        let span_end = at + count;

        let seeds: Vec<CellAddress> = self
            .graph
            .read_targets()
            .filter(|a| a.row >= at && a.row < span_end)
            .collect();
        let pre_affected = self.graph.affected(seeds);

        self.sheet.remove_rows(at, count)?;

        let cell_map = |a: CellAddress| {
            if a.row < at {
                Some(a)
            } else if a.row < span_end {
                None
            } else {
                Some(CellAddress::new(a.row - count, a.col))
            }
        };

        self.apply_remap(
            &cell_map,
            |r: CellRange| {
                let start_row = if r.start.row < at {
                    r.start.row
                } else if r.start.row < span_end {
                    at
                } else {
                    r.start.row - count
                };
                let end_row = if r.end.row < at {
                    r.end.row
                } else if r.end.row < span_end {
                    // Span swallowed the range's tail
                    at.checked_sub(1)?
                } else {
                    r.end.row - count
                };
                if start_row > end_row {
                    return None;
                }
                Some(CellRange::from_indices(
                    start_row,
                    r.start.col,
                    end_row,
                    r.end.col,
                ))
            },
            true,
        );

        for addr in pre_affected {
            if let Some(new_addr) = cell_map(addr) {
                self.dirty.insert(new_addr);
            }
        }

        self.touch_from_row(at);
        Ok(())
    }

    /// Insert `count` columns at `at` in one atomic step
    pub fn insert_cols(&mut self, at: u16, count: u16) -> DocumentResult<()> {
        self.sheet.insert_cols(at, count)?;

        self.apply_remap(
            |a| {
                Some(if a.col >= at {
                    CellAddress::new(a.row, a.col + count)
                } else {
                    a
                })
            },
            |r| {
                let start = if r.start.col >= at {
                    CellAddress::new(r.start.row, r.start.col + count)
                } else {
                    r.start
                };
                let end = if r.end.col >= at {
                    CellAddress::new(r.end.row, r.end.col + count)
                } else {
                    r.end
                };
                Some(CellRange::new(start, end))
            },
            false,
        );

        self.touch_from_col(at);
        Ok(())
    }

    /// Remove columns `[at, at + count)` in one atomic step
    pub fn remove_cols(&mut self, at: u16, count: u16) -> DocumentResult<()> {
        let span_end = at + count;

        let seeds: Vec<CellAddress> = self
            .graph
            .read_targets()
            .filter(|a| a.col >= at && a.col < span_end)
            .collect();
        let pre_affected = self.graph.affected(seeds);

        self.sheet.remove_cols(at, count)?;

        let cell_map = |a: CellAddress| {
            if a.col < at {
                Some(a)
            } else if a.col < span_end {
                None
            } else {
                Some(CellAddress::new(a.row, a.col - count))
            }
        };

        self.apply_remap(
            &cell_map,
            |r: CellRange| {
                let start_col = if r.start.col < at {
                    r.start.col
                } else if r.start.col < span_end {
                    at
                } else {
                    r.start.col - count
                };
                let end_col = if r.end.col < at {
                    r.end.col
                } else if r.end.col < span_end {
                    at.checked_sub(1)?
                } else {
                    r.end.col - count
                };
                if start_col > end_col {
                    return None;
                }
                Some(CellRange::from_indices(
                    r.start.row,
                    start_col,
                    r.end.row,
                    end_col,
                ))
            },
            true,
        );

        for addr in pre_affected {
            if let Some(new_addr) = cell_map(addr) {
                self.dirty.insert(new_addr);
            }
        }

        self.touch_from_col(at);
        Ok(())
    }

    /// Rewrite every tracked address (AST keys, parsed references, graph
    /// nodes, dirty/pending sets) through a structural mapping
    ///
    /// `None` from the maps means the target was destroyed. Formulas whose
    /// references changed get regenerated source text and fresh edges;
    /// `dirty_changed` additionally queues them for recalculation (used for
    /// removals, where a severed reference changes the result).
    fn apply_remap<F, G>(&mut self, cell_map: F, range_map: G, dirty_changed: bool)
    where
        F: Fn(CellAddress) -> Option<CellAddress>,
        G: Fn(CellRange) -> Option<CellRange>,
    {
        // Old-coordinate sets first
        let dirty = std::mem::take(&mut self.dirty);
        self.dirty = dirty.into_iter().filter_map(&cell_map).collect();
        let pending = std::mem::take(&mut self.pending);
        self.pending = pending.into_iter().filter_map(&cell_map).collect();

        let old_asts = std::mem::take(&mut self.asts);
        let mut changed = Vec::new();
        for (addr, mut ast) in old_asts {
            let Some(new_addr) = cell_map(addr) else {
                continue; // formula cell destroyed
            };
            if ast.rewrite_refs(&cell_map, &range_map) {
                changed.push(new_addr);
            }
            self.asts.insert(new_addr, ast);
        }

        self.graph.remap(&cell_map);

        for addr in changed {
            let ast = &self.asts[&addr];
            if let Err(e) = self.sheet.set_formula_source(addr, &ast.to_formula_string()) {
                log::warn!("failed to rewrite formula source at {}: {}", addr, e);
            }
            let reads = resolve_references(&self.sheet, ast);
            self.graph.set_edges(addr, reads);
            if dirty_changed {
                self.dirty.insert(addr);
            }
            self.pending.insert(addr);
        }
    }

    /// Queue change notifications for every cell at or below a row edit
    fn touch_from_row(&mut self, at: u32) {
        for (addr, _) in self.sheet.iter_cells() {
            if addr.row >= at {
                self.pending.insert(addr);
            }
        }
    }

    /// Queue change notifications for every cell at or right of a column
    /// edit
    fn touch_from_col(&mut self, at: u16) {
        for (addr, _) in self.sheet.iter_cells() {
            if addr.col >= at {
                self.pending.insert(addr);
            }
        }
    }
}

/// Resolve a formula's references to the concrete addresses its edges
/// should point at
///
/// Alias references resolve against the current registry; an unbound alias
/// simply contributes no edge (evaluation reports it as unresolved).
fn resolve_references(sheet: &Sheet, ast: &Expr) -> Vec<CellAddress> {
    let mut reads = Vec::new();
    for reference in ast.references() {
        match reference {
            Reference::Cell(addr) => reads.push(addr),
            Reference::Alias(name) => {
                if let Some(addr) = sheet.resolve_alias(&name) {
                    reads.push(addr);
                }
            }
            Reference::Range(range) => reads.extend(range.cells()),
        }
    }
    reads
}
