//! Incremental recalculation
//!
//! Recomputes exactly the induced subgraph over `dirty ∪ affected(dirty)`:
//! a depth-first topological pass with in-progress markers orders the
//! evaluation, cycles are reported as [`CellError::Circular`] on every cell
//! of the offending traversal stack, and cells outside the dirty closure
//! are never revisited.

use crate::document::Document;
use ahash::{AHashMap, AHashSet};
use cadsheet_core::{CellAddress, CellError, CellValue, Sheet};
use cadsheet_formula::{evaluate, CellProvider, DependencyGraph, Value};

/// Outcome of one recalculation pass
#[derive(Debug, Clone, Default)]
pub struct RecalcSummary {
    /// Addresses whose value or formatting changed, sorted row-major — the
    /// change notification set for the presentation layer
    pub changed: Vec<CellAddress>,
    /// Number of formulas evaluated
    pub evaluated: usize,
    /// Number of cells reported as circular
    pub circular: usize,
    /// Number of cells whose value is now an error (circular included)
    pub errors: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    InProgress,
    Done,
}

/// The evaluator's window onto the sheet: merge-resolved cached values and
/// the live alias registry
struct SheetProvider<'a> {
    sheet: &'a Sheet,
}

impl CellProvider for SheetProvider<'_> {
    fn cell_value(&self, addr: CellAddress) -> Value {
        Value::from(&self.sheet.value(addr))
    }

    fn alias_target(&self, name: &str) -> Option<CellAddress> {
        self.sheet.resolve_alias(name)
    }
}

impl Document {
    /// Recompute all dirty cells and their transitive dependents
    ///
    /// Returns the change notification set. Cells that evaluated cleanly
    /// leave the dirty set; circular cells stay dirty (the cycle persists
    /// until an edit breaks it, and each pass re-detects it).
    pub fn recalculate(&mut self) -> RecalcSummary {
        let mut summary = RecalcSummary::default();

        // Expand dirty seeds through merge spans: covered addresses are
        // read-aliases of their anchor, so a change to the anchor must
        // reach formulas that reference covered cells.
        let mut seeds: Vec<CellAddress> = self.dirty.iter().copied().collect();
        for &addr in &self.dirty {
            if let Some(region) = self.sheet.merge_region_of(addr) {
                if region.start == addr {
                    seeds.extend(region.cells().filter(|&a| a != addr));
                }
            }
        }

        // Induced subgraph: dirty cells plus everything reachable over
        // reverse edges, restricted to formula cells
        let mut targets = self.graph.affected(seeds.iter().copied());
        targets.extend(seeds);
        targets.retain(|a| self.asts.contains_key(a));

        // Topological order via DFS with in-progress markers
        let mut order = Vec::with_capacity(targets.len());
        let mut state = AHashMap::with_capacity(targets.len());
        let mut stack = Vec::new();
        let mut circular = AHashSet::new();

        let mut roots: Vec<CellAddress> = targets.iter().copied().collect();
        roots.sort_unstable();
        for root in roots {
            visit(
                root,
                &self.graph,
                &targets,
                &mut state,
                &mut stack,
                &mut order,
                &mut circular,
            );
        }

        let mut changed: AHashSet<CellAddress> = std::mem::take(&mut self.pending);

        // Cycle members get the error as their cached value and are
        // excluded from evaluation entirely
        for &addr in &circular {
            let prev = self.sheet.value(addr);
            let error = CellValue::Error(CellError::Circular);
            if self.sheet.set_cached_result(addr, error.clone()).is_ok() && prev != error {
                changed.insert(addr);
            }
        }

        // Evaluate the rest in dependency order; each cell sees its
        // precedents' freshly written results
        for &addr in &order {
            if circular.contains(&addr) {
                continue;
            }
            let Some(ast) = self.asts.get(&addr) else {
                continue;
            };

            let value: CellValue = evaluate(ast, &SheetProvider { sheet: &self.sheet }).into();
            summary.evaluated += 1;
            if matches!(value, CellValue::Error(_)) {
                summary.errors += 1;
            }

            let prev = self.sheet.value(addr);
            if self.sheet.set_cached_result(addr, value.clone()).is_err() {
                log::warn!("dropping result for vanished formula cell {}", addr);
                continue;
            }
            if value != prev {
                changed.insert(addr);
            }
        }

        // Non-formula dirty cells were already written at edit time; only
        // circular cells stay dirty for the next pass
        self.dirty.clear();
        self.dirty.extend(circular.iter().copied());

        summary.circular = circular.len();
        summary.errors += circular.len();
        summary.changed = changed.into_iter().collect();
        summary.changed.sort_unstable();

        log::debug!(
            "recalculated {} cells ({} circular, {} errors, {} notifications)",
            summary.evaluated,
            summary.circular,
            summary.errors,
            summary.changed.len()
        );

        summary
    }
}

/// Depth-first post-order over precedents, restricted to the target set
///
/// Revisiting an in-progress node means the traversal closed a cycle:
/// every node on the current stack is reported circular, exactly as the
/// recalculation contract specifies.
fn visit(
    cell: CellAddress,
    graph: &DependencyGraph,
    targets: &AHashSet<CellAddress>,
    state: &mut AHashMap<CellAddress, VisitState>,
    stack: &mut Vec<CellAddress>,
    order: &mut Vec<CellAddress>,
    circular: &mut AHashSet<CellAddress>,
) {
    match state.get(&cell) {
        Some(VisitState::Done) => return,
        Some(VisitState::InProgress) => {
            circular.extend(stack.iter().copied());
            return;
        }
        None => {}
    }

    // Cells outside the dirty closure keep their cached values and act as
    // evaluation leaves
    if !targets.contains(&cell) {
        return;
    }

    state.insert(cell, VisitState::InProgress);
    stack.push(cell);

    let precedents: Vec<CellAddress> = graph.precedents(cell).collect();
    for precedent in precedents {
        visit(precedent, graph, targets, state, stack, order, circular);
    }

    stack.pop();
    state.insert(cell, VisitState::Done);
    order.push(cell);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_chain_recomputes_in_dependency_order() {
        let mut doc = Document::new("Test");
        doc.set_content(addr("A1"), "5").unwrap();
        doc.set_content(addr("A2"), "=A1*2").unwrap();
        doc.set_content(addr("A3"), "=A2+1").unwrap();

        let summary = doc.recalculate();

        assert_eq!(doc.value(addr("A2")), CellValue::Number(10.0));
        assert_eq!(doc.value(addr("A3")), CellValue::Number(11.0));
        assert_eq!(summary.circular, 0);
        assert!(summary.changed.contains(&addr("A2")));
        assert!(summary.changed.contains(&addr("A3")));
    }

    #[test]
    fn test_incremental_skips_untouched_cells() {
        let mut doc = Document::new("Test");
        doc.set_content(addr("A1"), "1").unwrap();
        doc.set_content(addr("A2"), "=A1+1").unwrap();
        doc.set_content(addr("B1"), "10").unwrap();
        doc.set_content(addr("B2"), "=B1*2").unwrap();
        doc.recalculate();

        // Editing A1 must not re-evaluate the B column
        doc.set_content(addr("A1"), "2").unwrap();
        let summary = doc.recalculate();

        assert_eq!(summary.evaluated, 1);
        assert_eq!(doc.value(addr("A2")), CellValue::Number(3.0));
        assert_eq!(doc.value(addr("B2")), CellValue::Number(20.0));
    }

    #[test]
    fn test_cycle_marks_whole_stack_and_keeps_cells_dirty() {
        let mut doc = Document::new("Test");
        doc.set_content(addr("A1"), "=B1").unwrap();
        doc.set_content(addr("B1"), "=A1").unwrap();

        let summary = doc.recalculate();

        assert_eq!(summary.circular, 2);
        assert_eq!(doc.value(addr("A1")), CellValue::Error(CellError::Circular));
        assert_eq!(doc.value(addr("B1")), CellValue::Error(CellError::Circular));

        // Breaking the cycle clears the errors on the next pass
        doc.set_content(addr("B1"), "3").unwrap();
        doc.recalculate();
        assert_eq!(doc.value(addr("A1")), CellValue::Number(3.0));
    }

    #[test]
    fn test_self_reference_is_circular() {
        let mut doc = Document::new("Test");
        doc.set_content(addr("A1"), "=A1+1").unwrap();

        let summary = doc.recalculate();
        assert_eq!(summary.circular, 1);
        assert_eq!(doc.value(addr("A1")), CellValue::Error(CellError::Circular));
    }

    #[test]
    fn test_reader_of_cycle_gets_propagated_error() {
        let mut doc = Document::new("Test");
        doc.set_content(addr("A1"), "=B1").unwrap();
        doc.set_content(addr("B1"), "=A1").unwrap();
        doc.set_content(addr("C1"), "=A1+1").unwrap();

        doc.recalculate();

        // C1 reads a circular cell: propagated reference error, never a
        // stale number
        assert_eq!(
            doc.value(addr("C1")),
            CellValue::Error(CellError::Unresolved)
        );
    }
}
