//! Dependency tracking between cells
//!
//! A directed graph in which an edge from A to B means "A's formula reads
//! B". The graph only stores and queries edges; cycle handling belongs to
//! the recalculation pass. Nodes are plain [`CellAddress`] keys in adjacency
//! maps, so cycles are just edges with no ownership implications.

use ahash::{AHashMap, AHashSet};
use cadsheet_core::CellAddress;

/// Dependency graph for formula cells
///
/// Both directions are indexed: `precedents` (what a formula reads) drive
/// evaluation order, `dependents` (who reads a cell) drive dirty
/// propagation. The edge set of a cell is always replaced wholesale from its
/// current parsed formula, never patched.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Cell → cells its formula reads
    precedents: AHashMap<CellAddress, AHashSet<CellAddress>>,
    /// Cell → cells whose formulas read it
    dependents: AHashMap<CellAddress, AHashSet<CellAddress>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace all outgoing edges of `cell`
    ///
    /// Passing an empty set removes the cell's reads entirely (literal cell
    /// or cleared formula).
    pub fn set_edges(&mut self, cell: CellAddress, reads: impl IntoIterator<Item = CellAddress>) {
        self.clear_edges(cell);

        let reads: AHashSet<CellAddress> = reads.into_iter().collect();
        if reads.is_empty() {
            return;
        }

        for &target in &reads {
            self.dependents.entry(target).or_default().insert(cell);
        }
        self.precedents.insert(cell, reads);
    }

    /// Remove all outgoing edges of `cell`
    pub fn clear_edges(&mut self, cell: CellAddress) {
        if let Some(old) = self.precedents.remove(&cell) {
            for target in old {
                if let Some(deps) = self.dependents.get_mut(&target) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.dependents.remove(&target);
                    }
                }
            }
        }
    }

    /// Cells that `cell`'s formula reads
    pub fn precedents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Cells whose formulas read `cell` directly
    pub fn dependents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Check whether anything reads `cell`
    pub fn has_dependents(&self, cell: CellAddress) -> bool {
        self.dependents.contains_key(&cell)
    }

    /// Everything that must be recomputed when the seed cells change: the
    /// transitive closure over reverse edges. The seeds themselves are
    /// included only if reachable (self-loops, mutual cycles).
    pub fn affected(&self, seeds: impl IntoIterator<Item = CellAddress>) -> AHashSet<CellAddress> {
        let mut result = AHashSet::new();
        let mut queue: Vec<CellAddress> = seeds.into_iter().collect();

        while let Some(cell) = queue.pop() {
            if let Some(deps) = self.dependents.get(&cell) {
                for &dep in deps {
                    if result.insert(dep) {
                        queue.push(dep);
                    }
                }
            }
        }

        result
    }

    /// Addresses that appear as read targets (useful for finding cells whose
    /// removal breaks formulas elsewhere)
    pub fn read_targets(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.dependents.keys().copied()
    }

    /// Rewrite every node through an address mapping
    ///
    /// Used after structural edits: `f` returns the node's new address, or
    /// `None` if the cell was destroyed — edges touching destroyed nodes are
    /// dropped.
    pub fn remap(&mut self, f: impl Fn(CellAddress) -> Option<CellAddress>) {
        let old = std::mem::take(&mut self.precedents);
        self.dependents.clear();

        for (cell, reads) in old {
            let Some(new_cell) = f(cell) else { continue };
            let new_reads: AHashSet<CellAddress> =
                reads.into_iter().filter_map(&f).collect();

            for &target in &new_reads {
                self.dependents.entry(target).or_default().insert(new_cell);
            }
            if !new_reads.is_empty() {
                self.precedents.insert(new_cell, new_reads);
            }
        }
    }

    /// Number of cells with outgoing edges
    pub fn len(&self) -> usize {
        self.precedents.len()
    }

    /// Check whether the graph has no edges
    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }

    /// Drop every edge
    pub fn clear(&mut self) {
        self.precedents.clear();
        self.dependents.clear();
    }
}
