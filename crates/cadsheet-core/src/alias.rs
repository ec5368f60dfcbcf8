//! Alias registry
//!
//! An alias is a user-assigned symbolic name bound 1:1 to a single cell,
//! usable in formulas in place of a positional address. The registry is
//! owned by a [`Sheet`](crate::Sheet) instance — one per document, never
//! process-global — and keeps the name↔address mapping bijective through
//! structural edits.

use crate::cell::CellAddress;
use crate::error::{Error, Result};
use ahash::AHashMap;
use lazy_regex::regex_is_match;
use std::collections::HashMap;

/// Bijective mapping between alias names and cell addresses
#[derive(Debug, Default)]
pub struct AliasRegistry {
    by_name: HashMap<String, CellAddress>,
    by_cell: AHashMap<CellAddress, String>,
}

impl AliasRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a name is usable as an alias
    ///
    /// Aliases are identifier-like (`^[A-Za-z_][A-Za-z0-9_]*$`) and must not
    /// parse as a cell address, so `B12` can never shadow the grid.
    pub fn validate_name(name: &str) -> Result<()> {
        if !regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_]*$", name) {
            return Err(Error::AliasConflict(format!(
                "'{}' contains invalid characters",
                name
            )));
        }
        if CellAddress::parse(name).is_ok() {
            return Err(Error::AliasConflict(format!(
                "'{}' collides with cell address syntax",
                name
            )));
        }
        Ok(())
    }

    /// Bind a name to a cell
    ///
    /// Rebinding a cell's own alias to a new name replaces the old one.
    /// Fails with `AliasConflict` if the name is malformed or already bound
    /// to a *different* cell. No state changes on failure.
    pub fn bind(&mut self, name: &str, addr: CellAddress) -> Result<()> {
        Self::validate_name(name)?;

        if let Some(&existing) = self.by_name.get(name) {
            if existing != addr {
                return Err(Error::AliasConflict(format!(
                    "'{}' is already bound to {}",
                    name, existing
                )));
            }
            return Ok(()); // already bound to this cell
        }

        // One alias per cell: a new name replaces the cell's previous one
        if let Some(old) = self.by_cell.insert(addr, name.to_string()) {
            self.by_name.remove(&old);
        }
        self.by_name.insert(name.to_string(), addr);
        Ok(())
    }

    /// Resolve a name to its bound address
    pub fn resolve(&self, name: &str) -> Option<CellAddress> {
        self.by_name.get(name).copied()
    }

    /// Get the alias bound to a cell, if any
    pub fn alias_of(&self, addr: CellAddress) -> Option<&str> {
        self.by_cell.get(&addr).map(String::as_str)
    }

    /// Remove a binding by name, returning the address it pointed at
    pub fn unbind(&mut self, name: &str) -> Result<CellAddress> {
        let addr = self
            .by_name
            .remove(name)
            .ok_or_else(|| Error::UnknownAlias(name.to_string()))?;
        self.by_cell.remove(&addr);
        Ok(addr)
    }

    /// Remove the binding of a cell, returning the name that was bound
    pub fn unbind_cell(&mut self, addr: CellAddress) -> Option<String> {
        let name = self.by_cell.remove(&addr)?;
        self.by_name.remove(&name);
        Some(name)
    }

    /// Iterate over all bindings
    pub fn iter(&self) -> impl Iterator<Item = (&str, CellAddress)> {
        self.by_name.iter().map(|(name, &addr)| (name.as_str(), addr))
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    // === Structural edits ===

    /// Shift bindings for a row insertion at `at`
    pub fn insert_rows(&mut self, at: u32, count: u32) {
        self.remap(|addr| {
            if addr.row >= at {
                Some(CellAddress::new(addr.row + count, addr.col))
            } else {
                Some(addr)
            }
        });
    }

    /// Shift bindings for a row removal, unbinding aliases of destroyed
    /// cells. Returns the unbound names.
    pub fn remove_rows(&mut self, at: u32, count: u32) -> Vec<String> {
        self.remap(|addr| {
            if addr.row < at {
                Some(addr)
            } else if addr.row < at + count {
                None
            } else {
                Some(CellAddress::new(addr.row - count, addr.col))
            }
        })
    }

    /// Shift bindings for a column insertion at `at`
    pub fn insert_cols(&mut self, at: u16, count: u16) {
        self.remap(|addr| {
            if addr.col >= at {
                Some(CellAddress::new(addr.row, addr.col + count))
            } else {
                Some(addr)
            }
        });
    }

    /// Shift bindings for a column removal, unbinding aliases of destroyed
    /// cells. Returns the unbound names.
    pub fn remove_cols(&mut self, at: u16, count: u16) -> Vec<String> {
        self.remap(|addr| {
            if addr.col < at {
                Some(addr)
            } else if addr.col < at + count {
                None
            } else {
                Some(CellAddress::new(addr.row, addr.col - count))
            }
        })
    }

    fn remap(&mut self, f: impl Fn(CellAddress) -> Option<CellAddress>) -> Vec<String> {
        let mut unbound = Vec::new();
        let mut by_name = HashMap::with_capacity(self.by_name.len());
        let mut by_cell = AHashMap::with_capacity(self.by_cell.len());

        for (name, addr) in self.by_name.drain() {
            match f(addr) {
                Some(new_addr) => {
                    by_cell.insert(new_addr, name.clone());
                    by_name.insert(name, new_addr);
                }
                None => unbound.push(name),
            }
        }

        self.by_name = by_name;
        self.by_cell = by_cell;
        unbound
    }
}
