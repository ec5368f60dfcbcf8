//! # cadsheet
//!
//! The cell dependency and formula-evaluation engine behind a CAD-embedded
//! spreadsheet module. A [`Document`] ties together:
//! - the sparse grid with merges, formatting, and the alias registry
//!   (`cadsheet-core`)
//! - formula parsing, the dependency graph, and the evaluator
//!   (`cadsheet-formula`)
//! - CSV import/export of raw content (`cadsheet-csv`)
//!
//! Edits are single-writer transactions; recalculation is deferred,
//! incremental, and cycle-aware.
//!
//! ## Example
//!
//! ```rust
//! use cadsheet::prelude::*;
//!
//! let mut doc = Document::new("Params");
//! let a1 = CellAddress::parse("A1").unwrap();
//! let a2 = CellAddress::parse("A2").unwrap();
//!
//! doc.set_content(a1, "5").unwrap();
//! doc.set_content(a2, "=A1*2").unwrap();
//! doc.recalculate();
//!
//! assert_eq!(doc.value(a2), CellValue::Number(10.0));
//! ```

pub mod document;
pub mod error;
pub mod prelude;
pub mod recalc;

pub use document::Document;
pub use error::{DocumentError, DocumentResult};
pub use recalc::RecalcSummary;

// Re-export the member crates under stable names
pub use cadsheet_core as core;
pub use cadsheet_csv as csv;
pub use cadsheet_formula as formula;

// Common types at the crate root
pub use cadsheet_core::{
    Alignment, AliasRegistry, CellAddress, CellData, CellError, CellRange, CellValue, Color,
    FontStyle, HorizontalAlignment, ResolvedRef, Sheet, SharedString, Style, VerticalAlignment,
};
pub use cadsheet_csv::{CsvExportOptions, CsvImportOptions, CsvReader, CsvWriter};
pub use cadsheet_formula::{parse_formula, DependencyGraph, Expr, FormulaError};
