//! # cadsheet-core
//!
//! Core data structures for the cadsheet spreadsheet engine:
//! - [`CellValue`] - Cell values (numbers, strings, booleans, errors, formulas)
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges
//! - [`AliasRegistry`] - Symbolic cell names, bijective with addresses
//! - [`Style`] - Cell formatting (alignment, font flags, colors)
//! - [`Sheet`] - The sparse document grid with merges and structural edits
//!
//! ## Example
//!
//! ```rust
//! use cadsheet_core::{CellAddress, CellValue, Sheet};
//!
//! let mut sheet = Sheet::new("Params");
//! let b1 = CellAddress::parse("B1").unwrap();
//!
//! sheet.set_content(b1, "0.05").unwrap();
//! sheet.set_alias(b1, "rate").unwrap();
//!
//! assert_eq!(sheet.value(b1), CellValue::Number(0.05));
//! assert_eq!(sheet.resolve_alias("rate"), Some(b1));
//! ```

pub mod alias;
pub mod cell;
pub mod error;
pub mod sheet;
pub mod style;

// Re-exports for convenience
pub use alias::AliasRegistry;
pub use cell::{CellAddress, CellData, CellError, CellRange, CellValue, SharedString};
pub use error::{Error, Result};
pub use sheet::{ResolvedRef, Sheet, FORMULA_MARKER};
pub use style::{
    Alignment, Color, FontStyle, HorizontalAlignment, Style, StylePool, VerticalAlignment,
};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;
