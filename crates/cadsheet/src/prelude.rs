//! Convenient glob import for common usage
//!
//! ```rust
//! use cadsheet::prelude::*;
//! ```

pub use crate::document::Document;
pub use crate::error::{DocumentError, DocumentResult};
pub use crate::recalc::RecalcSummary;

pub use cadsheet_core::{
    CellAddress, CellError, CellRange, CellValue, Color, HorizontalAlignment, ResolvedRef, Sheet,
    Style, VerticalAlignment,
};
pub use cadsheet_csv::{CsvExportOptions, CsvImportOptions, CsvReader, CsvWriter};
pub use cadsheet_formula::parse_formula;
