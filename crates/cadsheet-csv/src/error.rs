//! CSV error types

use thiserror::Error;

/// Result type for CSV operations
pub type CsvResult<T> = std::result::Result<T, CsvError>;

/// Errors that can occur during CSV import/export
#[derive(Debug, Error)]
pub enum CsvError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV format error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Core sheet error (out-of-bounds field, covered cell, ...)
    #[error("Sheet error: {0}")]
    Core(#[from] cadsheet_core::Error),
}
