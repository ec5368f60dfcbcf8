//! Error types for cadsheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cadsheet-core
///
/// These are *edit-time* failures: the operation is rejected and the sheet is
/// left exactly as it was. Evaluation failures are not represented here; they
/// are stored as [`CellError`](crate::CellError) values inside cells.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Alias is malformed or already bound to a different cell
    #[error("Alias conflict: {0}")]
    AliasConflict(String),

    /// Alias is not bound to any cell
    #[error("Unknown alias: {0}")]
    UnknownAlias(String),

    /// Merge over an existing merge, split of a non-anchor cell, or an edit
    /// targeting a covered cell
    #[error("Structural conflict: {0}")]
    StructuralConflict(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
