//! Document error types

use thiserror::Error;

/// Result type for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Errors that can reject a document edit
///
/// All variants are edit-time rejections: the document is left exactly as
/// it was before the attempted edit. Evaluation failures are stored as
/// [`CellError`](cadsheet_core::CellError) values instead.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Sheet-level rejection (bad address, alias conflict, structural
    /// conflict)
    #[error(transparent)]
    Sheet(#[from] cadsheet_core::Error),

    /// Formula syntax error
    #[error(transparent)]
    Formula(#[from] cadsheet_formula::FormulaError),
}
