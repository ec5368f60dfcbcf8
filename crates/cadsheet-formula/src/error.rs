//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing
///
/// Parse errors are edit-time failures: the offending edit is rejected and
/// the prior cell state is unchanged. Evaluation never produces a
/// `FormulaError` — runtime failures become
/// [`CellError`](cadsheet_core::CellError) *values*.
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Malformed formula text
    #[error("Syntax error: {0}")]
    Syntax(String),
}

impl FormulaError {
    pub(crate) fn syntax<S: Into<String>>(msg: S) -> Self {
        FormulaError::Syntax(msg.into())
    }
}
