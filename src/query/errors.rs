//! Query errors
//!
//! Malformed filters, unknown operators and unknown intervals are not
//! errors; they compile to "no filter" or to exact-value grouping. Errors
//! here abort the whole request.

use thiserror::Error;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The runner failed to execute a pipeline
    #[error("Pipeline execution failed: {0}")]
    Execution(String),

    /// Load options could not be decoded
    #[error("Invalid load options: {0}")]
    InvalidOptions(String),

    /// A pipeline result lacks the expected shape
    #[error("Unexpected result document: {0}")]
    InvalidResult(String),

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Execution(_) => "GRID_EXECUTION_FAILED",
            QueryError::InvalidOptions(_) => "GRID_INVALID_OPTIONS",
            QueryError::InvalidResult(_) => "GRID_INVALID_RESULT",
            QueryError::Config(_) => "GRID_CONFIG_ERROR",
        }
    }
}
