//! Store errors

use thiserror::Error;

use crate::query::QueryError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors of the in-memory store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Stage name not supported by the store
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// Stage document with the wrong shape
    #[error("Invalid {stage} stage: {message}")]
    InvalidStage { stage: String, message: String },

    /// Expression, accumulator or query operator not supported
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// `$regex` pattern that does not compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Documents could not be loaded
    #[error("Failed to load documents: {0}")]
    Load(String),
}

impl StoreError {
    pub fn invalid_stage(stage: &str, message: impl Into<String>) -> Self {
        StoreError::InvalidStage {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::UnknownStage(_) => "STORE_UNKNOWN_STAGE",
            StoreError::InvalidStage { .. } => "STORE_INVALID_STAGE",
            StoreError::UnsupportedOperator(_) => "STORE_UNSUPPORTED_OPERATOR",
            StoreError::InvalidPattern { .. } => "STORE_INVALID_PATTERN",
            StoreError::Load(_) => "STORE_LOAD_FAILED",
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::Execution(format!("{}: {}", err.code(), err))
    }
}
