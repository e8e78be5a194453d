//! Persistence error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by repository implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field is already taken by another record
    #[error("Duplicate value for unique field: {field}")]
    Conflict { field: String },

    /// Query did not complete in time
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Build a conflict error for the named field
    pub fn conflict(field: impl Into<String>) -> Self {
        StoreError::Conflict {
            field: field.into(),
        }
    }
}

/// Result type for repository operations
pub type StoreResult<T> = Result<T, StoreError>;
