//! Task error types.

use super::models::TaskId;
use crate::db::StoreError;
use thiserror::Error;

/// Task errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task with this id belongs to the caller
    #[error("Task {0} not found")]
    NotFound(TaskId),

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for task operations
pub type TaskResult<T> = Result<T, TaskError>;
