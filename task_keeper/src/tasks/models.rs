//! Task data models.

use crate::auth::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task ID type
pub type TaskId = i64;

/// A task owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub task: String,
    pub details: String,
    pub finished: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub task: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub finished: bool,
}
