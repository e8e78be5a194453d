//! Task endpoints, all scoped to the authenticated caller.

use super::{
    AppState, errors::ApiError, extract::ValidatedJson, middleware::AuthUser, pipeline::Intent,
};
use axum::extract::{Path, State};
use serde::Deserialize;
use task_keeper::tasks::{NewTask, TaskId};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskPayload {
    #[validate(length(min = 3, max = 100, message = "Task must be between 3 and 100 characters"))]
    pub task: String,
    #[serde(default)]
    #[validate(length(max = 350, message = "Details must be at most 350 characters"))]
    pub details: String,
    #[serde(default)]
    pub finished: bool,
}

fn task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("Invalid task id: {raw}")))
}

pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateTaskPayload>,
) -> Result<Intent, ApiError> {
    let task = state
        .tasks
        .create(
            user_id,
            NewTask {
                task: payload.task,
                details: payload.details,
                finished: payload.finished,
            },
        )
        .await?;
    Intent::created("Task created successfully").with_data(&task)
}

/// Caller's tasks, newest first; an empty list is still a success
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Intent, ApiError> {
    let tasks = state.tasks.list(user_id).await?;
    Intent::ok("Tasks fetched successfully").with_data(&tasks)
}

pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Intent, ApiError> {
    let task = state.tasks.get(user_id, task_id(&id)?).await?;
    Intent::ok("Task fetched successfully").with_data(&task)
}

pub async fn toggle_finished(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Intent, ApiError> {
    let task = state.tasks.toggle_finished(user_id, task_id(&id)?).await?;
    Intent::ok("Task updated successfully").with_data(&task)
}

pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Intent, ApiError> {
    state.tasks.delete(user_id, task_id(&id)?).await?;
    Ok(Intent::ok("Task deleted successfully"))
}
