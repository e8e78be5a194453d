//! Task manager implementation.

use super::{
    errors::{TaskError, TaskResult},
    models::{NewTask, Task, TaskId},
};
use crate::auth::UserId;
use crate::db::TaskRepository;
use std::sync::Arc;

/// Per-user task operations.
///
/// Every call is scoped to the owning user: a task that exists but belongs
/// to someone else is reported as not found.
#[derive(Clone)]
pub struct TaskManager {
    tasks: Arc<dyn TaskRepository>,
}

impl TaskManager {
    pub fn new(tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tasks }
    }

    pub async fn create(&self, user_id: UserId, new_task: NewTask) -> TaskResult<Task> {
        let task = self.tasks.create_task(user_id, &new_task).await?;
        log::debug!("User {user_id} created task {}", task.id);
        Ok(task)
    }

    /// All of the user's tasks, newest first
    pub async fn list(&self, user_id: UserId) -> TaskResult<Vec<Task>> {
        Ok(self.tasks.list_tasks(user_id).await?)
    }

    pub async fn get(&self, user_id: UserId, task_id: TaskId) -> TaskResult<Task> {
        self.tasks
            .find_task(user_id, task_id)
            .await?
            .ok_or(TaskError::NotFound(task_id))
    }

    /// Flip the `finished` flag and return the updated task
    pub async fn toggle_finished(&self, user_id: UserId, task_id: TaskId) -> TaskResult<Task> {
        self.tasks
            .toggle_finished(user_id, task_id)
            .await?
            .ok_or(TaskError::NotFound(task_id))
    }

    pub async fn delete(&self, user_id: UserId, task_id: TaskId) -> TaskResult<()> {
        if self.tasks.delete_task(user_id, task_id).await? {
            log::debug!("User {user_id} deleted task {task_id}");
            Ok(())
        } else {
            Err(TaskError::NotFound(task_id))
        }
    }
}
