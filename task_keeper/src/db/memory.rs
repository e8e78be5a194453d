//! In-memory repository implementation.
//!
//! Mirrors the PostgreSQL schema semantics: unique usernames and emails,
//! owner-scoped task lookups, cascade deletion and verification code expiry.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::errors::{StoreError, StoreResult};
use super::repository::{TaskRepository, UserRepository, VerificationRepository};
use crate::auth::{NewUser, User, UserId, VERIFICATION_CODE_TTL_SECS, VerificationRecord};
use crate::tasks::{NewTask, Task, TaskId};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    tasks: HashMap<TaskId, Task>,
    codes: HashMap<String, VerificationRecord>,
    last_user_id: UserId,
    last_task_id: TaskId,
}

impl Tables {
    /// First unique field of `username`/`email` already held by a user other than `except`
    fn taken_field(&self, username: &str, email: &str, except: Option<UserId>) -> Option<&'static str> {
        let others = || self.users.values().filter(move |u| Some(u.id) != except);
        if others().any(|u| u.username == username) {
            Some("username")
        } else if others().any(|u| u.email == email) {
            Some("email")
        } else {
            None
        }
    }
}

/// Repository backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: &NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if let Some(field) = tables.taken_field(&new_user.username, &new_user.email, None) {
            return Err(StoreError::conflict(field));
        }

        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == identifier || u.email == identifier)
            .cloned())
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                true
            }
            None => false,
        })
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Ok(None);
        }
        if let Some(field) = tables.taken_field(username, email, Some(user_id)) {
            return Err(StoreError::conflict(field));
        }

        Ok(tables.users.get_mut(&user_id).map(|user| {
            user.username = username.to_string();
            user.email = email.to_string();
            user.clone()
        }))
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.users.remove(&user_id).is_some();
        if removed {
            tables.tasks.retain(|_, task| task.user_id != user_id);
        }
        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create_task(&self, user_id: UserId, new_task: &NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.last_task_id += 1;
        let task = Task {
            id: tables.last_task_id,
            user_id,
            task: new_task.task.clone(),
            details: new_task.details.clone(),
            finished: new_task.finished,
            created_at: Utc::now(),
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, user_id: UserId) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(tasks)
    }

    async fn find_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Option<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .get(&task_id)
            .filter(|task| task.user_id == user_id)
            .cloned())
    }

    async fn toggle_finished(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .tasks
            .get_mut(&task_id)
            .filter(|task| task.user_id == user_id)
            .map(|task| {
                task.finished = !task.finished;
                task.clone()
            }))
    }

    async fn delete_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .tasks
            .get(&task_id)
            .is_some_and(|task| task.user_id == user_id);
        if owned {
            tables.tasks.remove(&task_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl VerificationRepository for MemoryStore {
    async fn upsert_code(&self, record: &VerificationRecord) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .codes
            .insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn take_code(&self, email: &str, code: &str) -> StoreResult<bool> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let matched = tables
            .codes
            .get(email)
            .is_some_and(|record| record.is_live_at(now) && record.matches(code));
        if matched {
            tables.codes.remove(email);
        }
        Ok(matched)
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let cutoff = Utc::now() - Duration::seconds(VERIFICATION_CODE_TTL_SECS);
        let mut tables = self.tables.write().await;
        let before = tables.codes.len();
        tables.codes.retain(|_, record| record.created_at > cutoff);
        Ok((before - tables.codes.len()) as u64)
    }
}
