//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over database operations,
//! enabling in-memory implementations for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::errors::StoreResult;
use super::timeouts::with_default_timeout;
use crate::auth::{NewUser, User, UserId, VerificationRecord};
use crate::tasks::{NewTask, Task, TaskId};

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; `Conflict` when the username or email is taken
    async fn create_user(&self, new_user: &NewUser) -> StoreResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Find user whose username or email equals `identifier`
    async fn find_by_username_or_email(&self, identifier: &str) -> StoreResult<Option<User>>;

    /// Replace the stored password hash. Returns `false` if the user is gone.
    async fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<bool>;

    /// Update username and email; `Conflict` when either is taken
    async fn update_profile(
        &self,
        user_id: UserId,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<User>>;

    /// Delete a user and everything they own. Returns `false` if absent.
    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool>;

    /// Cheap connectivity check
    async fn ping(&self) -> StoreResult<()>;
}

/// Trait for task repository operations. Every lookup is scoped to the owner.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a task owned by `user_id`
    async fn create_task(&self, user_id: UserId, new_task: &NewTask) -> StoreResult<Task>;

    /// All tasks of a user, newest first
    async fn list_tasks(&self, user_id: UserId) -> StoreResult<Vec<Task>>;

    /// Find one task
    async fn find_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Option<Task>>;

    /// Flip the `finished` flag atomically
    async fn toggle_finished(&self, user_id: UserId, task_id: TaskId)
    -> StoreResult<Option<Task>>;

    /// Delete one task. Returns `false` if absent.
    async fn delete_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<bool>;
}

/// Trait for email verification code storage.
///
/// At most one record exists per email. Records older than
/// [`crate::auth::VERIFICATION_CODE_TTL_SECS`] are never returned.
#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// Insert or replace the record for `record.email`
    async fn upsert_code(&self, record: &VerificationRecord) -> StoreResult<()>;

    /// Remove the live record for `email` if its code equals `code`.
    ///
    /// Check and removal are one atomic step: of several concurrent callers
    /// presenting the right code, exactly one gets `true`. A wrong code
    /// leaves the record in place.
    async fn take_code(&self, email: &str, code: &str) -> StoreResult<bool>;

    /// Remove every expired record, returning how many were removed
    async fn purge_expired(&self) -> StoreResult<u64>;
}

/// PostgreSQL implementation of every repository trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";
const TASK_COLUMNS: &str = "id, user_id, task, details, finished, created_at";

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

fn task_from_row(row: &PgRow) -> Task {
    Task {
        id: row.get("id"),
        user_id: row.get("user_id"),
        task: row.get("task"),
        details: row.get("details"),
        finished: row.get("finished"),
        created_at: row.get("created_at"),
    }
}

fn verification_from_row(row: &PgRow) -> VerificationRecord {
    VerificationRecord {
        email: row.get("email"),
        code: row.get("code"),
        created_at: row.get("created_at"),
    }
}

fn verification_cutoff() -> DateTime<Utc> {
    Utc::now() - Duration::seconds(crate::auth::VERIFICATION_CODE_TTL_SECS)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, new_user: &NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(&new_user.username)
                .bind(&new_user.email)
                .bind(&new_user.password_hash)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(user_from_row(&row))
    }

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(identifier)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
                .bind(password_hash)
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET username = $1, email = $2 WHERE id = $3 RETURNING {USER_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(username)
                .bind(email)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        // tasks.user_id cascades
        let result = with_default_timeout(
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> StoreResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn create_task(&self, user_id: UserId, new_task: &NewTask) -> StoreResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (user_id, task, details, finished) VALUES ($1, $2, $3, $4) RETURNING {TASK_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(user_id)
                .bind(&new_task.task)
                .bind(&new_task.details)
                .bind(new_task.finished)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(task_from_row(&row))
    }

    async fn list_tasks(&self, user_id: UserId) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(user_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(task_from_row).collect())
    }

    async fn find_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(task_id)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(task_from_row))
    }

    async fn toggle_finished(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> StoreResult<Option<Task>> {
        let sql = format!(
            "UPDATE tasks SET finished = NOT finished WHERE id = $1 AND user_id = $2 RETURNING {TASK_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(task_id)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(task_from_row))
    }

    async fn delete_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
                .bind(task_id)
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl VerificationRepository for PgStore {
    async fn upsert_code(&self, record: &VerificationRecord) -> StoreResult<()> {
        with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO verification_records (email, code, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (email) DO UPDATE SET code = EXCLUDED.code, created_at = EXCLUDED.created_at
                "#,
            )
            .bind(&record.email)
            .bind(&record.code)
            .bind(record.created_at)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn take_code(&self, email: &str, code: &str) -> StoreResult<bool> {
        with_default_timeout(async {
            let mut tx = self.pool.begin().await?;

            // Row lock serialises concurrent confirmations of the same email
            let row = sqlx::query(
                "SELECT email, code, created_at FROM verification_records
                 WHERE email = $1 AND created_at > $2
                 FOR UPDATE",
            )
            .bind(email)
            .bind(verification_cutoff())
            .fetch_optional(&mut *tx)
            .await?;

            let matched = row
                .as_ref()
                .map(verification_from_row)
                .is_some_and(|record| record.matches(code));
            if !matched {
                return Ok::<_, sqlx::Error>(false);
            }

            sqlx::query("DELETE FROM verification_records WHERE email = $1")
                .bind(email)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            Ok(true)
        })
        .await
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM verification_records WHERE created_at <= $1")
                .bind(verification_cutoff())
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected())
    }
}
