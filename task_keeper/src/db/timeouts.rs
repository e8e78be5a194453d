//! Database query timeout helpers
//!
//! Every PostgreSQL query issued by the repositories goes through one of these
//! wrappers so a stalled connection surfaces as [`StoreError::Timeout`] instead
//! of hanging the request.

use super::errors::{StoreError, StoreResult};
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for schema migrations (30 seconds)
pub const MIGRATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute a query with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Example
///
/// ```no_run
/// use task_keeper::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
///
/// let row = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT id FROM users WHERE id = $1")
///         .bind(1_i64)
///         .fetch_optional(pool)
/// ).await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> StoreResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(map_sqlx_error(e)),
        Err(_) => Err(StoreError::Timeout(duration)),
    }
}

/// Execute a query with default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> StoreResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

/// Translate unique violations into [`StoreError::Conflict`].
///
/// The conflicting field is recovered from the constraint name
/// (`users_username_key`, `users_email_key`, ...).
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error
        && db_error.is_unique_violation()
    {
        let field = db_error
            .constraint()
            .map(field_from_constraint)
            .unwrap_or("value");
        return StoreError::conflict(field);
    }
    StoreError::Database(error)
}

fn field_from_constraint(constraint: &str) -> &'static str {
    if constraint.contains("username") {
        "username"
    } else if constraint.contains("email") {
        "email"
    } else {
        "value"
    }
}
