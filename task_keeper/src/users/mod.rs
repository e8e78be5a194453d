//! User profile management for authenticated callers.

use crate::auth::{User, UserId};
use crate::db::{StoreError, UserRepository};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Public view of a user, safe to return to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Profile update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
}

/// User errors
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound(UserId),

    /// Persistence failure, including username/email conflicts
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for user operations
pub type UserResult<T> = Result<T, UserError>;

/// Reads, updates and deletes user profiles.
#[derive(Clone)]
pub struct UserManager {
    users: Arc<dyn UserRepository>,
}

impl UserManager {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn profile(&self, user_id: UserId) -> UserResult<UserProfile> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or(UserError::NotFound(user_id))
    }

    /// Replace username and email.
    ///
    /// # Errors
    ///
    /// * `UserError::Store(StoreError::Conflict)` - value taken by another user
    /// * `UserError::NotFound` - user was deleted
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> UserResult<UserProfile> {
        let user = self
            .users
            .update_profile(user_id, &update.username, &update.email)
            .await?
            .ok_or(UserError::NotFound(user_id))?;

        log::info!("Updated profile for user {user_id}");
        Ok(user.into())
    }

    /// Delete the user together with all of their tasks
    pub async fn delete(&self, user_id: UserId) -> UserResult<()> {
        if self.users.delete_user(user_id).await? {
            log::info!("Deleted user {user_id}");
            Ok(())
        } else {
            Err(UserError::NotFound(user_id))
        }
    }
}
