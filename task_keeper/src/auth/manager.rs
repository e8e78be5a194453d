//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult},
    models::{IssuedToken, LoginRequest, NewUser, RegisterRequest, SessionTokens, User, UserId},
    password::PasswordHasher,
    tokens::TokenIssuer,
};
use crate::db::UserRepository;
use std::sync::Arc;

/// Authentication manager
///
/// Ties the password hasher and token issuer to the user store. Token
/// checks never touch the store; only login, registration and password
/// changes do.
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - User persistence
    /// * `tokens` - Token issuer holding the access and refresh secrets
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenIssuer) -> Self {
        Self {
            users,
            hasher: PasswordHasher::default(),
            tokens: Arc::new(tokens),
        }
    }

    /// Replace the password hasher (lighter parameters in tests)
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// * `AuthError::EmptyPassword` - Password is empty
    /// * `AuthError::Store` - Username or email already taken (`StoreError::Conflict`)
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        let password_hash = self.hasher.hash_blocking(request.password).await?;

        let user = self
            .users
            .create_user(&NewUser {
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await?;

        log::info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    /// Login a user
    ///
    /// `email_or_username` is matched against both columns.
    ///
    /// # Returns
    ///
    /// * `AuthResult<(User, SessionTokens)>` - User and a fresh token pair
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No user with that username or email
    /// * `AuthError::InvalidPassword` - Incorrect password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, SessionTokens)> {
        let user = self
            .users
            .find_by_username_or_email(&request.email_or_username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.check_password(request.password, &user).await?;

        let tokens = self.tokens.issue_session(user.id, request.remember_me)?;
        log::info!(
            "User {} logged in (remember_me={})",
            user.id,
            request.remember_me
        );
        Ok((user, tokens))
    }

    /// Exchange a valid refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated.
    pub fn refresh(&self, refresh_token: &str) -> AuthResult<IssuedToken> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        self.tokens.issue_access(claims.user_id)
    }

    /// Resolve an access token to the user id it was issued for
    pub fn authenticate(&self, access_token: &str) -> AuthResult<UserId> {
        Ok(self.tokens.verify_access(access_token)?.user_id)
    }

    /// Change the password of an authenticated user.
    ///
    /// Existing tokens stay valid until they expire.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - User was deleted
    /// * `AuthError::InvalidPassword` - `current_password` does not match
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: String,
        new_password: String,
    ) -> AuthResult<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.check_password(current_password, &user).await?;

        let password_hash = self.hasher.hash_blocking(new_password).await?;
        if !self.users.update_password(user_id, &password_hash).await? {
            return Err(AuthError::UserNotFound);
        }

        log::info!("Password changed for user {user_id}");
        Ok(())
    }

    async fn check_password(&self, plaintext: String, user: &User) -> AuthResult<()> {
        let matches = self
            .hasher
            .verify_blocking(plaintext, user.password_hash.clone())
            .await?;
        if matches {
            Ok(())
        } else {
            log::warn!("Password mismatch for user {}", user.id);
            Err(AuthError::InvalidPassword)
        }
    }
}
