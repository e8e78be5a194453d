//! Authentication error types.

use super::models::TokenKind;
use crate::db::StoreError;
use thiserror::Error;

/// Why a presented token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("not found")]
    Missing,

    #[error("has expired")]
    Expired,

    /// Bad signature, wrong key, malformed token or tampered cookie
    #[error("is invalid")]
    Invalid,

    #[error("is not yet valid")]
    NotYetValid,
}

impl TokenError {
    /// Stable label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Missing => "token_missing",
            TokenError::Expired => "token_expired",
            TokenError::Invalid => "token_invalid",
            TokenError::NotYetValid => "token_not_yet_valid",
        }
    }
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token rejected, e.g. "Refresh token has expired"
    #[error("{kind} token {error}")]
    Token { kind: TokenKind, error: TokenError },

    /// Password verification failed
    #[error("Invalid password")]
    InvalidPassword,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Refusing to hash an empty password
    #[error("Password must not be empty")]
    EmptyPassword,

    /// Stored digest could not be parsed
    #[error("Malformed password hash")]
    MalformedHash,

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// JWT signing failed
    #[error("Token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Secret keys unusable (empty or shared between token kinds)
    #[error("Invalid key configuration: {0}")]
    KeyConfiguration(String),

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn token(kind: TokenKind, error: TokenError) -> Self {
        AuthError::Token { kind, error }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
