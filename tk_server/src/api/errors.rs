//! Error taxonomy and classifier.
//!
//! Every failure a handler or middleware can produce is converted into one
//! of the [`ApiError`] variants by an exhaustive `From` impl. [`classify`]
//! is the single place that chooses a status code and client message for a
//! failure. Internal detail never reaches the response body; it rides along
//! in a [`FailureDetail`] response extension for the access log.

use super::pipeline::Intent;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use task_keeper::{
    auth::{AuthError, TokenError, TokenKind},
    db::StoreError,
    tasks::TaskError,
    users::UserError,
};

/// Why a caller could not be authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationError {
    Token { kind: TokenKind, error: TokenError },
    InvalidPassword,
}

impl AuthenticationError {
    /// Stable label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            AuthenticationError::Token { error, .. } => error.reason(),
            AuthenticationError::InvalidPassword => "invalid_password",
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthenticationError::Token { kind, error } => write!(f, "{kind} token {error}"),
            AuthenticationError::InvalidPassword => f.write_str("Invalid password"),
        }
    }
}

/// Closed set of request failures
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Authentication(AuthenticationError),

    /// Aggregated field messages
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Unique field already taken
    #[error("Duplicate {field}")]
    Conflict { field: String },

    #[error("{0}")]
    NotFound(String),

    /// Detail for the server log only
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(vec![message.into()])
    }

    pub fn missing_token(kind: TokenKind) -> Self {
        ApiError::Authentication(AuthenticationError::Token {
            kind,
            error: TokenError::Missing,
        })
    }
}

/// Failure metadata attached to error responses for the terminal stage
#[derive(Debug, Clone)]
pub struct FailureDetail {
    /// `token_expired`, `conflict`, `internal`, ...
    pub reason: &'static str,
    /// Set only for authentication failures
    pub authentication: Option<AuthenticationError>,
    /// Full description, never sent to the client
    pub detail: String,
}

/// Map a failure to the status and body the client sees
pub fn classify(error: &ApiError) -> Intent {
    match error {
        ApiError::Authentication(auth) => {
            Intent::failure(StatusCode::UNAUTHORIZED, auth.to_string())
        }
        ApiError::Validation(messages) => {
            Intent::failure(StatusCode::UNPROCESSABLE_ENTITY, "Validation failed")
                .with_errors(messages.clone())
        }
        ApiError::Conflict { field } => Intent::failure(
            StatusCode::CONFLICT,
            format!("A user with this {field} already exists"),
        )
        .with_error(field.clone()),
        ApiError::NotFound(message) => Intent::failure(StatusCode::NOT_FOUND, message.clone()),
        ApiError::Internal(_) => Intent::failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
        ),
    }
}

fn reason(error: &ApiError) -> &'static str {
    match error {
        ApiError::Authentication(auth) => auth.reason(),
        ApiError::Validation(_) => "validation",
        ApiError::Conflict { .. } => "conflict",
        ApiError::NotFound(_) => "not_found",
        ApiError::Internal(_) => "internal",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let authentication = match &self {
            ApiError::Authentication(auth) => Some(*auth),
            _ => None,
        };
        let detail = FailureDetail {
            reason: reason(&self),
            authentication,
            detail: self.to_string(),
        };
        let mut response = classify(&self).into_response();
        response.extensions_mut().insert(detail);
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Token { kind, error } => {
                ApiError::Authentication(AuthenticationError::Token { kind, error })
            }
            AuthError::InvalidPassword => {
                ApiError::Authentication(AuthenticationError::InvalidPassword)
            }
            AuthError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AuthError::EmptyPassword => ApiError::validation("Password must not be empty"),
            AuthError::Store(store) => store.into(),
            e @ (AuthError::MalformedHash
            | AuthError::HashingFailed
            | AuthError::Signing(_)
            | AuthError::KeyConfiguration(_)) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { field } => ApiError::Conflict { field },
            e @ (StoreError::Timeout(_) | StoreError::Database(_)) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(error: TaskError) -> Self {
        match error {
            TaskError::NotFound(_) => ApiError::NotFound("Task not found".to_string()),
            TaskError::Store(store) => store.into(),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::NotFound(_) => ApiError::NotFound("User not found".to_string()),
            UserError::Store(store) => store.into(),
        }
    }
}
