//! Token validation for protected endpoints.
//!
//! [`require_auth`] reads the signed `accessToken` cookie, verifies the JWT
//! against the access secret and stores the caller's id as an [`AuthUser`]
//! extension. Failures short-circuit with a 401 before any handler or body
//! extractor runs.
//!
//! # Extracting the caller
//!
//! ```rust,no_run
//! use tk_server::api::middleware::AuthUser;
//!
//! async fn protected_handler(AuthUser(user_id): AuthUser) -> String {
//!     format!("Authenticated as user {}", user_id)
//! }
//! # let _ = protected_handler;
//! ```

use super::{AppState, errors::ApiError};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use task_keeper::auth::{TokenKind, UserId};

/// Authenticated caller, present on requests that passed [`require_auth`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// Authentication middleware that validates the access cookie.
///
/// On success the caller id is placed in the request extensions for the
/// handler and in the response extensions for the access log.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match state
        .cookies
        .read_token(request.headers(), TokenKind::Access)
        .and_then(|token| state.auth.authenticate(&token))
    {
        Ok(user_id) => user_id,
        Err(e) => return ApiError::from(e).into_response(),
    };

    request.extensions_mut().insert(AuthUser(user_id));
    let mut response = next.run(request).await;
    response.extensions_mut().insert(AuthUser(user_id));
    response
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| ApiError::missing_token(TokenKind::Access))
    }
}
