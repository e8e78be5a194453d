//! Session endpoints: login, refresh, change-password, logout, is-valid.
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:3001/api/v1/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email_or_username": "alice", "password": "Secret123", "remember_me": true}'
//! ```

use super::{
    AppState,
    errors::ApiError,
    extract::ValidatedJson,
    middleware::AuthUser,
    pipeline::Intent,
    rules::{validate_identifier, validate_password_strength},
};
use crate::metrics;
use axum::{extract::State, http::HeaderMap};
use axum_extra::extract::SignedCookieJar;
use serde::{Deserialize, Serialize};
use task_keeper::{
    auth::{LoginRequest, TokenKind},
    users::UserProfile,
};
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[serde(alias = "emailOrUsername")]
    #[validate(custom(function = "validate_identifier"))]
    pub email_or_username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default, alias = "rememberMe")]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_new_password_differs"))]
pub struct ChangePasswordPayload {
    #[serde(alias = "currentPassword")]
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    #[validate(
        length(min = 8, max = 30, message = "Password must be between 8 and 30 characters"),
        custom(function = "validate_password_strength")
    )]
    pub new_password: String,
}

fn validate_new_password_differs(payload: &ChangePasswordPayload) -> Result<(), ValidationError> {
    if payload.current_password == payload.new_password {
        return Err(ValidationError::new("password_unchanged")
            .with_message("New password must differ from the current password".into()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub user: UserProfile,
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionData {
    pub user_id: i64,
}

/// Verify credentials and set both session cookies.
///
/// # Errors
///
/// - `404 Not Found`: no user with that username or email
/// - `401 Unauthorized`: wrong password
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    ValidatedJson(payload): ValidatedJson<LoginPayload>,
) -> Result<(SignedCookieJar, Intent), ApiError> {
    let request = LoginRequest {
        email_or_username: payload.email_or_username,
        password: payload.password,
        remember_me: payload.remember_me,
    };

    let (user, tokens) = match state.auth.login(request).await {
        Ok(session) => session,
        Err(e) => {
            metrics::login_attempts_total(false);
            return Err(e.into());
        }
    };
    metrics::login_attempts_total(true);
    metrics::tokens_issued_total(TokenKind::Access);
    metrics::tokens_issued_total(TokenKind::Refresh);

    let jar = state.cookies.set_session(jar, &tokens);
    let intent = Intent::ok("Logged in successfully").with_data(&LoginData {
        user: user.into(),
        remember_me: payload.remember_me,
    })?;
    Ok((jar, intent))
}

/// Exchange the refresh cookie for a new access cookie.
///
/// The refresh cookie is left as it is.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Intent), ApiError> {
    let refresh_token = state.cookies.read_token(&headers, TokenKind::Refresh)?;
    let access = state.auth.refresh(&refresh_token)?;
    metrics::tokens_issued_total(TokenKind::Access);

    let jar = state.cookies.set_access(jar, &access);
    Ok((jar, Intent::ok("Access token refreshed")))
}

/// Change the caller's password after checking the current one.
///
/// The current session stays valid.
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordPayload>,
) -> Result<Intent, ApiError> {
    state
        .auth
        .change_password(user_id, payload.current_password, payload.new_password)
        .await?;

    Ok(Intent::ok("Password changed successfully"))
}

/// Clear both session cookies.
///
/// Succeeds with or without an active session; tokens are not revoked.
pub async fn logout(State(state): State<AppState>, jar: SignedCookieJar) -> (SignedCookieJar, Intent) {
    (state.cookies.clear(jar), Intent::ok("Logged out successfully"))
}

/// Report whether the access cookie is valid; reaching the handler means it is
pub async fn is_valid(AuthUser(user_id): AuthUser) -> Result<Intent, ApiError> {
    Intent::ok("Access token is valid").with_data(&SessionData { user_id })
}
