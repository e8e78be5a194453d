//! Account endpoints: register, profile, update, delete.

use super::{
    AppState,
    errors::ApiError,
    extract::ValidatedJson,
    middleware::AuthUser,
    pipeline::Intent,
    rules::{validate_password_strength, validate_username},
};
use axum::extract::State;
use axum_extra::extract::SignedCookieJar;
use serde::Deserialize;
use task_keeper::{
    auth::RegisterRequest,
    users::{ProfileUpdate, UserProfile},
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterPayload {
    #[validate(
        length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
    #[validate(
        length(min = 8, max = 30, message = "Password must be between 8 and 30 characters"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
    #[serde(alias = "rePassword")]
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub re_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfilePayload {
    #[validate(
        length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
}

/// Create an account. Does not log the new user in.
///
/// # Errors
///
/// - `409 Conflict`: username or email already registered
/// - `422 Unprocessable Entity`: payload failed validation
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterPayload>,
) -> Result<Intent, ApiError> {
    let user = state
        .auth
        .register(RegisterRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Intent::created("User registered successfully").with_data(&UserProfile::from(user))
}

pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Intent, ApiError> {
    let profile = state.users.profile(user_id).await?;
    Intent::ok("User fetched successfully").with_data(&profile)
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(payload): ValidatedJson<UpdateProfilePayload>,
) -> Result<Intent, ApiError> {
    let profile = state
        .users
        .update_profile(
            user_id,
            ProfileUpdate {
                username: payload.username,
                email: payload.email,
            },
        )
        .await?;
    Intent::ok("User updated successfully").with_data(&profile)
}

/// Delete the caller's account and tasks, then end the session
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Intent), ApiError> {
    state.users.delete(user_id).await?;
    Ok((state.cookies.clear(jar), Intent::ok("User deleted successfully")))
}
