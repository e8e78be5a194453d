//! Integration tests for the HTTP API.
//!
//! Drives the full router (terminal stage, cookie transport, token
//! validation, classifier) against the in-memory store.

use axum::body::Body;
use axum::http::{
    HeaderMap, Request, StatusCode,
    header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
};
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use task_keeper::auth::{IssuedToken, PasswordHasher, TokenIssuer, TokenKeys};
use task_keeper::db::MemoryStore;
use tk_server::api::{
    AppState, cookies::CookieTransport, create_router, middleware::AuthUser,
    pipeline::MAX_BODY_BYTES,
};
use tower::ServiceExt; // For `oneshot` method

const ACCESS_SECRET: &str = "http-test-access-secret-0123456789";
const REFRESH_SECRET: &str = "http-test-refresh-secret-012345678";
const COOKIE_SECRET: &str = "http-test-cookie-secret-0123456789";

fn issuer() -> TokenIssuer {
    TokenIssuer::new(TokenKeys::new(ACCESS_SECRET, REFRESH_SECRET).unwrap())
}

fn transport() -> CookieTransport {
    CookieTransport::new(COOKIE_SECRET, true)
}

/// Helper to create a router over a fresh in-memory store
fn create_test_server() -> axum::Router {
    let state = AppState::new(Arc::new(MemoryStore::new()), issuer(), transport())
        .with_hasher(PasswordHasher::with_params(1024, 1, 1).unwrap());
    create_router(state)
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn set_cookie(&self, name: &str) -> Option<String> {
        self.set_cookies()
            .into_iter()
            .find(|c| c.starts_with(&format!("{name}=")))
    }

    /// `Cookie` request header replaying every cookie this response set
    fn cookie_header(&self) -> String {
        cookie_header_from(&self.set_cookies())
    }
}

fn cookie_header_from(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .map(|c| c.split(';').next().unwrap().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    into_test_response(response).await
}

async fn into_test_response(response: Response) -> TestResponse {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Signed cookie header for a token minted outside the server
fn signed_cookie(token: &IssuedToken) -> String {
    let transport = transport();
    let jar = transport.set_access(transport.jar(&HeaderMap::new()), token);
    let response = jar.into_response();
    let set_cookies: Vec<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    cookie_header_from(&set_cookies)
}

async fn register(app: &axum::Router, username: &str) -> TestResponse {
    send(
        app,
        "POST",
        "/api/v1/user",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "Secret123",
            "re_password": "Secret123"
        })),
    )
    .await
}

async fn login(app: &axum::Router, identifier: &str, remember_me: bool) -> TestResponse {
    send(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({
            "email_or_username": identifier,
            "password": "Secret123",
            "remember_me": remember_me
        })),
    )
    .await
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_login_remember_me_sets_long_refresh_cookie() {
    let app = create_test_server();
    assert_eq!(register(&app, "alice").await.status, StatusCode::CREATED);

    let response = login(&app, "alice", true).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "SUCCESS");
    assert_eq!(response.body["data"]["user"]["username"], "alice");
    assert!(response.body["data"]["user"].get("password_hash").is_none());

    let refresh = response.set_cookie("refreshToken").unwrap();
    assert!(refresh.contains("Max-Age=604800"));
    assert!(refresh.contains("HttpOnly"));
    assert!(refresh.contains("SameSite=Strict"));

    let access = response.set_cookie("accessToken").unwrap();
    assert!(access.contains("Max-Age=900"));
}

#[tokio::test]
async fn test_login_default_refresh_tier() {
    let app = create_test_server();
    register(&app, "bob").await;

    let response = login(&app, "bob@example.com", false).await;
    assert_eq!(response.status, StatusCode::OK);
    let refresh = response.set_cookie("refreshToken").unwrap();
    assert!(refresh.contains("Max-Age=7200"));
}

#[tokio::test]
async fn test_login_failures() {
    let app = create_test_server();
    register(&app, "carol").await;

    let unknown = login(&app, "nobody", false).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["message"], "User not found");

    let wrong = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"emailOrUsername": "carol", "password": "Wrong1234"})),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["status"], "FAILED");
    assert_eq!(wrong.body["message"], "Invalid password");
    assert!(wrong.set_cookies().is_empty());
}

#[tokio::test]
async fn test_refresh_issues_new_access_cookie_only() {
    let app = create_test_server();
    register(&app, "dave").await;
    let session = login(&app, "dave", false).await;

    let response = send(
        &app,
        "GET",
        "/api/v1/auth/refresh",
        Some(&session.cookie_header()),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.set_cookie("accessToken").is_some());
    assert!(response.set_cookie("refreshToken").is_none());

    let check = send(
        &app,
        "GET",
        "/api/v1/auth/is-valid",
        Some(&response.cookie_header()),
        None,
    )
    .await;
    assert_eq!(check.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_with_expired_cookie() {
    let app = create_test_server();
    let stale = issuer()
        .issue_refresh_at(1, false, Utc::now() - Duration::hours(3))
        .unwrap();

    let response = send(
        &app,
        "GET",
        "/api/v1/auth/refresh",
        Some(&signed_cookie(&stale)),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["status"], "FAILED");
    assert_eq!(response.body["message"], "Refresh token has expired");
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let app = create_test_server();
    let response = send(&app, "GET", "/api/v1/auth/refresh", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Refresh token not found");
}

#[tokio::test]
async fn test_is_valid_failures() {
    let app = create_test_server();

    let missing = send(&app, "GET", "/api/v1/auth/is-valid", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["message"], "Access token not found");

    let tampered = send(
        &app,
        "GET",
        "/api/v1/auth/is-valid",
        Some("accessToken=forged.jwt.value"),
        None,
    )
    .await;
    assert_eq!(tampered.status, StatusCode::UNAUTHORIZED);
    assert_eq!(tampered.body["message"], "Access token is invalid");

    let expired = issuer()
        .issue_access_at(1, Utc::now() - Duration::minutes(16))
        .unwrap();
    let response = send(
        &app,
        "GET",
        "/api/v1/auth/is-valid",
        Some(&signed_cookie(&expired)),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Access token has expired");
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = create_test_server();

    for _ in 0..2 {
        let response = send(&app, "DELETE", "/api/v1/auth/logout", None, None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], "SUCCESS");

        let cookies = response.set_cookies();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }
}

#[tokio::test]
async fn test_logout_with_expired_access_cookie() {
    let app = create_test_server();
    let expired = issuer()
        .issue_access_at(1, Utc::now() - Duration::minutes(16))
        .unwrap();

    let response = send(
        &app,
        "DELETE",
        "/api/v1/auth/logout",
        Some(&signed_cookie(&expired)),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.set_cookie("accessToken").unwrap().contains("Max-Age=0"));
    assert!(response.set_cookie("refreshToken").unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_token_survives_logout() {
    let app = create_test_server();
    register(&app, "erin").await;
    let session = login(&app, "erin", false).await;

    let logout = send(
        &app,
        "DELETE",
        "/api/v1/auth/logout",
        Some(&session.cookie_header()),
        None,
    )
    .await;
    assert_eq!(logout.status, StatusCode::OK);

    // Stateless tokens stay valid until expiry
    let replay = send(
        &app,
        "GET",
        "/api/v1/auth/is-valid",
        Some(&session.cookie_header()),
        None,
    )
    .await;
    assert_eq!(replay.status, StatusCode::OK);
}

// ============================================================================
// Password changes
// ============================================================================

#[tokio::test]
async fn test_change_password_wrong_current() {
    let app = create_test_server();
    register(&app, "frank").await;
    let session = login(&app, "frank", false).await;

    let response = send(
        &app,
        "PUT",
        "/api/v1/auth/change-password",
        Some(&session.cookie_header()),
        Some(json!({"current_password": "Wrong1234", "new_password": "Another456"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid password");

    // Original password still works
    assert_eq!(login(&app, "frank", false).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_keeps_session() {
    let app = create_test_server();
    register(&app, "grace").await;
    let session = login(&app, "grace", false).await;
    let cookies = session.cookie_header();

    let response = send(
        &app,
        "PUT",
        "/api/v1/auth/change-password",
        Some(&cookies),
        Some(json!({"currentPassword": "Secret123", "newPassword": "Another456"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.set_cookies().is_empty());

    let check = send(&app, "GET", "/api/v1/auth/is-valid", Some(&cookies), None).await;
    assert_eq!(check.status, StatusCode::OK);

    let old = login(&app, "grace", false).await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_requires_session() {
    let app = create_test_server();
    let response = send(
        &app,
        "PUT",
        "/api/v1/auth/change-password",
        None,
        Some(json!({"current_password": "x", "new_password": "y"})),
    )
    .await;
    // Authentication is checked before the body
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Registration and validation
// ============================================================================

#[tokio::test]
async fn test_register_duplicate_username() {
    let app = create_test_server();
    assert_eq!(register(&app, "heidi").await.status, StatusCode::CREATED);

    let response = send(
        &app,
        "POST",
        "/api/v1/user",
        None,
        Some(json!({
            "username": "heidi",
            "email": "other@example.com",
            "password": "Secret123",
            "rePassword": "Secret123"
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["status"], "FAILED");
    assert!(response.body["message"].as_str().unwrap().contains("username"));
    assert_eq!(response.body["error"], "username");
}

#[tokio::test]
async fn test_validation_errors_are_aggregated() {
    let app = create_test_server();
    let response = send(
        &app,
        "POST",
        "/api/v1/user",
        None,
        Some(json!({
            "username": "x",
            "email": "not-an-email",
            "password": "weak",
            "re_password": "different"
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["message"], "Validation failed");
    assert!(response.body["error"].as_array().unwrap().len() >= 4);
}

#[tokio::test]
async fn test_malformed_json_is_validation_failure() {
    let app = create_test_server();
    let response = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"password": "Secret123"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["status"], "FAILED");
}

// ============================================================================
// Profile and tasks
// ============================================================================

#[tokio::test]
async fn test_profile_update_and_delete() {
    let app = create_test_server();
    register(&app, "ivan").await;
    register(&app, "judy").await;
    let session = login(&app, "ivan", false).await;
    let cookies = session.cookie_header();

    let profile = send(&app, "GET", "/api/v1/user", Some(&cookies), None).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["data"]["email"], "ivan@example.com");

    let conflict = send(
        &app,
        "PUT",
        "/api/v1/user",
        Some(&cookies),
        Some(json!({"username": "ivan", "email": "judy@example.com"})),
    )
    .await;
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    assert_eq!(conflict.body["error"], "email");

    let deleted = send(&app, "DELETE", "/api/v1/user", Some(&cookies), None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert!(
        deleted
            .set_cookies()
            .iter()
            .all(|c| c.contains("Max-Age=0"))
    );

    let gone = send(&app, "GET", "/api/v1/user", Some(&cookies), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_crud_is_scoped_to_caller() {
    let app = create_test_server();
    register(&app, "kim").await;
    register(&app, "leo").await;
    let kim = login(&app, "kim", false).await.cookie_header();
    let leo = login(&app, "leo", false).await.cookie_header();

    let empty = send(&app, "GET", "/api/v1/task", Some(&kim), None).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["data"], json!([]));

    let created = send(
        &app,
        "POST",
        "/api/v1/task",
        Some(&kim),
        Some(json!({"task": "Water plants", "details": "Balcony first"})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["finished"], false);
    let id = created.body["data"]["id"].as_i64().unwrap();

    let toggled = send(
        &app,
        "PUT",
        &format!("/api/v1/task/toggle-finished/{id}"),
        Some(&kim),
        None,
    )
    .await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["data"]["finished"], true);

    let foreign = send(&app, "GET", &format!("/api/v1/task/{id}"), Some(&leo), None).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    assert_eq!(foreign.body["message"], "Task not found");

    let deleted = send(&app, "DELETE", &format!("/api/v1/task/{id}"), Some(&kim), None).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let again = send(&app, "DELETE", &format!("/api/v1/task/{id}"), Some(&kim), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Pipeline
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server();
    let response = send(&app, "GET", "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "healthy");
    assert_eq!(response.body["data"]["store"], true);
}

#[tokio::test]
async fn test_unknown_route_is_classified() {
    let app = create_test_server();
    let response = send(&app, "GET", "/api/v1/nothing-here", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["status"], "FAILED");
    assert_eq!(response.body["message"], "Route not found");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");

    let generated = send(&app, "GET", "/health", None, None).await;
    assert!(generated.headers.contains_key("x-request-id"));
}

// ============================================================================
// Terminal stage
// ============================================================================

#[tokio::test]
async fn test_request_timeout_is_generic_internal_error() {
    // Production Argon2 parameters take far longer than 1ms to hash
    let state = AppState::new(Arc::new(MemoryStore::new()), issuer(), transport())
        .with_request_timeout(std::time::Duration::from_millis(1));
    let app = create_router(state);

    let response = register(&app, "slowpoke").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["status"], "FAILED");
    assert_eq!(response.body["message"], "Internal server error");
    assert!(response.body.get("error").is_none());
    assert!(response.body.get("data").is_none());
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = create_test_server();
    let oversized = "a".repeat(MAX_BODY_BYTES + 1);
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(oversized))
        .unwrap();

    let response = into_test_response(app.oneshot(request).await.unwrap()).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["status"], "FAILED");
    assert_eq!(response.body["message"], "Validation failed");
    assert!(response.body["error"].is_array());
}

#[tokio::test]
async fn test_body_at_limit_reaches_handler() {
    let app = create_test_server();
    register(&app, "alice").await;

    // Valid JSON padded with whitespace up to exactly the limit
    let payload = json!({
        "email_or_username": "alice",
        "password": "Secret123"
    })
    .to_string();
    let padded = format!("{payload}{}", " ".repeat(MAX_BODY_BYTES - payload.len()));
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(padded))
        .unwrap();

    let response = into_test_response(app.oneshot(request).await.unwrap()).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_response_identifies_caller() {
    let app = create_test_server();
    let registered = register(&app, "alice").await;
    let user_id = registered.body["data"]["id"].as_i64().unwrap();
    let session = login(&app, "alice", false).await;

    let request = Request::builder()
        .uri("/api/v1/auth/is-valid")
        .header(COOKIE, session.cookie_header())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.extensions().get::<AuthUser>(), Some(&AuthUser(user_id)));

    let anonymous = Request::builder()
        .uri("/api/v1/auth/is-valid")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(anonymous).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.extensions().get::<AuthUser>().is_none());
}
