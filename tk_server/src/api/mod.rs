//! HTTP API for the task tracker.
//!
//! # Modules
//!
//! - [`auth`]: Login, refresh, change-password, logout, is-valid
//! - [`users`]: Registration and profile management
//! - [`tasks`]: Per-user task CRUD
//! - [`cookies`]: Signed session-cookie transport
//! - [`middleware`]: Access-token validation for protected endpoints
//! - [`errors`]: Failure taxonomy and classifier
//! - [`pipeline`]: Response envelope and terminal logging stage
//!
//! # Endpoints
//!
//! ```text
//! GET    /health                               public
//! POST   /api/v1/auth/login                    public
//! GET    /api/v1/auth/refresh                  refresh cookie
//! PUT    /api/v1/auth/change-password          access cookie
//! DELETE /api/v1/auth/logout                   public, always succeeds
//! GET    /api/v1/auth/is-valid                 access cookie
//! POST   /api/v1/user                          public
//! GET    /api/v1/user                          access cookie
//! PUT    /api/v1/user                          access cookie
//! DELETE /api/v1/user                          access cookie
//! POST   /api/v1/task                          access cookie
//! GET    /api/v1/task                          access cookie
//! GET    /api/v1/task/{id}                     access cookie
//! PUT    /api/v1/task/toggle-finished/{id}     access cookie
//! DELETE /api/v1/task/{id}                     access cookie
//! ```
//!
//! Logout clears the access and refresh cookies the caller holds but does not
//! require a valid access token: without a session, or after the access token
//! has expired, it still answers 200 with removal cookies. Issued tokens are
//! not revoked, they stay valid until their `exp`.
//!
//! Every response body is an [`pipeline::Envelope`]:
//! `{"status": "SUCCESS"|"FAILED", "message": ..., "data"?: ..., "error"?: ...}`.

pub mod auth;
pub mod cookies;
pub mod errors;
pub mod extract;
pub mod middleware;
pub mod pipeline;
pub mod rules;
pub mod tasks;
pub mod users;

use axum::{
    Router,
    extract::{FromRef, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::Key;
use cookies::CookieTransport;
use errors::ApiError;
use pipeline::Intent;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use task_keeper::{
    auth::{AuthManager, PasswordHasher, TokenIssuer},
    db::{TaskRepository, UserRepository},
    tasks::TaskManager,
    users::UserManager,
};
use tower_http::cors::CorsLayer;

/// Default upper bound on a single request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all HTTP handlers.
///
/// Built once at startup; cloning is cheap (everything is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthManager,
    pub users: UserManager,
    pub tasks: TaskManager,
    pub cookies: Arc<CookieTransport>,
    pub store: Arc<dyn UserRepository>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wire the services over one store
    pub fn new<S>(store: Arc<S>, tokens: TokenIssuer, cookies: CookieTransport) -> Self
    where
        S: UserRepository + TaskRepository + 'static,
    {
        Self {
            auth: AuthManager::new(store.clone(), tokens),
            users: UserManager::new(store.clone()),
            tasks: TaskManager::new(store.clone()),
            cookies: Arc::new(cookies),
            store,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.auth = self.auth.with_hasher(hasher);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookies.key().clone()
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use tk_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router(state.clone()))
        .fallback(route_not_found)
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            pipeline::terminal,
        ))
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    // Public routes (no authentication middleware)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", get(auth::refresh))
        // Idempotent: succeeds with or without a session
        .route("/auth/logout", delete(auth::logout))
        .route("/user", post(users::register));

    // Protected routes (access cookie required)
    let protected_routes = Router::new()
        .route("/auth/change-password", put(auth::change_password))
        .route("/auth/is-valid", get(auth::is_valid))
        .route(
            "/user",
            get(users::profile)
                .put(users::update_profile)
                .delete(users::delete_account),
        )
        .route("/task", post(tasks::create_task).get(tasks::list_tasks))
        .route("/task/{id}", get(tasks::get_task).delete(tasks::delete_task))
        .route("/task/toggle-finished/{id}", put(tasks::toggle_finished))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check for monitoring and load balancers.
///
/// `200` when the store answers, `503` otherwise.
async fn health_check(State(state): State<AppState>) -> Result<Intent, ApiError> {
    let store_healthy = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Health check failed: {e}");
            false
        }
    };

    let intent = if store_healthy {
        Intent::ok("healthy")
    } else {
        Intent::failure(StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };
    intent.with_data(&json!({
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
