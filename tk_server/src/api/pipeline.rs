//! Response envelope and the terminal request stage.
//!
//! Handlers never build HTTP responses themselves. They return an [`Intent`]
//! (status plus [`Envelope`]) or an [`ApiError`], and [`terminal`], the
//! outermost middleware, is the only stage that finishes the response: it
//! stamps the request id, enforces the request timeout, records metrics and
//! writes the single access-log line for the request.

use super::{
    AppState,
    errors::{ApiError, FailureDetail},
    middleware::AuthUser,
};
use crate::{logging, metrics};
use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Largest request body the pipeline will buffer
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Overall request outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Success,
    Failed,
}

/// `error` is a single message or a list of field messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorField {
    Single(String),
    List(Vec<String>),
}

/// Uniform response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Outcome,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorField>,
}

/// Status and body a stage wants written; immutable once built
#[derive(Debug, Clone)]
#[must_use]
pub struct Intent {
    status: StatusCode,
    body: Envelope,
}

impl Intent {
    fn new(status: StatusCode, outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Envelope {
                status: outcome,
                message: message.into(),
                data: None,
                error: None,
            },
        }
    }

    /// 200 SUCCESS
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, Outcome::Success, message)
    }

    /// 201 SUCCESS
    pub fn created(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, Outcome::Success, message)
    }

    /// FAILED with the given status
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, Outcome::Failed, message)
    }

    /// Attach a serialized payload as `data`
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(data)
            .map_err(|e| ApiError::Internal(format!("Failed to serialize response: {e}")))?;
        self.body.data = Some(value);
        Ok(self)
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.body.error = Some(ErrorField::Single(error.into()));
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.body.error = Some(ErrorField::List(errors));
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Envelope {
        &self.body
    }
}

impl IntoResponse for Intent {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Request ID stored in request extensions
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

fn get_or_generate_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Terminal stage wrapping every route and the fallback.
pub async fn terminal(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = get_or_generate_request_id(request.headers());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let (mut parts, body) = request.into_parts();
    parts.extensions.insert(RequestId(request_id.clone()));

    let (mut response, logged_body) = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => {
            let logged_body = logging::redact_body(&bytes);
            let request = Request::from_parts(parts, Body::from(bytes));
            let response = match tokio::time::timeout(state.request_timeout, next.run(request))
                .await
            {
                Ok(response) => response,
                Err(_) => ApiError::Internal(format!(
                    "Request exceeded {}s timeout",
                    state.request_timeout.as_secs()
                ))
                .into_response(),
            };
            (response, logged_body)
        }
        Err(e) => (
            ApiError::validation(format!("Unreadable request body: {e}")).into_response(),
            String::new(),
        ),
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status();
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    let caller = response.extensions().get::<AuthUser>().map(|user| user.0);
    let failure = response.extensions().get::<FailureDetail>();

    if let Some(failure) = failure
        && let Some(auth) = failure.authentication
    {
        metrics::auth_failures_total(auth.reason());
        logging::log_security_event(auth.reason(), caller, &failure.detail);
    }

    let detail = failure.map(|f| f.detail.as_str()).unwrap_or_default();
    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            caller = ?caller,
            status = status.as_u16(),
            latency_ms = latency_ms,
            body = %logged_body,
            detail = %detail,
            "Request failed"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            caller = ?caller,
            status = status.as_u16(),
            latency_ms = latency_ms,
            body = %logged_body,
            detail = %detail,
            "Request rejected"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            caller = ?caller,
            status = status.as_u16(),
            latency_ms = latency_ms,
            body = %logged_body,
            "Request completed"
        );
    }

    metrics::http_requests_total(&method, &route, status.as_u16());
    metrics::http_request_duration_ms(&method, &route, latency_ms);

    response
}
