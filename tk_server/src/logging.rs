//! Structured logging configuration.
//!
//! Console output by default, JSON lines when `LOG_FORMAT=json`. Library
//! crates log through the `log` facade, which the subscriber bridges into
//! tracing.

use serde_json::Value;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const REDACTED: &str = "[REDACTED]";

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, defaulting to `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use tk_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init(false);
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    }

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Example
///
/// ```
/// use tk_server::logging::log_security_event;
///
/// log_security_event("invalid_password", None, "Password mismatch at login");
/// ```
pub fn log_security_event(event_type: &str, user_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}

/// Render a request body for the access log.
///
/// JSON bodies have every key containing `password` (any case, any depth)
/// replaced. Non-JSON bodies are summarized by size only.
pub fn redact_body(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(mut value) => {
            redact_value(&mut value);
            value.to_string()
        }
        Err(_) => format!("<{} bytes, not JSON>", body.len()),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if key.to_ascii_lowercase().contains("password") {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_security_event() {
        // Just ensure it doesn't panic
        log_security_event("token_expired", Some(1), "Access token has expired");
    }

    #[test]
    fn test_redacts_password_fields() {
        let body = br#"{"email_or_username":"alice","password":"Secret123","remember_me":true}"#;
        let logged = redact_body(body);
        assert!(!logged.contains("Secret123"));
        assert!(logged.contains("alice"));
        assert!(logged.contains("[REDACTED]"));
    }

    #[test]
    fn test_redacts_nested_and_camel_case() {
        let body = br#"{"currentPassword":"Old12345","payload":[{"new_password":"New12345"}]}"#;
        let logged = redact_body(body);
        assert!(!logged.contains("Old12345"));
        assert!(!logged.contains("New12345"));
    }

    #[test]
    fn test_non_json_body() {
        assert_eq!(redact_body(b"password=hunter2"), "<16 bytes, not JSON>");
        assert_eq!(redact_body(b""), "");
    }
}
