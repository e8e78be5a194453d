//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use task_keeper::db::DatabaseConfig;

const DEFAULT_BIND: &str = "127.0.0.1:3001";
const MIN_SECRET_LEN: usize = 32;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Where users and tasks live
    pub storage: StorageConfig,
    /// Secrets and cookie policy
    pub security: SecurityConfig,
    /// Upper bound on handling a single request
    pub request_timeout: Duration,
    /// Prometheus listener, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Storage backend selection
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Postgres(DatabaseConfig),
    Memory,
}

/// Security-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// Access token signing secret (required)
    pub jwt_access_key: String,
    /// Refresh token signing secret (required, distinct from the access key)
    pub jwt_refresh_key: String,
    /// Cookie signing secret (required)
    pub cookie_secret: String,
    /// Mark cookies `Secure`
    pub secure_cookies: bool,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_access_key", &"[REDACTED]")
            .field("jwt_refresh_key", &"[REDACTED]")
            .field("cookie_secret", &"[REDACTED]")
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values from CLI args, which win over the environment
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source
    pub fn from_lookup<F>(overrides: CliOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => {
                let raw = lookup("SERVER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{raw}' is not an IP:PORT address"),
                })?
            }
        };

        let backend = if overrides.memory {
            "memory".to_string()
        } else {
            lookup("STORAGE_BACKEND").unwrap_or_else(|| "postgres".to_string())
        };
        let storage = match backend.to_lowercase().as_str() {
            "memory" => StorageConfig::Memory,
            "postgres" => {
                let database_url = overrides
                    .database_url
                    .or_else(|| lookup("DATABASE_URL"))
                    .unwrap_or_else(|| DatabaseConfig::development().database_url);

                StorageConfig::Postgres(DatabaseConfig {
                    database_url,
                    max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 20),
                    min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", 2),
                    connection_timeout_secs: parse_or(&lookup, "DB_CONNECTION_TIMEOUT_SECS", 5),
                    idle_timeout_secs: parse_or(&lookup, "DB_IDLE_TIMEOUT_SECS", 300),
                    max_lifetime_secs: parse_or(&lookup, "DB_MAX_LIFETIME_SECS", 1800),
                })
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND".to_string(),
                    reason: format!("unknown backend '{other}', expected postgres or memory"),
                });
            }
        };

        // Security configuration (REQUIRED)
        let jwt_access_key = required_secret(&lookup, "JWT_ACCESS_KEY")?;
        let jwt_refresh_key = required_secret(&lookup, "JWT_REFRESH_KEY")?;
        let cookie_secret = required_secret(&lookup, "COOKIE_SECRET")?;

        if jwt_access_key == jwt_refresh_key {
            return Err(ConfigError::Invalid {
                var: "JWT_REFRESH_KEY".to_string(),
                reason: "Must differ from JWT_ACCESS_KEY".to_string(),
            });
        }

        let production = lookup("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(true);
        let secure_cookies = parse_or(&lookup, "COOKIE_SECURE", production);

        let request_timeout = Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30));

        let metrics_bind = match lookup("METRICS_BIND") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{raw}' is not an IP:PORT address"),
            })?),
            None => None,
        };

        Ok(ServerConfig {
            bind,
            storage,
            security: SecurityConfig {
                jwt_access_key,
                jwt_refresh_key,
                cookie_secret,
                secure_cookies,
            },
            request_timeout,
            metrics_bind,
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn required_secret<F>(lookup: &F, var: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var).ok_or_else(|| ConfigError::MissingRequired {
        var: var.to_string(),
        hint: "Generate with: openssl rand -hex 32".to_string(),
    })?;

    if value.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("Must be at least {MIN_SECRET_LEN} characters"),
        });
    }
    Ok(value)
}

/// Helper to parse a variable with default fallback
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
