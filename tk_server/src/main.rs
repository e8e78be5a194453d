//! Task tracker API server.
//!
//! Loads configuration from the environment (and `.env`), connects the
//! selected store and serves the HTTP API until Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use task_keeper::{
    auth::{TokenIssuer, TokenKeys},
    db::{Database, MemoryStore},
};
use tk_server::{
    api::{self, AppState, cookies::CookieTransport},
    config::{CliOverrides, ServerConfig, StorageConfig},
    logging, metrics,
};
use tracing::info;

const HELP: &str = "\
Run the task tracker API server

USAGE:
  tk_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3001]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep all data in process memory (no database)
  -h, --help               Print help information

ENVIRONMENT:
  JWT_ACCESS_KEY           Access token signing secret (required, >= 32 chars)
  JWT_REFRESH_KEY          Refresh token signing secret (required, >= 32 chars)
  COOKIE_SECRET            Cookie signing secret (required, >= 32 chars)
  APP_ENV                  production (default) sets Secure cookies
  STORAGE_BACKEND          postgres (default) or memory
  METRICS_BIND             Prometheus listener address, disabled if unset
  LOG_FORMAT               json for JSON log lines
  (See .env.example for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        memory: pargs.contains("--memory"),
        bind: pargs
            .opt_value_from_str::<_, SocketAddr>("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
    };

    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    logging::init(json_logs);

    let config = ServerConfig::from_env(overrides)?;
    info!("Starting task tracker server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported on {addr}");
    }

    let keys = TokenKeys::new(
        &config.security.jwt_access_key,
        &config.security.jwt_refresh_key,
    )?;
    let tokens = TokenIssuer::new(keys);
    let cookies = CookieTransport::new(
        &config.security.cookie_secret,
        config.security.secure_cookies,
    );
    if !config.security.secure_cookies {
        tracing::warn!("Session cookies are not marked Secure (APP_ENV is not production)");
    }

    let mut database = None;
    let state = match &config.storage {
        StorageConfig::Postgres(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected and migrated");

            let state = AppState::new(Arc::new(db.store()), tokens, cookies);
            database = Some(db);
            state
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            AppState::new(Arc::new(MemoryStore::new()), tokens, cookies)
        }
    }
    .with_request_timeout(config.request_timeout);

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
