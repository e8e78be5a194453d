//! HTTP service for the task tracker: cookie-based sessions, the response
//! pipeline, configuration, logging and metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
