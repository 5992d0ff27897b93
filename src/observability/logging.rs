//! # Logging
//!
//! Tracing subscriber setup driven by `ControllerConfig`.
//!
//! `RUST_LOG` takes precedence. Without it the filter is built from
//! `LOG_LEVEL`, scoped to this crate.

use crate::config::ControllerConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default filter directive for a log level
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    let level = match log_level.to_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    };
    format!("vault_sync_controller={level},vault_sync={level}")
}

/// Install the global tracing subscriber
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &ControllerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let result = if config.log_format.eq_ignore_ascii_case("text") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(config.log_enable_color)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}"))
}
