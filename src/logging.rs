//! Tracing subscriber setup for the binary
//!
//! Logs go to stderr; stdout carries the accounts CSV.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "warn";

/// Pick the log filter: an explicit directive wins, then `RUST_LOG`, then `warn`
pub fn build_filter(directive: Option<&str>) -> Result<EnvFilter, String> {
    match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| format!("Invalid log filter '{}': {}", directive, e)),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Install the global subscriber
pub fn init(directive: Option<&str>) -> Result<(), String> {
    tracing_subscriber::registry()
        .with(build_filter(directive)?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| format!("Failed to initialise logging: {}", e))
}
