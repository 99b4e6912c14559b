//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured level when set.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed (tests, embedding
/// applications), which is not an error.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.level)));

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(true)
            .with_current_span(false)
            .try_init()
            .is_ok(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .try_init()
            .is_ok(),
    }
}

/// A bare level applies to this crate only, anything else passes through as a directive
fn filter_directive(level: &str) -> String {
    match level.to_ascii_lowercase().as_str() {
        l @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => {
            format!("provider_gateway={l},gateway={l},warn")
        }
        _ => level.to_string(),
    }
}
