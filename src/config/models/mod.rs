//! Configuration data models
//!
//! This module defines all configuration structures used throughout the gateway.

pub mod budget;
pub mod gateway;
pub mod logging;
pub mod provider;
pub mod resilience;
pub mod storage;

pub use budget::*;
pub use gateway::*;
pub use logging::*;
pub use provider::*;
pub use resilience::*;
pub use storage::*;

pub fn default_true() -> bool {
    true
}

/// Default maximum retry attempts per provider
pub fn default_max_retries() -> u32 {
    3
}

/// Default base backoff delay in milliseconds
pub fn default_base_delay_ms() -> u64 {
    1_000
}

pub fn default_max_delay_ms() -> u64 {
    30_000
}

/// Default consecutive failures before a circuit opens
pub fn default_failure_threshold() -> u32 {
    3
}

/// Default circuit recovery window in milliseconds
pub fn default_recovery_window_ms() -> u64 {
    60_000
}

/// Default deadline for completion/send calls
pub fn default_request_timeout_ms() -> u64 {
    60_000
}

/// Default deadline for health checks
pub fn default_health_check_timeout_ms() -> u64 {
    10_000
}

pub fn default_health_check_interval_secs() -> u64 {
    30
}

pub fn default_daily_budget_cents() -> f64 {
    10_000.0
}

pub fn default_monthly_budget_cents() -> f64 {
    200_000.0
}

pub fn default_daily_request_limit() -> u64 {
    10_000
}

pub fn default_warning_threshold_percent() -> f64 {
    80.0
}

/// Minimum spacing between two budget notifications of the same kind
pub fn default_notification_interval_secs() -> u64 {
    3_600
}

/// Cost rate cache TTL (5 minutes)
pub fn default_cost_rate_ttl_secs() -> u64 {
    300
}

pub fn default_requests_per_minute() -> u32 {
    600
}

pub fn default_database_url() -> String {
    "sqlite://data/gateway.db?mode=rwc".to_string()
}

pub fn default_max_connections() -> u32 {
    5
}

pub fn default_connection_timeout() -> u64 {
    5
}

pub fn default_log_level() -> String {
    "info".to_string()
}
