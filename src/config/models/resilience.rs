//! Resilience configuration: circuit breaking, retries, deadlines, health monitoring

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resilience configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResilienceConfig {
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Time the circuit stays open before a half-open trial is allowed
    #[serde(default = "default_recovery_window_ms")]
    pub recovery_window_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_window_ms: default_recovery_window_ms(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn recovery_window(&self) -> Duration {
        Duration::from_millis(self.recovery_window_ms)
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Attempts per provider before moving on
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for any single backoff delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Add +/-10% jitter to delays
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
        }
    }
}

/// Outbound call deadlines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutConfig {
    /// Deadline for completion and send calls
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Deadline for health checks
    #[serde(default = "default_health_check_timeout_ms")]
    pub health_check_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            health_check_timeout_ms: default_health_check_timeout_ms(),
        }
    }
}

/// Background health monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthMonitorConfig {
    /// Run periodic health checks
    #[serde(default)]
    pub enabled: bool,
    /// Interval between sweeps
    #[serde(default = "default_health_check_interval_secs")]
    pub interval_secs: u64,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_health_check_interval_secs(),
        }
    }
}
