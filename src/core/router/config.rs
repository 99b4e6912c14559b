//! Retry policy for the failover executor

use crate::config::{ProviderDescriptor, RetryConfig, TimeoutConfig};
use std::time::Duration;

/// Retry and deadline settings
///
/// ## Defaults
///
/// - `max_retries`: 3 attempts per provider
/// - `base_delay`: 1s, doubling per attempt
/// - `max_delay`: 30s
/// - `jitter`: off
/// - `request_timeout`: 60s per attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per provider (not additional retries)
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default(), &TimeoutConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(retry: &RetryConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            max_retries: retry.max_retries.max(1),
            base_delay: Duration::from_millis(retry.base_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            jitter: retry.jitter,
            request_timeout: Duration::from_millis(timeouts.request_timeout_ms),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Attempts allowed against this provider
    pub fn attempts_for(&self, descriptor: &ProviderDescriptor) -> u32 {
        descriptor
            .max_retries
            .unwrap_or(self.max_retries)
            .max(1)
    }

    /// Deadline for one attempt against this provider
    pub fn timeout_for(&self, descriptor: &ProviderDescriptor) -> Duration {
        descriptor
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.request_timeout)
    }
}
