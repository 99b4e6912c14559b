//! Per-tenant sliding window rate limiter

use super::types::{RateLimitEntry, RateLimitResult};
use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Sliding window limiter keyed by tenant
///
/// Each key's check and record happen under that key's map entry, so two
/// concurrent requests cannot both take the last slot.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Arc<DashMap<String, RateLimitEntry>>,
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter with a one minute window
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_window(config, Duration::from_secs(60))
    }

    /// Create a rate limiter with custom window
    pub fn with_window(config: RateLimitConfig, window: Duration) -> Self {
        Self {
            config,
            entries: Arc::new(DashMap::new()),
            window,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Atomically check and record a request
    pub fn check_and_record(&self, key: &str) -> RateLimitResult {
        let limit = self.config.requests_per_minute;
        if !self.config.enabled {
            return RateLimitResult::unlimited(limit);
        }

        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_default();

        // Remove expired timestamps
        while entry
            .timestamps
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            entry.timestamps.pop_front();
        }

        let current_count = entry.timestamps.len() as u32;
        let allowed = current_count < limit;

        let reset_after_secs = match entry.timestamps.front() {
            Some(&oldest) => self
                .window
                .saturating_sub(now.duration_since(oldest))
                .as_secs(),
            None => self.window.as_secs(),
        };

        if allowed {
            entry.timestamps.push_back(now);
        } else {
            debug!(
                "Rate limit exceeded for {}: {}/{} requests",
                key, current_count, limit
            );
        }

        RateLimitResult {
            allowed,
            current_count,
            limit,
            remaining: if allowed {
                limit.saturating_sub(current_count + 1)
            } else {
                0
            },
            reset_after_secs,
            retry_after_secs: (!allowed).then_some(reset_after_secs.max(1)),
        }
    }

    /// Drop keys with no request inside the window
    pub fn cleanup(&self) {
        let now = Instant::now();
        let window = self.window;
        self.entries.retain(|_, entry| {
            entry
                .timestamps
                .back()
                .is_some_and(|&t| now.duration_since(t) < window)
        });
    }

    /// Periodically drop idle tenants until `shutdown` is cancelled
    pub fn start_cleanup(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Rate limiter cleanup stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let before = limiter.tracked_keys();
                        limiter.cleanup();
                        let dropped = before.saturating_sub(limiter.tracked_keys());
                        if dropped > 0 {
                            debug!(dropped = dropped, "Idle rate limit keys dropped");
                        }
                    }
                }
            }
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}
