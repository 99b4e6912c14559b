//! Rate limiter types and data structures

use serde::Serialize;
use std::collections::VecDeque;
use tokio::time::Instant;

/// Rate limit result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Current request count in the window
    pub current_count: u32,
    /// Maximum requests allowed
    pub limit: u32,
    /// Remaining requests in the window
    pub remaining: u32,
    /// Time until the oldest request leaves the window (in seconds)
    pub reset_after_secs: u64,
    /// Retry after (in seconds, only set when not allowed)
    pub retry_after_secs: Option<u64>,
}

impl RateLimitResult {
    pub(super) fn unlimited(limit: u32) -> Self {
        Self {
            allowed: true,
            current_count: 0,
            limit,
            remaining: limit,
            reset_after_secs: 0,
            retry_after_secs: None,
        }
    }
}

/// Request timestamps inside the current window, oldest first
#[derive(Debug, Clone, Default)]
pub(super) struct RateLimitEntry {
    pub(super) timestamps: VecDeque<Instant>,
}
