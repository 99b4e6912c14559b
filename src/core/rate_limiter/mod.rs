//! Tenant request rate limiting

mod limiter;
mod types;

pub use limiter::RateLimiter;
pub use types::RateLimitResult;
