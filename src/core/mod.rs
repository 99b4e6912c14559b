//! Core functionality for the Gateway
//!
//! Provider adapters and registry, circuit breaking, failover, cost rates,
//! tenant rate limiting and budget governance.

pub mod budget;
pub mod cost;
pub mod health;
pub mod providers;
pub mod rate_limiter;
pub mod router;
