//! Provider health: circuit breaking and background probing
//!
//! # Module Structure
//!
//! - `types` - Circuit state and per-provider health state
//! - `store` - Health state store trait and the in-memory implementation
//! - `tracker` - Circuit breaker transitions
//! - `monitor` - Periodic health checks
//! - `tests` - Test suite for the breaker

pub mod monitor;
pub mod store;
pub mod tracker;
pub mod types;

pub use monitor::HealthMonitor;
pub use store::{CasOutcome, HealthStore, InMemoryHealthStore};
pub use tracker::HealthTracker;
pub use types::{CircuitState, Eligibility, ProviderHealthSnapshot, ProviderHealthState};
