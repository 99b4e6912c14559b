//! Failover execution
//!
//! - `config` - retry policy
//! - `execution` - backoff and deadline primitives
//! - `fallback` - outcome and attempt log types
//! - `executor` - the failover loop
//! - `tests` - executor scenarios

pub mod config;
pub mod execution;
pub mod executor;
pub mod fallback;

pub use config::RetryPolicy;
pub use execution::calculate_retry_delay;
pub use executor::{FailoverExecutor, FailoverResult};
pub use fallback::{FailoverFailure, FailoverOutcome, ProviderAttempt};
