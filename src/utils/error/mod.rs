//! Error handling
//!
//! Crate-wide error type and result alias. Domain failures that are returned
//! as values (adapter errors, failover outcomes, budget denials) live next to
//! the components that produce them.

mod types;

pub use types::{GatewayError, Result};
