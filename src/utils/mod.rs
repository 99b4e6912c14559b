//! Utility modules for the gateway
//!
//! - **error**: crate-wide error type
//! - **logging**: tracing subscriber setup

pub mod error;
pub mod logging;

pub use error::{GatewayError, Result};
pub use logging::init_tracing;
