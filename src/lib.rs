//! # Provider Gateway
//!
//! A resilient gateway in front of external AI-completion and messaging
//! vendors.
//!
//! ## Features
//!
//! - **Uniform adapters**: every vendor is reached through one contract with
//!   normalized, retry-classified errors
//! - **Failover**: providers are tried in priority order with exponential
//!   backoff between retryable failures
//! - **Circuit breaking**: consistently failing providers are skipped until a
//!   recovery window passes, then trialled by exactly one request
//! - **Budget governance**: per-tenant daily and monthly spend limits with
//!   warnings, optional hard stop and an append-only usage ledger
//! - **Health monitoring**: optional periodic probing of every provider
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use provider_gateway::{ChatMessage, Gateway, GatewayConfig, GatewayRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_file("config/gateway.yaml").await?;
//!     let gateway = Gateway::from_config(config).await?;
//!
//!     let request = GatewayRequest::completion(vec![ChatMessage::user("Hello!")]);
//!     match gateway.call("tenant-a", &request, None).await {
//!         Ok(response) => println!("{} answered: {}", response.used_provider, response.payload),
//!         Err(e) => eprintln!("{} ({})", e, e.code()),
//!     }
//!
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod gateway;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::{GatewayConfig, ProviderDescriptor, ProviderKind};
pub use crate::core::budget::{BudgetCheck, BudgetGuard, TenantLimits, UsageRecord, UsageStatus};
pub use crate::core::providers::{
    AdapterError, AdapterErrorCode, AdapterFactory, ChatMessage, GatewayRequest, ProviderAdapter,
    ProviderRegistry,
};
pub use gateway::{AuditMeta, Gateway, GatewayBuilder, GatewayCallError, GatewayResponse};
pub use utils::error::{GatewayError, Result};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Gateway build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    /// Seconds since the epoch
    pub build_time: &'static str,
    pub git_hash: &'static str,
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: env!("BUILD_TIME"),
            git_hash: env!("GIT_HASH"),
            rust_version: env!("RUST_VERSION"),
        }
    }
}

/// Build
pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
