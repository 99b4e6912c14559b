//! The uniform contract every vendor adapter implements

use super::error::{AdapterError, ConfigurationError};
use super::types::{GatewayRequest, HealthCheckReport, ProviderResponse};
use crate::config::{ProviderDescriptor, ProviderKind};
use async_trait::async_trait;
use std::fmt::Debug;

/// Outcome of one adapter call
pub type NormalizedResult = Result<ProviderResponse, AdapterError>;

/// A vendor adapter
///
/// Adapters never panic or raise for expected vendor failures; every failure is
/// an [`AdapterError`] with its retryability already decided.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug {
    /// Provider code this adapter was built for
    fn code(&self) -> &str;

    /// Vendor family
    fn kind(&self) -> ProviderKind;

    /// Validate settings and prepare clients
    ///
    /// Called once by the registry before the adapter becomes reachable.
    async fn initialize(&mut self, descriptor: &ProviderDescriptor)
    -> Result<(), ConfigurationError>;

    /// Perform one vendor call
    async fn execute(&self, request: &GatewayRequest) -> NormalizedResult;

    /// Probe the vendor
    async fn health_check(&self) -> HealthCheckReport;

    /// Adapter-local view of health (initialized and last probe succeeded)
    fn is_healthy(&self) -> bool;
}
