//! Root gateway configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Everything the gateway reads at startup
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GatewayConfig {
    /// Provider descriptors in configured order
    #[serde(default)]
    pub providers: Vec<ProviderDescriptor>,
    #[serde(default)]
    pub resilience: ResilienceConfig,
    #[serde(default)]
    pub health_monitor: HealthMonitorConfig,
    /// Defaults for new tenant counters
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cost_rates: CostRateConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Descriptors that take part in registration
    pub fn active_providers(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.iter().filter(|p| p.is_active)
    }

    pub fn provider(&self, code: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.code == code)
    }
}
