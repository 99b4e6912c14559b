//! Budget, rate limit and cost rate configuration

use super::*;
use crate::core::cost::CostRate;
use serde::{Deserialize, Serialize};

/// System defaults applied to a tenant counter when it is first created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetConfig {
    /// Daily spend ceiling in cents (0 = not enforced)
    #[serde(default = "default_daily_budget_cents")]
    pub daily_budget_cents: f64,
    /// Monthly spend ceiling in cents (0 = not enforced)
    #[serde(default = "default_monthly_budget_cents")]
    pub monthly_budget_cents: f64,
    /// Requests allowed per day (0 = not enforced)
    #[serde(default = "default_daily_request_limit")]
    pub daily_request_limit: u64,
    /// Deny calls over a limit instead of only warning
    #[serde(default)]
    pub hard_stop: bool,
    #[serde(default = "default_warning_threshold_percent")]
    pub warning_threshold_percent: f64,
    /// Minimum spacing between notifications of the same kind
    #[serde(default = "default_notification_interval_secs")]
    pub notification_interval_secs: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_budget_cents: default_daily_budget_cents(),
            monthly_budget_cents: default_monthly_budget_cents(),
            daily_request_limit: default_daily_request_limit(),
            hard_stop: false,
            warning_threshold_percent: default_warning_threshold_percent(),
            notification_interval_secs: default_notification_interval_secs(),
        }
    }
}

/// Per-tenant request rate limiting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

/// Cost rate table and cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostRateConfig {
    /// How long a loaded rate stays cached
    #[serde(default = "default_cost_rate_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub rates: Vec<CostRate>,
}

impl Default for CostRateConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cost_rate_ttl_secs(),
            rates: Vec::new(),
        }
    }
}
