//! Cost rate source and TTL cache

use super::calculator::{calculate_cost, select_rate};
use super::types::CostRate;
use crate::core::providers::UsageUnits;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Read-only origin of cost rates
#[async_trait]
pub trait CostRateSource: Send + Sync + Debug {
    /// Every row for a provider (default row and per-model rows)
    async fn load_rates(&self, provider: &str) -> Result<Vec<CostRate>>;
}

/// Rates fixed at startup from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticCostRates {
    by_provider: HashMap<String, Vec<CostRate>>,
}

impl StaticCostRates {
    pub fn new(rates: impl IntoIterator<Item = CostRate>) -> Self {
        let mut by_provider: HashMap<String, Vec<CostRate>> = HashMap::new();
        for rate in rates {
            by_provider.entry(rate.provider.clone()).or_default().push(rate);
        }
        Self { by_provider }
    }
}

#[async_trait]
impl CostRateSource for StaticCostRates {
    async fn load_rates(&self, provider: &str) -> Result<Vec<CostRate>> {
        Ok(self.by_provider.get(provider).cloned().unwrap_or_default())
    }
}

/// TTL cache in front of a [`CostRateSource`]
#[derive(Debug, Clone)]
pub struct CostRateCache {
    source: Arc<dyn CostRateSource>,
    cache: Cache<String, Arc<Vec<CostRate>>>,
}

impl CostRateCache {
    pub fn new(source: Arc<dyn CostRateSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// All rows for a provider, loading through the source on a miss
    pub async fn rates(&self, provider: &str) -> Result<Arc<Vec<CostRate>>> {
        let source = self.source.clone();
        let key = provider.to_string();
        self.cache
            .try_get_with(key.clone(), async move {
                let rates = source.load_rates(&key).await?;
                debug!(provider = %key, rows = rates.len(), "Cost rates loaded");
                Ok::<_, GatewayError>(Arc::new(rates))
            })
            .await
            .map_err(|e| GatewayError::CostRate(format!("Failed to load rates for {}: {}", provider, e)))
    }

    /// Best matching rate for a provider and model/channel
    pub async fn rate_for(&self, provider: &str, key: Option<&str>) -> Result<Option<CostRate>> {
        let rates = self.rates(provider).await?;
        Ok(select_rate(&rates, key).cloned())
    }

    /// Cost in cents; a provider without rates costs 0
    pub async fn cost_for(
        &self,
        provider: &str,
        key: Option<&str>,
        units: &UsageUnits,
    ) -> Result<f64> {
        let rate = self.rate_for(provider, key).await?;
        if rate.is_none() {
            debug!(provider = provider, model = key.unwrap_or("-"), "No cost rate, cost is 0");
        }
        Ok(calculate_cost(rate.as_ref(), units))
    }

    pub async fn invalidate(&self, provider: &str) {
        self.cache.invalidate(provider).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}
