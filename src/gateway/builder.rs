//! Gateway builder
//!
//! Every collaborator has a default built from configuration; tests and
//! embedders swap in their own (adapter factory, stores, rate source,
//! notifier) before `build`.

use super::Gateway;
use crate::config::GatewayConfig;
use crate::core::budget::{BudgetGuard, BudgetNotifier, BudgetStore, LogNotifier};
use crate::core::cost::{CostRateCache, CostRateSource, StaticCostRates};
use crate::core::health::{HealthMonitor, HealthStore, HealthTracker, InMemoryHealthStore};
use crate::core::providers::{AdapterFactory, ProviderRegistry};
use crate::core::rate_limiter::RateLimiter;
use crate::core::router::{FailoverExecutor, RetryPolicy};
use crate::storage;
use crate::utils::error::Result;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Builder for [`Gateway`]
pub struct GatewayBuilder {
    config: GatewayConfig,
    factory: Option<AdapterFactory>,
    health_store: Option<Arc<dyn HealthStore>>,
    budget_store: Option<Arc<dyn BudgetStore>>,
    cost_source: Option<Arc<dyn CostRateSource>>,
    notifier: Option<Arc<dyn BudgetNotifier>>,
    retry_policy: Option<RetryPolicy>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            factory: None,
            health_store: None,
            budget_store: None,
            cost_source: None,
            notifier: None,
            retry_policy: None,
        }
    }

    /// Adapter constructors; defaults to the built-in vendor families
    pub fn with_factory(mut self, factory: AdapterFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_health_store(mut self, store: Arc<dyn HealthStore>) -> Self {
        self.health_store = Some(store);
        self
    }

    /// Budget store; defaults to the configured database or memory
    pub fn with_budget_store(mut self, store: Arc<dyn BudgetStore>) -> Self {
        self.budget_store = Some(store);
        self
    }

    /// Cost rate source; defaults to `cost_rates.rates` from configuration
    pub fn with_cost_source(mut self, source: Arc<dyn CostRateSource>) -> Self {
        self.cost_source = Some(source);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn BudgetNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Retry policy; defaults to `resilience.retry` and `resilience.timeouts`
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Validate configuration, register providers and wire the pipeline
    pub async fn build(self) -> Result<Gateway> {
        let config = self.config;
        config.validate_all()?;

        let budget_store = match self.budget_store {
            Some(store) => store,
            None => storage::budget_store(&config.storage).await?,
        };
        let cost_source = self
            .cost_source
            .unwrap_or_else(|| Arc::new(StaticCostRates::new(config.cost_rates.rates.clone())));
        let costs = CostRateCache::new(
            cost_source,
            Duration::from_secs(config.cost_rates.cache_ttl_secs),
        );
        let budget = BudgetGuard::new(
            budget_store,
            costs,
            self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            config.budget.clone(),
        );

        let factory = self.factory.unwrap_or_else(AdapterFactory::with_builtin);
        let registry = ProviderRegistry::initialize(&config.providers, &factory).await;
        if registry.is_empty() {
            warn!("No providers registered; every call will fail until a reload");
        }

        let tracker = HealthTracker::new(
            self.health_store
                .unwrap_or_else(|| Arc::new(InMemoryHealthStore::new())),
            &config.resilience.circuit_breaker,
        );
        tracker.sync(&registry.codes()).await;

        let policy = self.retry_policy.unwrap_or_else(|| {
            RetryPolicy::from_config(&config.resilience.retry, &config.resilience.timeouts)
        });
        let executor = FailoverExecutor::new(tracker.clone(), policy);
        let monitor = HealthMonitor::new(Duration::from_millis(
            config.resilience.timeouts.health_check_timeout_ms,
        ));

        let gateway = Gateway {
            registry: Arc::new(ArcSwap::from_pointee(registry)),
            factory,
            tracker,
            executor,
            budget,
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            monitor,
            shutdown: CancellationToken::new(),
            monitor_task: Mutex::new(None),
            cleanup_task: Mutex::new(None),
        };

        if config.rate_limit.enabled {
            gateway.start_rate_limit_cleanup();
        }
        if config.health_monitor.enabled {
            gateway.start_health_monitor(Duration::from_secs(config.health_monitor.interval_secs));
        }
        info!(
            providers = gateway.registry().len(),
            rate_limit = config.rate_limit.enabled,
            "Gateway ready"
        );
        Ok(gateway)
    }
}
