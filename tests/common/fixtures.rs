//! Test fixtures: descriptors, configs, requests and ready-made gateways

use super::providers::Scripts;
use provider_gateway::config::{
    BudgetConfig, CircuitBreakerConfig, CostRateConfig, GatewayConfig, ProviderDescriptor,
};
use provider_gateway::core::budget::{BudgetStore, InMemoryBudgetStore};
use provider_gateway::core::cost::CostRate;
use provider_gateway::core::health::{HealthTracker, InMemoryHealthStore};
use provider_gateway::core::providers::{
    AdapterError, ChatMessage, GatewayRequest, ProviderRegistry,
};
use provider_gateway::core::router::{FailoverExecutor, RetryPolicy};
use provider_gateway::{Gateway, GatewayBuilder};
use std::sync::Arc;
use std::time::Duration;

pub const TENANT: &str = "tenant-acme";

/// primary, secondary and tertiary completion providers, in that order
pub fn three_providers() -> Vec<ProviderDescriptor> {
    ["primary", "secondary", "tertiary"]
        .iter()
        .map(|code| ProviderDescriptor::openai_compatible(*code, "sk-test"))
        .collect()
}

pub fn completion() -> GatewayRequest {
    GatewayRequest::completion(vec![ChatMessage::user("Summarize the ticket")])
}

pub fn message() -> GatewayRequest {
    GatewayRequest::message("+15550100", "Your order has shipped")
}

pub fn server_error() -> AdapterError {
    AdapterError::from_http_status(500, r#"{"error":{"message":"internal error"}}"#)
}

pub fn unauthorized() -> AdapterError {
    AdapterError::from_http_status(401, r#"{"error":{"message":"invalid api key"}}"#)
}

/// 100ms base backoff, three attempts per provider
pub fn policy() -> RetryPolicy {
    RetryPolicy::default().with_base_delay(Duration::from_millis(100))
}

pub fn tracker(config: &CircuitBreakerConfig) -> HealthTracker {
    HealthTracker::new(Arc::new(InMemoryHealthStore::new()), config)
}

/// Registry and executor over scripted adapters
pub async fn executor(
    descriptors: &[ProviderDescriptor],
    scripts: &Scripts,
    breaker: &CircuitBreakerConfig,
) -> (FailoverExecutor, ProviderRegistry) {
    let registry = ProviderRegistry::initialize(descriptors, &scripts.factory()).await;
    let tracker = tracker(breaker);
    tracker.sync(&registry.codes()).await;
    (FailoverExecutor::new(tracker, policy()), registry)
}

/// Rates of 1c per 1k input tokens and 2c per 1k output tokens on every
/// provider, so a scripted call (1000 in, 500 out) costs 2 cents
pub fn gateway_config(providers: Vec<ProviderDescriptor>) -> GatewayConfig {
    let rates = providers
        .iter()
        .map(|p| CostRate::per_1k_tokens(p.code.clone(), 1.0, 2.0))
        .collect();
    GatewayConfig {
        providers,
        budget: BudgetConfig {
            daily_budget_cents: 1_000.0,
            monthly_budget_cents: 20_000.0,
            hard_stop: true,
            ..Default::default()
        },
        cost_rates: CostRateConfig {
            rates,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Gateway over scripted adapters and a fresh in-memory budget store
pub async fn gateway_with_store(
    config: GatewayConfig,
    scripts: &Scripts,
    store: Arc<dyn BudgetStore>,
) -> Gateway {
    GatewayBuilder::new(config)
        .with_factory(scripts.factory())
        .with_budget_store(store)
        .with_retry_policy(policy())
        .build()
        .await
        .expect("gateway builds")
}

pub async fn gateway(providers: Vec<ProviderDescriptor>, scripts: &Scripts) -> Gateway {
    gateway_with_store(
        gateway_config(providers),
        scripts,
        Arc::new(InMemoryBudgetStore::new()),
    )
    .await
}
