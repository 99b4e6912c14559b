//! Custom assertions

use provider_gateway::core::budget::BudgetStore;
use provider_gateway::UsageStatus;

/// Float equality within a cent fraction
pub fn assert_cents(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {} cents, got {}",
        expected,
        actual
    );
}

/// Statuses of a tenant's usage records, oldest first
pub async fn usage_statuses(store: &dyn BudgetStore, tenant: &str) -> Vec<UsageStatus> {
    store
        .usage_records(tenant)
        .await
        .expect("usage records")
        .into_iter()
        .map(|r| r.status)
        .collect()
}
