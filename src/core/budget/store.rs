//! Budget counter and usage record storage
//!
//! Counter writes are either atomic increments or conditional updates keyed on
//! a previously observed value, so concurrent requests never lose an update
//! and a window is reset at most once per boundary.

use super::types::{BudgetCounter, CounterDelta, NotificationKind, TenantLimits, UsageRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt::Debug;

#[async_trait]
pub trait BudgetStore: Send + Sync + Debug {
    /// Current counter, created from `template` on first access
    async fn load_or_create(&self, tenant_id: &str, template: &BudgetCounter)
    -> Result<BudgetCounter>;

    /// Zero the daily fields iff `daily_reset_at` still equals `expected`.
    /// Returns whether this call performed the reset.
    async fn reset_daily(
        &self,
        tenant_id: &str,
        expected: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Zero the monthly fields and notification stamps iff `monthly_reset_at`
    /// still equals `expected`
    async fn reset_monthly(
        &self,
        tenant_id: &str,
        expected: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    async fn persist_usage_record(&self, record: &UsageRecord) -> Result<()>;

    /// Add `delta` to the tenant's counters in one atomic step
    async fn persist_counter_increment(&self, tenant_id: &str, delta: CounterDelta) -> Result<()>;

    /// Stamp the notification time iff the previous one is older than
    /// `min_interval`. Returns whether the caller won the claim.
    async fn claim_notification(
        &self,
        tenant_id: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
        min_interval: Duration,
    ) -> Result<bool>;

    /// Apply limit overrides, creating the counter from `template` if needed
    async fn configure_tenant(
        &self,
        tenant_id: &str,
        limits: &TenantLimits,
        template: &BudgetCounter,
    ) -> Result<BudgetCounter>;

    /// Records for a tenant, oldest first
    async fn usage_records(&self, tenant_id: &str) -> Result<Vec<UsageRecord>>;
}

/// Instance-local store, used when no database is configured and in tests
#[derive(Debug, Default)]
pub struct InMemoryBudgetStore {
    counters: DashMap<String, BudgetCounter>,
    records: RwLock<Vec<UsageRecord>>,
}

impl InMemoryBudgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a counter; for seeding state
    pub fn insert_counter(&self, counter: BudgetCounter) {
        self.counters.insert(counter.tenant_id.clone(), counter);
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }
}

fn claim_due(last: Option<DateTime<Utc>>, now: DateTime<Utc>, min_interval: Duration) -> bool {
    match last {
        None => true,
        Some(at) => now - at >= min_interval,
    }
}

#[async_trait]
impl BudgetStore for InMemoryBudgetStore {
    async fn load_or_create(
        &self,
        tenant_id: &str,
        template: &BudgetCounter,
    ) -> Result<BudgetCounter> {
        let entry = self
            .counters
            .entry(tenant_id.to_string())
            .or_insert_with(|| BudgetCounter {
                tenant_id: tenant_id.to_string(),
                ..template.clone()
            });
        Ok(entry.value().clone())
    }

    async fn reset_daily(
        &self,
        tenant_id: &str,
        expected: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(mut counter) = self.counters.get_mut(tenant_id) else {
            return Ok(false);
        };
        if counter.daily_reset_at != expected {
            return Ok(false);
        }
        counter.cost_today_cents = 0.0;
        counter.requests_today = 0;
        counter.daily_reset_at = now;
        Ok(true)
    }

    async fn reset_monthly(
        &self,
        tenant_id: &str,
        expected: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(mut counter) = self.counters.get_mut(tenant_id) else {
            return Ok(false);
        };
        if counter.monthly_reset_at != expected {
            return Ok(false);
        }
        counter.cost_this_month_cents = 0.0;
        counter.tokens_used_this_month = 0;
        counter.last_warning_notified_at = None;
        counter.last_limit_notified_at = None;
        counter.monthly_reset_at = now;
        Ok(true)
    }

    async fn persist_usage_record(&self, record: &UsageRecord) -> Result<()> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn persist_counter_increment(&self, tenant_id: &str, delta: CounterDelta) -> Result<()> {
        let delta = delta.clamped();
        if let Some(mut counter) = self.counters.get_mut(tenant_id) {
            counter.cost_today_cents += delta.cost_cents;
            counter.cost_this_month_cents += delta.cost_cents;
            counter.requests_today += delta.requests;
            counter.tokens_used_this_month += delta.tokens;
        }
        Ok(())
    }

    async fn claim_notification(
        &self,
        tenant_id: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
        min_interval: Duration,
    ) -> Result<bool> {
        let Some(mut counter) = self.counters.get_mut(tenant_id) else {
            return Ok(false);
        };
        let slot = match kind {
            NotificationKind::Warning => &mut counter.last_warning_notified_at,
            NotificationKind::Limit => &mut counter.last_limit_notified_at,
        };
        if !claim_due(*slot, now, min_interval) {
            return Ok(false);
        }
        *slot = Some(now);
        Ok(true)
    }

    async fn configure_tenant(
        &self,
        tenant_id: &str,
        limits: &TenantLimits,
        template: &BudgetCounter,
    ) -> Result<BudgetCounter> {
        let mut entry = self
            .counters
            .entry(tenant_id.to_string())
            .or_insert_with(|| BudgetCounter {
                tenant_id: tenant_id.to_string(),
                ..template.clone()
            });
        entry.apply_limits(limits);
        Ok(entry.value().clone())
    }

    async fn usage_records(&self, tenant_id: &str) -> Result<Vec<UsageRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}
