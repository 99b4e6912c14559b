//! Budget admission and usage metering

use super::notifier::{BudgetNotification, BudgetNotifier};
use super::reset::{needs_daily_reset, needs_monthly_reset};
use super::store::BudgetStore;
use super::types::{
    BudgetCheck, BudgetCounter, CounterDelta, NotificationKind, TenantLimits, UsageInput,
    UsageRecord, UsageStatus, Utilization,
};
use crate::config::BudgetConfig;
use crate::core::cost::CostRateCache;
use crate::core::providers::UsageUnits;
use crate::utils::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-tenant spend governance
#[derive(Debug, Clone)]
pub struct BudgetGuard {
    store: Arc<dyn BudgetStore>,
    costs: CostRateCache,
    notifier: Arc<dyn BudgetNotifier>,
    defaults: BudgetConfig,
    notification_interval: Duration,
}

impl BudgetGuard {
    pub fn new(
        store: Arc<dyn BudgetStore>,
        costs: CostRateCache,
        notifier: Arc<dyn BudgetNotifier>,
        defaults: BudgetConfig,
    ) -> Self {
        let notification_interval =
            Duration::seconds(defaults.notification_interval_secs.min(i32::MAX as u64) as i64);
        Self {
            store,
            costs,
            notifier,
            defaults,
            notification_interval,
        }
    }

    pub fn store(&self) -> &Arc<dyn BudgetStore> {
        &self.store
    }

    pub fn costs(&self) -> &CostRateCache {
        &self.costs
    }

    /// Admission check against the tenant's limits
    ///
    /// `provider` and `rate_key` select the cost rate used for the estimate.
    /// Never returns an error: storage failures allow the request.
    pub async fn check_budget(
        &self,
        tenant_id: &str,
        units: &UsageUnits,
        provider: Option<&str>,
        rate_key: Option<&str>,
    ) -> BudgetCheck {
        self.check_budget_at(tenant_id, units, provider, rate_key, Utc::now())
            .await
    }

    pub async fn check_budget_at(
        &self,
        tenant_id: &str,
        units: &UsageUnits,
        provider: Option<&str>,
        rate_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> BudgetCheck {
        match self.evaluate(tenant_id, units, provider, rate_key, now).await {
            Ok(check) => check,
            Err(e) => {
                error!(tenant = tenant_id, error = %e, "Budget check failed, allowing request");
                BudgetCheck::fail_open(e)
            }
        }
    }

    async fn evaluate(
        &self,
        tenant_id: &str,
        units: &UsageUnits,
        provider: Option<&str>,
        rate_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<BudgetCheck> {
        let counter = self.current_counter(tenant_id, now).await?;
        let estimated_cost_cents = match provider {
            Some(provider) => self
                .costs
                .cost_for(provider, rate_key, units)
                .await
                .unwrap_or_else(|e| {
                    warn!(tenant = tenant_id, provider = provider, error = %e, "Cost estimate unavailable");
                    0.0
                }),
            None => 0.0,
        };
        let utilization = counter.utilization();

        // The threshold warning applies whether or not the request is denied
        let warning = warning_message(&counter, &utilization);
        if let Some(message) = &warning {
            self.notify(tenant_id, NotificationKind::Warning, message.clone(), utilization, now)
                .await;
        }

        if counter.hard_stop {
            if let Some(reason) = counter.exceeded_limit() {
                info!(tenant = tenant_id, reason = reason, "Budget denied request");
                self.notify(
                    tenant_id,
                    NotificationKind::Limit,
                    format!("Tenant {} blocked: {}", tenant_id, reason),
                    utilization,
                    now,
                )
                .await;
                return Ok(BudgetCheck {
                    allowed: false,
                    reason: Some(reason.to_string()),
                    warning,
                    utilization,
                    estimated_cost_cents,
                });
            }
        }

        Ok(BudgetCheck {
            allowed: true,
            reason: None,
            warning,
            utilization,
            estimated_cost_cents,
        })
    }

    /// Meter one completed call
    ///
    /// Always writes a usage record; counters move only for `SUCCESS`.
    /// Failures are logged and swallowed. Returns the computed cost.
    pub async fn record_usage(&self, input: UsageInput) -> f64 {
        self.record_usage_at(input, Utc::now()).await
    }

    pub async fn record_usage_at(&self, input: UsageInput, now: DateTime<Utc>) -> f64 {
        let cost_cents = match (input.status, input.provider.as_deref()) {
            (UsageStatus::Success, Some(provider)) => self
                .costs
                .cost_for(provider, input.model.as_deref(), &input.units)
                .await
                .unwrap_or_else(|e| {
                    warn!(tenant = %input.tenant_id, provider = provider, error = %e, "Cost rate unavailable, recording 0");
                    0.0
                }),
            _ => 0.0,
        };

        let record = UsageRecord {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id.clone(),
            provider: input.provider.clone(),
            model: input.model.clone(),
            input_tokens: input.units.input_tokens,
            output_tokens: input.units.output_tokens,
            messages: input.units.messages,
            cost_cents,
            status: input.status,
            latency_ms: input.latency_ms,
            created_at: now,
        };
        if let Err(e) = self.store.persist_usage_record(&record).await {
            error!(tenant = %input.tenant_id, status = %input.status, error = %e, "Failed to persist usage record");
        }

        if input.status == UsageStatus::Success {
            if let Err(e) = self.increment(&input, cost_cents, now).await {
                error!(tenant = %input.tenant_id, error = %e, "Failed to increment budget counters");
            }
        }

        debug!(
            tenant = %input.tenant_id,
            status = %input.status,
            cost_cents = cost_cents,
            "Usage recorded"
        );
        cost_cents
    }

    async fn increment(&self, input: &UsageInput, cost_cents: f64, now: DateTime<Utc>) -> Result<()> {
        self.current_counter(&input.tenant_id, now).await?;
        self.store
            .persist_counter_increment(
                &input.tenant_id,
                CounterDelta {
                    cost_cents,
                    requests: 1,
                    tokens: input.units.total_tokens(),
                }
                .clamped(),
            )
            .await
    }

    /// Set per-tenant limit overrides
    pub async fn configure_tenant(&self, tenant_id: &str, limits: &TenantLimits) -> Result<BudgetCounter> {
        let counter = self
            .store
            .configure_tenant(tenant_id, limits, &self.template(Utc::now()))
            .await?;
        info!(tenant = tenant_id, hard_stop = counter.hard_stop, "Tenant limits updated");
        Ok(counter)
    }

    /// Counter after lazy window resets
    pub async fn counter(&self, tenant_id: &str) -> Result<BudgetCounter> {
        self.current_counter(tenant_id, Utc::now()).await
    }

    pub async fn usage_records(&self, tenant_id: &str) -> Result<Vec<UsageRecord>> {
        self.store.usage_records(tenant_id).await
    }

    async fn current_counter(&self, tenant_id: &str, now: DateTime<Utc>) -> Result<BudgetCounter> {
        let counter = self.store.load_or_create(tenant_id, &self.template(now)).await?;
        let mut changed = false;

        if needs_monthly_reset(&counter, now)
            && self
                .store
                .reset_monthly(tenant_id, counter.monthly_reset_at, now)
                .await?
        {
            debug!(tenant = tenant_id, "Monthly budget window reset");
            changed = true;
        }
        if needs_daily_reset(&counter, now)
            && self
                .store
                .reset_daily(tenant_id, counter.daily_reset_at, now)
                .await?
        {
            debug!(tenant = tenant_id, "Daily budget window reset");
            changed = true;
        }

        // A lost reset race also leaves `counter` stale
        if changed || needs_daily_reset(&counter, now) || needs_monthly_reset(&counter, now) {
            return self.store.load_or_create(tenant_id, &self.template(now)).await;
        }
        Ok(counter)
    }

    fn template(&self, now: DateTime<Utc>) -> BudgetCounter {
        BudgetCounter::new("", &self.defaults, now)
    }

    async fn notify(
        &self,
        tenant_id: &str,
        kind: NotificationKind,
        message: String,
        utilization: Utilization,
        now: DateTime<Utc>,
    ) {
        match self
            .store
            .claim_notification(tenant_id, kind, now, self.notification_interval)
            .await
        {
            Ok(true) => {
                self.notifier
                    .notify(&BudgetNotification {
                        tenant_id: tenant_id.to_string(),
                        kind,
                        message,
                        utilization,
                        at: now,
                    })
                    .await
            }
            Ok(false) => debug!(tenant = tenant_id, kind = %kind, "Budget notification throttled"),
            Err(e) => warn!(tenant = tenant_id, kind = %kind, error = %e, "Failed to claim budget notification"),
        }
    }
}

fn warning_message(counter: &BudgetCounter, utilization: &Utilization) -> Option<String> {
    let threshold = counter.warning_threshold_percent;
    if threshold <= 0.0 {
        return None;
    }
    let (window, percent) = if utilization.daily_percent >= utilization.monthly_percent {
        ("daily", utilization.daily_percent)
    } else {
        ("monthly", utilization.monthly_percent)
    };
    if percent < threshold {
        return None;
    }
    Some(match counter.exceeded_limit() {
        Some(reason) if !counter.hard_stop => format!(
            "Budget warning: {} ({:.1}% of {} budget used)",
            reason, percent, window
        ),
        _ => format!(
            "Budget warning: {:.1}% of {} budget used (threshold {:.0}%)",
            percent, window, threshold
        ),
    })
}
