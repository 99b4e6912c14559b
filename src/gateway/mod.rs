//! Gateway facade
//!
//! `Gateway` is the context object callers hold. A call runs through the
//! tenant rate limiter, budget admission, failover and metering, in that
//! order, and always leaves exactly one usage record behind.

pub mod builder;
pub mod types;

pub use builder::GatewayBuilder;
pub use types::{AuditMeta, GatewayCallError, GatewayResponse};

use crate::config::{GatewayConfig, ProviderDescriptor};
use crate::core::budget::{BudgetCheck, BudgetGuard, UsageInput, UsageStatus};
use crate::core::health::{HealthMonitor, HealthTracker, ProviderHealthSnapshot};
use crate::core::providers::{
    AdapterErrorCode, AdapterFactory, GatewayRequest, HealthCheckReport, ProviderRegistry,
    RegisteredProvider, UsageUnits,
};
use crate::core::rate_limiter::RateLimiter;
use crate::core::router::{FailoverExecutor, FailoverFailure, ProviderAttempt};
use crate::utils::error::Result;
use arc_swap::ArcSwap;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of `Gateway::call`
pub type CallResult = std::result::Result<GatewayResponse, GatewayCallError>;

/// Resilient, budget-governed access to the registered providers
#[derive(Debug)]
pub struct Gateway {
    registry: Arc<ArcSwap<ProviderRegistry>>,
    factory: AdapterFactory,
    tracker: HealthTracker,
    executor: FailoverExecutor,
    budget: BudgetGuard,
    rate_limiter: RateLimiter,
    monitor: HealthMonitor,
    shutdown: CancellationToken,
    monitor_task: Mutex<Option<JoinHandle<()>>>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

/// Per-call bookkeeping shared by every exit path
struct CallContext<'a> {
    request_id: Uuid,
    tenant_id: &'a str,
    started: Instant,
    check: Option<BudgetCheck>,
}

impl CallContext<'_> {
    fn audit(&self, attempts: Vec<ProviderAttempt>, status: UsageStatus, cost_cents: f64) -> AuditMeta {
        let attempted_providers = attempts
            .iter()
            .filter(|a| a.calls() > 0)
            .map(|a| a.provider().to_string())
            .collect();
        AuditMeta {
            request_id: self.request_id,
            tenant_id: self.tenant_id.to_string(),
            attempted_providers,
            total_attempts: attempts.iter().map(ProviderAttempt::calls).sum(),
            attempts,
            latency_ms: self.latency_ms(),
            cost_cents,
            usage_status: status,
            budget_warning: self.check.as_ref().and_then(|c| c.warning.clone()),
            utilization: self.check.as_ref().map(|c| c.utilization),
            timestamp: Utc::now(),
        }
    }

    fn latency_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Gateway {
    /// Build a gateway with the default stores and adapters
    pub async fn from_config(config: GatewayConfig) -> Result<Self> {
        GatewayBuilder::new(config).build().await
    }

    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    /// Call a provider on behalf of a tenant
    ///
    /// The call is abandoned when the gateway shuts down.
    pub async fn call(
        &self,
        tenant_id: &str,
        request: &GatewayRequest,
        preferred: Option<&str>,
    ) -> CallResult {
        let cancel = self.shutdown.child_token();
        self.call_with_cancel(tenant_id, request, preferred, &cancel)
            .await
    }

    /// Like [`Gateway::call`], stopping retries and backoff when `cancel` fires
    pub async fn call_with_cancel(
        &self,
        tenant_id: &str,
        request: &GatewayRequest,
        preferred: Option<&str>,
        cancel: &CancellationToken,
    ) -> CallResult {
        let mut ctx = CallContext {
            request_id: Uuid::new_v4(),
            tenant_id,
            started: Instant::now(),
            check: None,
        };
        debug!(
            request_id = %ctx.request_id,
            tenant = tenant_id,
            kind = request.kind_name(),
            preferred = preferred.unwrap_or("-"),
            "Gateway call"
        );

        if self.rate_limiter.is_enabled() {
            let limit = self.rate_limiter.check_and_record(tenant_id);
            if !limit.allowed {
                info!(tenant = tenant_id, limit = limit.limit, "Tenant rate limited");
                self.meter(&ctx, None, request, UsageUnits::default(), UsageStatus::RateLimited)
                    .await;
                return Err(GatewayCallError::RateLimited {
                    retry_after_secs: limit.retry_after_secs,
                    audit: Box::new(ctx.audit(vec![], UsageStatus::RateLimited, 0.0)),
                });
            }
        }

        let providers = self.candidates(request, preferred);

        let check = self
            .budget
            .check_budget(
                tenant_id,
                &request.estimated_units(),
                providers.first().map(RegisteredProvider::code),
                request.rate_key(),
            )
            .await;
        let allowed = check.allowed;
        let reason = check.reason.clone();
        ctx.check = Some(check);
        if !allowed {
            let reason = reason.unwrap_or_else(|| "budget exceeded".to_string());
            self.meter(&ctx, None, request, UsageUnits::default(), UsageStatus::Blocked)
                .await;
            return Err(GatewayCallError::BudgetDenied {
                reason,
                audit: Box::new(ctx.audit(vec![], UsageStatus::Blocked, 0.0)),
            });
        }

        match self.executor.execute(request, &providers, cancel).await {
            Ok(outcome) => {
                let usage = outcome.response.usage;
                let model = outcome.response.model.clone();
                let cost_cents = self
                    .budget
                    .record_usage(UsageInput {
                        tenant_id: tenant_id.to_string(),
                        provider: Some(outcome.used_provider.clone()),
                        model: model.or_else(|| request.rate_key().map(str::to_string)),
                        units: usage,
                        status: UsageStatus::Success,
                        latency_ms: ctx.latency_ms(),
                    })
                    .await;
                let audit = ctx.audit(outcome.attempts, UsageStatus::Success, cost_cents);
                Ok(GatewayResponse {
                    payload: outcome.response.payload,
                    usage,
                    used_provider: outcome.used_provider,
                    was_failover: outcome.was_failover,
                    audit,
                })
            }
            Err(failure) => Err(self.fail(&ctx, request, failure).await),
        }
    }

    async fn fail(
        &self,
        ctx: &CallContext<'_>,
        request: &GatewayRequest,
        failure: FailoverFailure,
    ) -> GatewayCallError {
        let provider = failure
            .attempts
            .iter()
            .rev()
            .find(|a| a.calls() > 0)
            .map(|a| a.provider().to_string());
        let status = match &failure.last_error {
            Some(e) if e.code == AdapterErrorCode::RateLimited && !failure.is_cancelled() => {
                UsageStatus::RateLimited
            }
            _ => UsageStatus::Failed,
        };
        self.meter(ctx, provider.clone(), request, UsageUnits::default(), status)
            .await;

        let audit = Box::new(ctx.audit(failure.attempts, status, 0.0));
        if failure.error.code == AdapterErrorCode::Cancelled {
            GatewayCallError::Cancelled {
                last_error: failure.last_error,
                audit,
            }
        } else {
            GatewayCallError::AllProvidersFailed {
                error: failure.error,
                last_error: failure.last_error,
                provider,
                audit,
            }
        }
    }

    async fn meter(
        &self,
        ctx: &CallContext<'_>,
        provider: Option<String>,
        request: &GatewayRequest,
        units: UsageUnits,
        status: UsageStatus,
    ) {
        self.budget
            .record_usage(UsageInput {
                tenant_id: ctx.tenant_id.to_string(),
                provider,
                model: request.rate_key().map(str::to_string),
                units,
                status,
                latency_ms: ctx.latency_ms(),
            })
            .await;
    }

    /// Registered providers able to serve `request`, in attempt order
    fn candidates(&self, request: &GatewayRequest, preferred: Option<&str>) -> Vec<RegisteredProvider> {
        let kind = request.provider_kind();
        self.registry
            .load()
            .ordered_providers(preferred)
            .into_iter()
            .filter(|p| p.descriptor.kind() == kind)
            .collect()
    }

    /// Attempt order with open circuits left out
    ///
    /// Read-only: does not claim a half-open trial.
    pub async fn attempt_order(&self, preferred: Option<&str>) -> Vec<String> {
        let mut order = Vec::new();
        for code in self.registry.load().get_order(preferred) {
            if self.tracker.peek_eligible(&code).await {
                order.push(code);
            }
        }
        order
    }

    /// Breaker state of every registered provider plus its latest probe
    pub async fn provider_health(&self) -> Vec<ProviderHealthSnapshot> {
        let now = Utc::now();
        let window = self.tracker.recovery_window();
        self.tracker
            .states()
            .await
            .into_iter()
            .map(|state| ProviderHealthSnapshot {
                circuit: state.circuit_state(now, window),
                consecutive_failures: state.consecutive_failures,
                last_failure_at: state.last_failure_at,
                last_success_at: state.last_success_at,
                last_report: self.monitor.last_report(&state.code),
                code: state.code,
            })
            .collect()
    }

    /// Run one health sweep now
    pub async fn run_health_checks(&self) -> Vec<HealthCheckReport> {
        let registry = self.registry.load_full();
        self.monitor.check_all(&registry).await
    }

    /// Start the periodic health sweep; a running sweep is left alone
    pub fn start_health_monitor(&self, interval: Duration) {
        let mut task = self.monitor_task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        *task = Some(
            self.monitor
                .start(self.registry.clone(), interval, self.shutdown.child_token()),
        );
    }

    /// Start evicting idle tenants from the rate limiter
    fn start_rate_limit_cleanup(&self) {
        let interval = self.rate_limiter.window();
        *self.cleanup_task.lock() = Some(
            self.rate_limiter
                .start_cleanup(interval, self.shutdown.child_token()),
        );
    }

    /// Replace the provider set
    ///
    /// In-flight calls finish on the registry they started with. Breaker state
    /// survives for codes present in both generations. Returns the number of
    /// registered providers.
    pub async fn reload(&self, descriptors: &[ProviderDescriptor]) -> usize {
        let registry = ProviderRegistry::initialize(descriptors, &self.factory).await;
        if registry.is_empty() {
            warn!("Reload produced an empty provider registry");
        }
        self.tracker.sync(&registry.codes()).await;
        let count = registry.len();
        self.registry.store(Arc::new(registry));
        self.budget.costs().invalidate_all();
        info!(providers = count, "Provider registry reloaded");
        count
    }

    /// Cancel in-flight calls and stop background tasks
    pub async fn shutdown(&self) {
        info!("Shutting down gateway");
        self.shutdown.cancel();
        let tasks = [
            ("Health monitor", self.monitor_task.lock().take()),
            ("Rate limiter cleanup", self.cleanup_task.lock().take()),
        ];
        for (name, task) in tasks {
            if let Some(task) = task {
                if let Err(e) = task.await {
                    warn!(task = name, error = %e, "Background task ended abnormally");
                }
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Current registry generation
    pub fn registry(&self) -> Arc<ProviderRegistry> {
        self.registry.load_full()
    }

    pub fn tracker(&self) -> &HealthTracker {
        &self.tracker
    }

    pub fn budget(&self) -> &BudgetGuard {
        &self.budget
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
