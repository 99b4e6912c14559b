//! Background health probing
//!
//! Runs every registered adapter's `health_check()` under a deadline and keeps
//! the latest report per provider. Reports are informational and never move
//! the circuit breaker; only real traffic does.

use crate::core::providers::{HealthCheckReport, ProviderRegistry, RegisteredProvider};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Latest-report cache plus the sweep logic
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    check_timeout: Duration,
    reports: Arc<DashMap<String, HealthCheckReport>>,
}

impl HealthMonitor {
    pub fn new(check_timeout: Duration) -> Self {
        Self {
            check_timeout,
            reports: Arc::new(DashMap::new()),
        }
    }

    /// Probe one provider, turning a missed deadline into an unhealthy report
    pub async fn check_provider(&self, provider: &RegisteredProvider) -> HealthCheckReport {
        let started = Instant::now();
        let report = match tokio::time::timeout(self.check_timeout, provider.adapter.health_check())
            .await
        {
            Ok(report) => report,
            Err(_) => HealthCheckReport::unhealthy(
                provider.code(),
                started.elapsed().as_millis() as u64,
                "Health check timeout",
            ),
        };

        if report.is_healthy {
            debug!(provider = provider.code(), latency_ms = report.latency_ms, "Health check passed");
        } else {
            warn!(provider = provider.code(), message = %report.message, "Health check failed");
        }
        self.reports.insert(provider.code().to_string(), report.clone());
        report
    }

    /// Probe every registered provider concurrently
    pub async fn check_all(&self, registry: &ProviderRegistry) -> Vec<HealthCheckReport> {
        let reports = join_all(registry.iter().map(|p| self.check_provider(p))).await;
        let codes = registry.codes();
        self.reports.retain(|code, _| codes.contains(code));
        reports
    }

    pub fn last_report(&self, code: &str) -> Option<HealthCheckReport> {
        self.reports.get(code).map(|r| r.value().clone())
    }

    pub fn reports(&self) -> Vec<HealthCheckReport> {
        let mut reports: Vec<_> = self.reports.iter().map(|r| r.value().clone()).collect();
        reports.sort_by(|a, b| a.provider.cmp(&b.provider));
        reports
    }

    /// Start the periodic sweep
    ///
    /// The registry is re-read on every tick so reloads are picked up. The task
    /// ends when `shutdown` is cancelled.
    pub fn start(
        &self,
        registry: Arc<ArcSwap<ProviderRegistry>>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        info!(interval_secs = interval.as_secs(), "Starting health monitor");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Health monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let registry = registry.load_full();
                        monitor.check_all(&registry).await;
                    }
                }
            }
        })
    }
}
