//! Failover executor
//!
//! Walks an ordered provider list: ineligible providers are skipped, each
//! eligible provider gets up to `max_retries` strictly sequential attempts with
//! exponential backoff between retryable failures, and the first success wins.
//! A provider admitted on its half-open trial gets exactly one attempt.

use super::config::RetryPolicy;
use super::execution::{calculate_retry_delay, call_with_deadline, sleep_or_cancel};
use super::fallback::{FailoverFailure, FailoverOutcome, ProviderAttempt};
use crate::core::health::{Eligibility, HealthTracker};
use crate::core::providers::{
    AdapterError, AdapterErrorCode, GatewayRequest, ProviderResponse, RegisteredProvider,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Slack on top of the trial's deadline before its lease counts as abandoned
const TRIAL_LEASE_GRACE: Duration = Duration::from_secs(5);

/// Result of a failover run; expected failures are values, never panics
pub type FailoverResult = Result<FailoverOutcome, FailoverFailure>;

#[derive(Debug, Clone)]
pub struct FailoverExecutor {
    tracker: HealthTracker,
    policy: RetryPolicy,
}

/// How one provider's attempt sequence ended
enum ProviderRun {
    Served(ProviderResponse, u32),
    Failed(AdapterError, u32),
    Cancelled(u32),
}

impl FailoverExecutor {
    pub fn new(tracker: HealthTracker, policy: RetryPolicy) -> Self {
        Self { tracker, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn tracker(&self) -> &HealthTracker {
        &self.tracker
    }

    /// Run with the executor's own policy
    pub async fn execute(
        &self,
        request: &GatewayRequest,
        providers: &[RegisteredProvider],
        cancel: &CancellationToken,
    ) -> FailoverResult {
        self.execute_with_policy(request, providers, &self.policy, cancel)
            .await
    }

    pub async fn execute_with_policy(
        &self,
        request: &GatewayRequest,
        providers: &[RegisteredProvider],
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> FailoverResult {
        let mut log = Vec::with_capacity(providers.len());
        let mut last_error: Option<AdapterError> = None;

        for (index, provider) in providers.iter().enumerate() {
            let code = provider.code();

            if cancel.is_cancelled() {
                return Err(FailoverFailure::cancelled(log, last_error));
            }

            let lease = policy
                .timeout_for(&provider.descriptor)
                .saturating_add(TRIAL_LEASE_GRACE);
            let eligibility = self.tracker.acquire(code, lease).await;
            if !eligibility.is_permitted() {
                debug!(provider = code, "Circuit open, provider skipped");
                log.push(ProviderAttempt::Skipped {
                    provider: code.to_string(),
                });
                continue;
            }

            match self
                .run_provider(provider, request, policy, eligibility, cancel)
                .await
            {
                ProviderRun::Served(response, attempts) => {
                    self.tracker.record_success(code).await;
                    let was_failover = index > 0;
                    if was_failover {
                        info!(provider = code, position = index, "Request served after failover");
                    }
                    log.push(ProviderAttempt::Served {
                        provider: code.to_string(),
                        attempts,
                    });
                    return Ok(FailoverOutcome {
                        response,
                        used_provider: code.to_string(),
                        was_failover,
                        attempts: log,
                    });
                }
                ProviderRun::Failed(error, attempts) => {
                    // Handing a provider a request of the wrong family says nothing about its health
                    if error.code == AdapterErrorCode::UnsupportedRequest {
                        self.tracker.release_trial(code).await;
                    } else {
                        self.tracker.record_failure(code).await;
                    }
                    warn!(
                        provider = code,
                        attempts = attempts,
                        error = %error,
                        "Provider exhausted, moving on"
                    );
                    log.push(ProviderAttempt::Failed {
                        provider: code.to_string(),
                        attempts,
                        error: error.clone(),
                    });
                    last_error = Some(error);
                }
                ProviderRun::Cancelled(attempts) => {
                    self.tracker.release_trial(code).await;
                    debug!(provider = code, "Failover cancelled by caller");
                    log.push(ProviderAttempt::Failed {
                        provider: code.to_string(),
                        attempts,
                        error: AdapterError::cancelled(),
                    });
                    return Err(FailoverFailure::cancelled(log, last_error));
                }
            }
        }

        warn!(providers = providers.len(), "All providers failed");
        Err(FailoverFailure::all_failed(log, last_error))
    }

    /// Up to `max_retries` attempts against one provider; no sleep after the last
    async fn run_provider(
        &self,
        provider: &RegisteredProvider,
        request: &GatewayRequest,
        policy: &RetryPolicy,
        eligibility: Eligibility,
        cancel: &CancellationToken,
    ) -> ProviderRun {
        let max_attempts = if eligibility.is_trial() {
            1
        } else {
            policy.attempts_for(&provider.descriptor)
        };
        let timeout = policy.timeout_for(&provider.descriptor);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match call_with_deadline(provider.adapter.as_ref(), request, timeout, cancel).await {
                Ok(response) => return ProviderRun::Served(response, attempt),
                Err(e) if e.code == AdapterErrorCode::Cancelled => {
                    return ProviderRun::Cancelled(attempt);
                }
                Err(e) if !e.retryable || attempt >= max_attempts => {
                    return ProviderRun::Failed(e, attempt);
                }
                Err(e) => {
                    let delay = calculate_retry_delay(policy, attempt);
                    debug!(
                        provider = provider.code(),
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable failure, backing off"
                    );
                    if !sleep_or_cancel(delay, cancel).await {
                        return ProviderRun::Cancelled(attempt);
                    }
                }
            }
        }
    }
}
