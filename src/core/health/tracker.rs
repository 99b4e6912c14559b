//! Per-provider circuit breaker
//!
//! CLOSED -> OPEN after `failure_threshold` consecutive failures, OPEN ->
//! HALF_OPEN once the recovery window has passed since the last failure, and
//! HALF_OPEN -> CLOSED or back to OPEN depending on the single trial's result.
//!
//! Every transition is a compare-and-set against the store. Nothing reads
//! state, awaits, and then writes based on the stale read.

use super::store::{CasOutcome, HealthStore};
use super::types::{CircuitState, Eligibility, ProviderHealthState};
use crate::config::CircuitBreakerConfig;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retries of one compare-and-set loop before giving up
const MAX_CAS_ATTEMPTS: usize = 64;

/// Circuit breaker over a [`HealthStore`]
#[derive(Debug, Clone)]
pub struct HealthTracker {
    store: Arc<dyn HealthStore>,
    failure_threshold: u32,
    recovery_window: Duration,
}

impl HealthTracker {
    pub fn new(store: Arc<dyn HealthStore>, config: &CircuitBreakerConfig) -> Self {
        Self {
            store,
            failure_threshold: config.failure_threshold.max(1),
            recovery_window: config.recovery_window(),
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn recovery_window(&self) -> Duration {
        self.recovery_window
    }

    pub fn store(&self) -> &Arc<dyn HealthStore> {
        &self.store
    }

    /// Create state for a newly registered provider
    pub async fn register(&self, code: &str) {
        if self.store.register(code).await {
            debug!(provider = code, "Health state registered");
        }
    }

    /// Align the store with a registry generation
    ///
    /// Codes that disappeared are dropped, new codes start closed, and codes
    /// that survive keep their state.
    pub async fn sync(&self, codes: &[String]) {
        let wanted: HashSet<&str> = codes.iter().map(String::as_str).collect();
        for state in self.store.list().await {
            if !wanted.contains(state.code.as_str()) {
                self.store.remove(&state.code).await;
                debug!(provider = %state.code, "Health state removed");
            }
        }
        for code in codes {
            self.register(code).await;
        }
    }

    pub async fn state(&self, code: &str) -> Option<ProviderHealthState> {
        self.store.get(code).await
    }

    pub async fn states(&self) -> Vec<ProviderHealthState> {
        self.store.list().await
    }

    pub async fn circuit_state(&self, code: &str) -> Option<CircuitState> {
        self.circuit_state_at(code, Utc::now()).await
    }

    pub async fn circuit_state_at(&self, code: &str, now: DateTime<Utc>) -> Option<CircuitState> {
        self.store
            .get(code)
            .await
            .map(|s| s.circuit_state(now, self.recovery_window))
    }

    /// Eligibility without claiming the half-open trial
    pub async fn peek_eligible(&self, code: &str) -> bool {
        self.peek_eligible_at(code, Utc::now()).await
    }

    pub async fn peek_eligible_at(&self, code: &str, now: DateTime<Utc>) -> bool {
        match self.store.get(code).await {
            Some(state) => match state.circuit_state(now, self.recovery_window) {
                CircuitState::Closed => true,
                CircuitState::Open => false,
                CircuitState::HalfOpen => !state.trial_in_flight(now),
            },
            None => false,
        }
    }

    /// Eligibility for an actual attempt
    ///
    /// In HALF_OPEN this claims the trial lease for one recovery window; only
    /// one caller gets `true` until the trial reports back.
    pub async fn is_eligible(&self, code: &str) -> bool {
        self.is_eligible_at(code, Utc::now()).await
    }

    pub async fn is_eligible_at(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.acquire_at(code, now, self.recovery_window)
            .await
            .is_permitted()
    }

    /// Ask for an attempt, claiming the half-open trial if one is available
    ///
    /// A claimed lease stays held until `record_success`, `record_failure` or
    /// `release_trial`. `lease` only bounds how long a claimant that never
    /// reports back can block recovery, so it must cover the trial's deadline.
    pub async fn acquire(&self, code: &str, lease: Duration) -> Eligibility {
        self.acquire_at(code, Utc::now(), lease).await
    }

    pub async fn acquire_at(&self, code: &str, now: DateTime<Utc>, lease: Duration) -> Eligibility {
        let window = self.recovery_window;
        let outcome = self
            .update(code, |state| match state.circuit_state(now, window) {
                CircuitState::HalfOpen if !state.trial_in_flight(now) => {
                    let mut next = state.clone();
                    next.claim_trial(now, lease);
                    Some(next)
                }
                _ => None,
            })
            .await;

        match outcome {
            // The only write is the trial claim
            Some(Updated { applied: true, .. }) => {
                info!(provider = code, "Circuit half-open, trial request permitted");
                Eligibility::Trial
            }
            Some(Updated { state, .. })
                if state.circuit_state(now, window) == CircuitState::Closed =>
            {
                Eligibility::Closed
            }
            _ => Eligibility::Blocked,
        }
    }

    /// A served request closes the circuit and clears the failure streak
    pub async fn record_success(&self, code: &str) {
        self.record_success_at(code, Utc::now()).await;
    }

    pub async fn record_success_at(&self, code: &str, now: DateTime<Utc>) {
        let mut was_open = false;
        let updated = self
            .update(code, |state| {
                was_open = state.circuit_open;
                let mut next = state.clone();
                next.consecutive_failures = 0;
                next.circuit_open = false;
                next.clear_trial();
                next.last_success_at = Some(now);
                Some(next)
            })
            .await;

        if updated.is_some_and(|u| u.applied) && was_open {
            info!(provider = code, "Circuit closed after successful trial");
        }
    }

    /// One failed attempt sequence against a provider
    ///
    /// A failure while the circuit is open (the half-open trial) pins the
    /// streak at the threshold and restarts the recovery window.
    pub async fn record_failure(&self, code: &str) {
        self.record_failure_at(code, Utc::now()).await;
    }

    pub async fn record_failure_at(&self, code: &str, now: DateTime<Utc>) {
        let threshold = self.failure_threshold;
        let mut transition = (false, false);
        let updated = self
            .update(code, |state| {
                let mut next = state.clone();
                next.consecutive_failures = if state.circuit_open {
                    threshold
                } else {
                    state.consecutive_failures.saturating_add(1)
                };
                next.last_failure_at = Some(now);
                next.clear_trial();
                next.circuit_open = next.consecutive_failures >= threshold;
                transition = (state.circuit_open, next.circuit_open);
                Some(next)
            })
            .await;

        let Some(Updated { state, .. }) = updated else {
            return;
        };
        match transition {
            (false, true) => warn!(
                provider = code,
                failures = state.consecutive_failures,
                "Circuit opened"
            ),
            (true, true) => warn!(provider = code, "Half-open trial failed, circuit re-opened"),
            _ => debug!(
                provider = code,
                failures = state.consecutive_failures,
                "Provider failure recorded"
            ),
        }
    }

    /// Give back a claimed trial without judging the provider (cancelled call)
    pub async fn release_trial(&self, code: &str) {
        self.update(code, |state| {
            state.trial_lease_until?;
            let mut next = state.clone();
            next.clear_trial();
            Some(next)
        })
        .await;
    }

    /// Compare-and-set loop
    ///
    /// `f` returns the desired next state, or `None` to leave the current state
    /// as is. Returns `None` if the provider is not registered.
    async fn update<F>(&self, code: &str, mut f: F) -> Option<Updated>
    where
        F: FnMut(&ProviderHealthState) -> Option<ProviderHealthState> + Send,
    {
        let mut current = self.store.get(code).await?;
        for _ in 0..MAX_CAS_ATTEMPTS {
            let Some(next) = f(&current) else {
                return Some(Updated {
                    state: current,
                    applied: false,
                });
            };
            match self.store.compare_and_set(code, current.version, next).await {
                CasOutcome::Applied(state) => {
                    return Some(Updated {
                        state,
                        applied: true,
                    });
                }
                CasOutcome::Conflict(latest) => current = latest,
                CasOutcome::Missing => return None,
            }
        }
        warn!(provider = code, "Health state update abandoned after contention");
        Some(Updated {
            state: current,
            applied: false,
        })
    }
}

/// State after an update loop
#[derive(Debug)]
struct Updated {
    state: ProviderHealthState,
    /// Whether this call wrote it
    applied: bool,
}
