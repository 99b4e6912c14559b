//! Circuit breaker state types

use crate::core::providers::HealthCheckReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit state as seen at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Traffic flows normally
    Closed,
    /// Failing; traffic is withheld until the recovery window passes
    Open,
    /// Recovery window passed; one trial request may go through
    HalfOpen,
}

/// Outcome of asking whether a provider may take an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Circuit closed; the normal retry budget applies
    Closed,
    /// This caller holds the half-open trial and gets a single attempt
    Trial,
    /// Circuit open, or another caller holds the trial
    Blocked,
}

impl Eligibility {
    pub fn is_permitted(self) -> bool {
        !matches!(self, Eligibility::Blocked)
    }

    pub fn is_trial(self) -> bool {
        matches!(self, Eligibility::Trial)
    }
}

/// Per-provider breaker state, keyed by provider code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealthState {
    pub code: String,
    pub consecutive_failures: u32,
    pub circuit_open: bool,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// When the half-open trial was claimed
    pub trial_started_at: Option<DateTime<Utc>>,
    /// The trial lease is held until the claimant reports back or this passes
    pub trial_lease_until: Option<DateTime<Utc>>,
    /// Bumped by every successful compare-and-set
    pub version: u64,
}

impl ProviderHealthState {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            consecutive_failures: 0,
            circuit_open: false,
            last_failure_at: None,
            last_success_at: None,
            trial_started_at: None,
            trial_lease_until: None,
            version: 0,
        }
    }

    /// Effective state: an open circuit whose window has elapsed is half-open
    pub fn circuit_state(&self, now: DateTime<Utc>, recovery_window: Duration) -> CircuitState {
        if !self.circuit_open {
            return CircuitState::Closed;
        }
        match self.last_failure_at {
            Some(at) if elapsed_since(at, now) >= recovery_window => CircuitState::HalfOpen,
            // Open without a failure stamp cannot recover on its own; treat as elapsed
            None => CircuitState::HalfOpen,
            Some(_) => CircuitState::Open,
        }
    }

    /// Whether a claimed trial has neither reported back nor gone stale
    pub fn trial_in_flight(&self, now: DateTime<Utc>) -> bool {
        self.trial_lease_until.is_some_and(|until| now < until)
    }

    /// Take the trial lease for `lease`
    pub fn claim_trial(&mut self, now: DateTime<Utc>, lease: Duration) {
        let lease = chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::MAX);
        self.trial_started_at = Some(now);
        self.trial_lease_until = Some(
            now.checked_add_signed(lease)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
    }

    pub fn clear_trial(&mut self) {
        self.trial_started_at = None;
        self.trial_lease_until = None;
    }
}

/// Time between two instants, zero when `now` is earlier
pub fn elapsed_since(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - earlier).to_std().unwrap_or(Duration::ZERO)
}

/// What callers see for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealthSnapshot {
    pub code: String,
    pub circuit: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Latest background probe, informational only
    pub last_report: Option<HealthCheckReport>,
}
