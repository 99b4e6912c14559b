//! Failover outcome types
//!
//! Both the success and the failure path carry the per-provider attempt log so
//! callers can audit exactly what happened.

use crate::core::providers::{AdapterError, AdapterErrorCode, ProviderResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happened with one provider during a failover run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProviderAttempt {
    /// Circuit open (or trial already in flight); never called
    Skipped { provider: String },
    /// Served the request after `attempts` calls
    Served { provider: String, attempts: u32 },
    /// Gave up after `attempts` calls
    Failed {
        provider: String,
        attempts: u32,
        error: AdapterError,
    },
}

impl ProviderAttempt {
    pub fn provider(&self) -> &str {
        match self {
            ProviderAttempt::Skipped { provider }
            | ProviderAttempt::Served { provider, .. }
            | ProviderAttempt::Failed { provider, .. } => provider,
        }
    }

    /// Calls made against the provider
    pub fn calls(&self) -> u32 {
        match self {
            ProviderAttempt::Skipped { .. } => 0,
            ProviderAttempt::Served { attempts, .. } | ProviderAttempt::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Providers that were actually called, in order
fn attempted(log: &[ProviderAttempt]) -> Vec<String> {
    log.iter()
        .filter(|a| a.calls() > 0)
        .map(|a| a.provider().to_string())
        .collect()
}

/// A served request
#[derive(Debug, Clone, PartialEq)]
pub struct FailoverOutcome {
    pub response: ProviderResponse,
    pub used_provider: String,
    /// True when the serving provider was not first in the order
    pub was_failover: bool,
    pub attempts: Vec<ProviderAttempt>,
}

impl FailoverOutcome {
    pub fn attempted_providers(&self) -> Vec<String> {
        attempted(&self.attempts)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.iter().map(ProviderAttempt::calls).sum()
    }
}

/// Failover ran out of providers or was cancelled
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct FailoverFailure {
    /// `ALL_PROVIDERS_FAILED` (non-retryable) or `CANCELLED`
    pub error: AdapterError,
    /// Last concrete vendor error, if any provider was called
    pub last_error: Option<AdapterError>,
    pub attempts: Vec<ProviderAttempt>,
}

impl FailoverFailure {
    pub fn all_failed(attempts: Vec<ProviderAttempt>, last_error: Option<AdapterError>) -> Self {
        let error = AdapterError::all_providers_failed(&attempted(&attempts), last_error.as_ref());
        Self {
            error,
            last_error,
            attempts,
        }
    }

    pub fn cancelled(attempts: Vec<ProviderAttempt>, last_error: Option<AdapterError>) -> Self {
        Self {
            error: AdapterError::cancelled(),
            last_error,
            attempts,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.code == AdapterErrorCode::Cancelled
    }

    pub fn attempted_providers(&self) -> Vec<String> {
        attempted(&self.attempts)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.iter().map(ProviderAttempt::calls).sum()
    }
}
