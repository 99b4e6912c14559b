//! Caller-facing results of `Gateway::call`

use crate::core::budget::{UsageStatus, Utilization};
use crate::core::providers::{AdapterError, UsageUnits};
use crate::core::router::ProviderAttempt;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Audit trail of one call, attached to success and failure alike
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditMeta {
    pub request_id: Uuid,
    pub tenant_id: String,
    /// Providers actually called, in order
    pub attempted_providers: Vec<String>,
    /// Per-provider log including skipped providers
    pub attempts: Vec<ProviderAttempt>,
    pub total_attempts: u32,
    pub latency_ms: u64,
    pub cost_cents: f64,
    pub usage_status: UsageStatus,
    pub budget_warning: Option<String>,
    pub utilization: Option<Utilization>,
    pub timestamp: DateTime<Utc>,
}

/// A served call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayResponse {
    pub payload: serde_json::Value,
    pub usage: UsageUnits,
    pub used_provider: String,
    pub was_failover: bool,
    pub audit: AuditMeta,
}

/// A call that was not served
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayCallError {
    #[error("[BUDGET_DENIED] {reason}")]
    BudgetDenied {
        reason: String,
        audit: Box<AuditMeta>,
    },

    #[error("[RATE_LIMITED] tenant request rate exceeded")]
    RateLimited {
        retry_after_secs: Option<u64>,
        audit: Box<AuditMeta>,
    },

    #[error("{error}")]
    AllProvidersFailed {
        /// Stable `ALL_PROVIDERS_FAILED` error naming the attempted providers
        error: AdapterError,
        /// Last concrete vendor error
        last_error: Option<AdapterError>,
        /// Provider that failed last
        provider: Option<String>,
        audit: Box<AuditMeta>,
    },

    #[error("[CANCELLED] request cancelled")]
    Cancelled {
        last_error: Option<AdapterError>,
        audit: Box<AuditMeta>,
    },
}

impl GatewayCallError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            GatewayCallError::BudgetDenied { .. } => "BUDGET_DENIED",
            GatewayCallError::RateLimited { .. } => "RATE_LIMITED",
            GatewayCallError::AllProvidersFailed { .. } => "ALL_PROVIDERS_FAILED",
            GatewayCallError::Cancelled { .. } => "CANCELLED",
        }
    }

    pub fn audit(&self) -> &AuditMeta {
        match self {
            GatewayCallError::BudgetDenied { audit, .. }
            | GatewayCallError::RateLimited { audit, .. }
            | GatewayCallError::AllProvidersFailed { audit, .. }
            | GatewayCallError::Cancelled { audit, .. } => audit,
        }
    }

    pub fn last_error(&self) -> Option<&AdapterError> {
        match self {
            GatewayCallError::AllProvidersFailed { last_error, .. }
            | GatewayCallError::Cancelled { last_error, .. } => last_error.as_ref(),
            _ => None,
        }
    }

    /// Whether the same call may succeed later without changes
    ///
    /// Only a tenant rate limit qualifies. An exhausted provider list is final
    /// like its `ALL_PROVIDERS_FAILED` error; see [`Self::last_error_retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayCallError::RateLimited { .. })
    }

    /// Whether the last vendor error behind a total failure was transient
    pub fn last_error_retryable(&self) -> bool {
        self.last_error().is_some_and(|e| e.retryable)
    }
}
