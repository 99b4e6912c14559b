//! Budget governance types

use crate::config::BudgetConfig;
use crate::core::providers::UsageUnits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Outcome class of one gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageStatus {
    Success,
    Failed,
    Blocked,
    RateLimited,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Success => "SUCCESS",
            UsageStatus::Failed => "FAILED",
            UsageStatus::Blocked => "BLOCKED",
            UsageStatus::RateLimited => "RATE_LIMITED",
        }
    }
}

impl fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(UsageStatus::Success),
            "FAILED" => Ok(UsageStatus::Failed),
            "BLOCKED" => Ok(UsageStatus::Blocked),
            "RATE_LIMITED" => Ok(UsageStatus::RateLimited),
            other => Err(format!("Unknown usage status: {}", other)),
        }
    }
}

/// Per-tenant spend and request counters with their limits
///
/// Limits of `0` are not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCounter {
    pub tenant_id: String,
    pub daily_budget_cents: f64,
    pub monthly_budget_cents: f64,
    pub daily_request_limit: u64,
    pub cost_today_cents: f64,
    pub cost_this_month_cents: f64,
    pub requests_today: u64,
    pub tokens_used_this_month: u64,
    pub hard_stop: bool,
    pub warning_threshold_percent: f64,
    pub daily_reset_at: DateTime<Utc>,
    pub monthly_reset_at: DateTime<Utc>,
    pub last_warning_notified_at: Option<DateTime<Utc>>,
    pub last_limit_notified_at: Option<DateTime<Utc>>,
}

impl BudgetCounter {
    /// Fresh counter carrying the system defaults
    pub fn new(tenant_id: impl Into<String>, defaults: &BudgetConfig, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            daily_budget_cents: defaults.daily_budget_cents,
            monthly_budget_cents: defaults.monthly_budget_cents,
            daily_request_limit: defaults.daily_request_limit,
            cost_today_cents: 0.0,
            cost_this_month_cents: 0.0,
            requests_today: 0,
            tokens_used_this_month: 0,
            hard_stop: defaults.hard_stop,
            warning_threshold_percent: defaults.warning_threshold_percent,
            daily_reset_at: now,
            monthly_reset_at: now,
            last_warning_notified_at: None,
            last_limit_notified_at: None,
        }
    }

    pub fn utilization(&self) -> Utilization {
        Utilization {
            daily_percent: percent(self.cost_today_cents, self.daily_budget_cents),
            monthly_percent: percent(self.cost_this_month_cents, self.monthly_budget_cents),
        }
    }

    /// First limit this counter is at or over, as a denial reason
    pub fn exceeded_limit(&self) -> Option<&'static str> {
        if self.daily_budget_cents > 0.0 && self.cost_today_cents >= self.daily_budget_cents {
            Some(DAILY_BUDGET_EXCEEDED)
        } else if self.monthly_budget_cents > 0.0
            && self.cost_this_month_cents >= self.monthly_budget_cents
        {
            Some(MONTHLY_BUDGET_EXCEEDED)
        } else if self.daily_request_limit > 0 && self.requests_today >= self.daily_request_limit {
            Some(DAILY_REQUEST_LIMIT_EXCEEDED)
        } else {
            None
        }
    }

    /// Apply administrative overrides
    pub fn apply_limits(&mut self, limits: &TenantLimits) {
        if let Some(v) = limits.daily_budget_cents {
            self.daily_budget_cents = v;
        }
        if let Some(v) = limits.monthly_budget_cents {
            self.monthly_budget_cents = v;
        }
        if let Some(v) = limits.daily_request_limit {
            self.daily_request_limit = v;
        }
        if let Some(v) = limits.hard_stop {
            self.hard_stop = v;
        }
        if let Some(v) = limits.warning_threshold_percent {
            self.warning_threshold_percent = v;
        }
    }
}

pub const DAILY_BUDGET_EXCEEDED: &str = "daily budget exceeded";
pub const MONTHLY_BUDGET_EXCEEDED: &str = "monthly budget exceeded";
pub const DAILY_REQUEST_LIMIT_EXCEEDED: &str = "daily request limit exceeded";

fn percent(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        0.0
    } else {
        used / limit * 100.0
    }
}

/// Spend as a share of each budget
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub daily_percent: f64,
    pub monthly_percent: f64,
}

impl Utilization {
    pub fn max_percent(&self) -> f64 {
        self.daily_percent.max(self.monthly_percent)
    }
}

/// Administrative per-tenant overrides; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantLimits {
    #[serde(default)]
    pub daily_budget_cents: Option<f64>,
    #[serde(default)]
    pub monthly_budget_cents: Option<f64>,
    #[serde(default)]
    pub daily_request_limit: Option<u64>,
    #[serde(default)]
    pub hard_stop: Option<bool>,
    #[serde(default)]
    pub warning_threshold_percent: Option<f64>,
}

/// Atomic counter increment for one successful call
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterDelta {
    pub cost_cents: f64,
    pub requests: u64,
    pub tokens: u64,
}

impl CounterDelta {
    /// Deltas never decrease a counter
    pub fn clamped(self) -> Self {
        Self {
            cost_cents: if self.cost_cents.is_finite() {
                self.cost_cents.max(0.0)
            } else {
                0.0
            },
            ..self
        }
    }
}

/// Append-only record of one gateway call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub tenant_id: String,
    /// Provider that served or last failed; `None` when no provider was called
    pub provider: Option<String>,
    pub model: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub messages: u64,
    pub cost_cents: f64,
    pub status: UsageStatus,
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// What the gateway reports after a call
#[derive(Debug, Clone, PartialEq)]
pub struct UsageInput {
    pub tenant_id: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub units: UsageUnits,
    pub status: UsageStatus,
    pub latency_ms: u64,
}

/// Admission decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub allowed: bool,
    pub reason: Option<String>,
    pub warning: Option<String>,
    pub utilization: Utilization,
    pub estimated_cost_cents: f64,
}

impl BudgetCheck {
    /// Internal failure: allow, and say why
    pub fn fail_open(error: impl fmt::Display) -> Self {
        Self {
            allowed: true,
            reason: None,
            warning: Some(format!("Budget check unavailable, request allowed: {}", error)),
            utilization: Utilization::default(),
            estimated_cost_cents: 0.0,
        }
    }
}

/// A hard-stop denial
#[derive(Debug, Clone, PartialEq, Error)]
#[error("budget denied: {reason}")]
pub struct BudgetDenied {
    pub reason: String,
    pub utilization: Utilization,
}

/// Which notification timestamp a notification claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Warning,
    Limit,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationKind::Warning => "warning",
            NotificationKind::Limit => "limit",
        })
    }
}
