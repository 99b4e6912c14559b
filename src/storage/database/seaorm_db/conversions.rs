//! Row and domain type conversions

use crate::core::budget::{BudgetCounter, UsageRecord, UsageStatus};
use crate::utils::error::{GatewayError, Result};
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;

use super::super::entities::{budget_counter, usage_record};

pub(super) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(super) fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

pub(super) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| GatewayError::storage(format!("Invalid timestamp: {}", ms)))
}

pub(super) fn counter_from_row(row: budget_counter::Model) -> Result<BudgetCounter> {
    Ok(BudgetCounter {
        daily_reset_at: from_millis(row.daily_reset_ms)?,
        monthly_reset_at: from_millis(row.monthly_reset_ms)?,
        last_warning_notified_at: row.last_warning_notified_ms.map(from_millis).transpose()?,
        last_limit_notified_at: row.last_limit_notified_ms.map(from_millis).transpose()?,
        tenant_id: row.tenant_id,
        daily_budget_cents: row.daily_budget_cents,
        monthly_budget_cents: row.monthly_budget_cents,
        daily_request_limit: to_u64(row.daily_request_limit),
        cost_today_cents: row.cost_today_cents,
        cost_this_month_cents: row.cost_this_month_cents,
        requests_today: to_u64(row.requests_today),
        tokens_used_this_month: to_u64(row.tokens_used_this_month),
        hard_stop: row.hard_stop,
        warning_threshold_percent: row.warning_threshold_percent,
    })
}

pub(super) fn counter_to_active(tenant_id: &str, counter: &BudgetCounter) -> budget_counter::ActiveModel {
    budget_counter::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        daily_budget_cents: Set(counter.daily_budget_cents),
        monthly_budget_cents: Set(counter.monthly_budget_cents),
        daily_request_limit: Set(to_i64(counter.daily_request_limit)),
        cost_today_cents: Set(counter.cost_today_cents),
        cost_this_month_cents: Set(counter.cost_this_month_cents),
        requests_today: Set(to_i64(counter.requests_today)),
        tokens_used_this_month: Set(to_i64(counter.tokens_used_this_month)),
        hard_stop: Set(counter.hard_stop),
        warning_threshold_percent: Set(counter.warning_threshold_percent),
        daily_reset_ms: Set(counter.daily_reset_at.timestamp_millis()),
        monthly_reset_ms: Set(counter.monthly_reset_at.timestamp_millis()),
        last_warning_notified_ms: Set(counter.last_warning_notified_at.map(|t| t.timestamp_millis())),
        last_limit_notified_ms: Set(counter.last_limit_notified_at.map(|t| t.timestamp_millis())),
    }
}

pub(super) fn record_from_row(row: usage_record::Model) -> Result<UsageRecord> {
    let status = row
        .status
        .parse::<UsageStatus>()
        .map_err(GatewayError::storage)?;
    Ok(UsageRecord {
        id: row.id,
        tenant_id: row.tenant_id,
        provider: row.provider,
        model: row.model,
        input_tokens: to_u64(row.input_tokens),
        output_tokens: to_u64(row.output_tokens),
        messages: to_u64(row.messages),
        cost_cents: row.cost_cents,
        status,
        latency_ms: to_u64(row.latency_ms),
        created_at: row.created_at,
    })
}

pub(super) fn record_to_active(record: &UsageRecord) -> usage_record::ActiveModel {
    usage_record::ActiveModel {
        id: Set(record.id),
        tenant_id: Set(record.tenant_id.clone()),
        provider: Set(record.provider.clone()),
        model: Set(record.model.clone()),
        input_tokens: Set(to_i64(record.input_tokens)),
        output_tokens: Set(to_i64(record.output_tokens)),
        messages: Set(to_i64(record.messages)),
        cost_cents: Set(record.cost_cents),
        status: Set(record.status.as_str().to_string()),
        latency_ms: Set(to_i64(record.latency_ms)),
        created_at: Set(record.created_at),
    }
}
