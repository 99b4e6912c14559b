//! Budget store backed by SQL
//!
//! Increments are `SET col = col + ?` and resets are `UPDATE ... WHERE
//! reset_ms = ?`, so several gateway instances can share the tables.

use crate::core::budget::{
    BudgetCounter, BudgetStore, CounterDelta, NotificationKind, TenantLimits, UsageRecord,
};
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;
use tracing::debug;

use super::super::entities::{self, budget_counter, usage_record};
use super::conversions::{
    counter_from_row, counter_to_active, record_from_row, record_to_active, to_i64,
};
use super::types::SeaOrmDatabase;

impl SeaOrmDatabase {
    async fn find_counter(&self, tenant_id: &str) -> Result<Option<BudgetCounter>> {
        entities::BudgetCounter::find_by_id(tenant_id.to_string())
            .one(&self.db)
            .await
            .map_err(GatewayError::Database)?
            .map(counter_from_row)
            .transpose()
    }

    async fn insert_counter_if_absent(&self, tenant_id: &str, template: &BudgetCounter) -> Result<()> {
        let inserted = entities::BudgetCounter::insert(counter_to_active(tenant_id, template))
            .on_conflict(
                OnConflict::column(budget_counter::Column::TenantId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(GatewayError::Database)?;
        if inserted > 0 {
            debug!(tenant = tenant_id, "Budget counter created");
        }
        Ok(())
    }
}

#[async_trait]
impl BudgetStore for SeaOrmDatabase {
    async fn load_or_create(
        &self,
        tenant_id: &str,
        template: &BudgetCounter,
    ) -> Result<BudgetCounter> {
        if let Some(counter) = self.find_counter(tenant_id).await? {
            return Ok(counter);
        }
        self.insert_counter_if_absent(tenant_id, template).await?;
        self.find_counter(tenant_id)
            .await?
            .ok_or_else(|| GatewayError::storage(format!("Budget counter for {} vanished", tenant_id)))
    }

    async fn reset_daily(
        &self,
        tenant_id: &str,
        expected: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = entities::BudgetCounter::update_many()
            .col_expr(budget_counter::Column::CostTodayCents, Expr::value(0.0_f64))
            .col_expr(budget_counter::Column::RequestsToday, Expr::value(0_i64))
            .col_expr(
                budget_counter::Column::DailyResetMs,
                Expr::value(now.timestamp_millis()),
            )
            .filter(budget_counter::Column::TenantId.eq(tenant_id))
            .filter(budget_counter::Column::DailyResetMs.eq(expected.timestamp_millis()))
            .exec(&self.db)
            .await
            .map_err(GatewayError::Database)?;
        Ok(result.rows_affected == 1)
    }

    async fn reset_monthly(
        &self,
        tenant_id: &str,
        expected: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = entities::BudgetCounter::update_many()
            .col_expr(budget_counter::Column::CostThisMonthCents, Expr::value(0.0_f64))
            .col_expr(budget_counter::Column::TokensUsedThisMonth, Expr::value(0_i64))
            .col_expr(
                budget_counter::Column::LastWarningNotifiedMs,
                Expr::value(Option::<i64>::None),
            )
            .col_expr(
                budget_counter::Column::LastLimitNotifiedMs,
                Expr::value(Option::<i64>::None),
            )
            .col_expr(
                budget_counter::Column::MonthlyResetMs,
                Expr::value(now.timestamp_millis()),
            )
            .filter(budget_counter::Column::TenantId.eq(tenant_id))
            .filter(budget_counter::Column::MonthlyResetMs.eq(expected.timestamp_millis()))
            .exec(&self.db)
            .await
            .map_err(GatewayError::Database)?;
        Ok(result.rows_affected == 1)
    }

    async fn persist_usage_record(&self, record: &UsageRecord) -> Result<()> {
        entities::UsageRecord::insert(record_to_active(record))
            .exec_without_returning(&self.db)
            .await
            .map_err(GatewayError::Database)?;
        Ok(())
    }

    async fn persist_counter_increment(&self, tenant_id: &str, delta: CounterDelta) -> Result<()> {
        let delta = delta.clamped();
        entities::BudgetCounter::update_many()
            .col_expr(
                budget_counter::Column::CostTodayCents,
                Expr::col(budget_counter::Column::CostTodayCents).add(delta.cost_cents),
            )
            .col_expr(
                budget_counter::Column::CostThisMonthCents,
                Expr::col(budget_counter::Column::CostThisMonthCents).add(delta.cost_cents),
            )
            .col_expr(
                budget_counter::Column::RequestsToday,
                Expr::col(budget_counter::Column::RequestsToday).add(to_i64(delta.requests)),
            )
            .col_expr(
                budget_counter::Column::TokensUsedThisMonth,
                Expr::col(budget_counter::Column::TokensUsedThisMonth).add(to_i64(delta.tokens)),
            )
            .filter(budget_counter::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await
            .map_err(GatewayError::Database)?;
        Ok(())
    }

    async fn claim_notification(
        &self,
        tenant_id: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
        min_interval: Duration,
    ) -> Result<bool> {
        let column = match kind {
            NotificationKind::Warning => budget_counter::Column::LastWarningNotifiedMs,
            NotificationKind::Limit => budget_counter::Column::LastLimitNotifiedMs,
        };
        let cutoff = now.timestamp_millis() - min_interval.num_milliseconds();
        let result = entities::BudgetCounter::update_many()
            .col_expr(column, Expr::value(Some(now.timestamp_millis())))
            .filter(budget_counter::Column::TenantId.eq(tenant_id))
            .filter(
                Condition::any()
                    .add(column.is_null())
                    .add(column.lte(cutoff)),
            )
            .exec(&self.db)
            .await
            .map_err(GatewayError::Database)?;
        Ok(result.rows_affected == 1)
    }

    async fn configure_tenant(
        &self,
        tenant_id: &str,
        limits: &TenantLimits,
        template: &BudgetCounter,
    ) -> Result<BudgetCounter> {
        self.insert_counter_if_absent(tenant_id, template).await?;

        let mut update = entities::BudgetCounter::update_many()
            .filter(budget_counter::Column::TenantId.eq(tenant_id));
        let mut changed = false;
        if let Some(v) = limits.daily_budget_cents {
            update = update.col_expr(budget_counter::Column::DailyBudgetCents, Expr::value(v));
            changed = true;
        }
        if let Some(v) = limits.monthly_budget_cents {
            update = update.col_expr(budget_counter::Column::MonthlyBudgetCents, Expr::value(v));
            changed = true;
        }
        if let Some(v) = limits.daily_request_limit {
            update = update.col_expr(
                budget_counter::Column::DailyRequestLimit,
                Expr::value(to_i64(v)),
            );
            changed = true;
        }
        if let Some(v) = limits.hard_stop {
            update = update.col_expr(budget_counter::Column::HardStop, Expr::value(v));
            changed = true;
        }
        if let Some(v) = limits.warning_threshold_percent {
            update = update.col_expr(
                budget_counter::Column::WarningThresholdPercent,
                Expr::value(v),
            );
            changed = true;
        }
        if changed {
            update.exec(&self.db).await.map_err(GatewayError::Database)?;
        }

        self.find_counter(tenant_id)
            .await?
            .ok_or_else(|| GatewayError::not_found(format!("Budget counter for {}", tenant_id)))
    }

    async fn usage_records(&self, tenant_id: &str) -> Result<Vec<UsageRecord>> {
        entities::UsageRecord::find()
            .filter(usage_record::Column::TenantId.eq(tenant_id))
            .order_by_asc(usage_record::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(GatewayError::Database)?
            .into_iter()
            .map(record_from_row)
            .collect()
    }
}
