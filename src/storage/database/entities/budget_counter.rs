//! Budget counter entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per tenant. Window stamps are epoch milliseconds so conditional
/// resets compare exactly on every backend.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: String,
    pub daily_budget_cents: f64,
    pub monthly_budget_cents: f64,
    pub daily_request_limit: i64,
    pub cost_today_cents: f64,
    pub cost_this_month_cents: f64,
    pub requests_today: i64,
    pub tokens_used_this_month: i64,
    pub hard_stop: bool,
    pub warning_threshold_percent: f64,
    pub daily_reset_ms: i64,
    pub monthly_reset_ms: i64,
    pub last_warning_notified_ms: Option<i64>,
    pub last_limit_notified_ms: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
