//! Usage record entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_type = "String(StringLen::N(128))")]
    pub tenant_id: String,
    #[sea_orm(column_type = "String(StringLen::N(64))", nullable)]
    pub provider: Option<String>,
    #[sea_orm(nullable)]
    pub model: Option<String>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub messages: i64,
    pub cost_cents: f64,
    /// SUCCESS, FAILED, BLOCKED or RATE_LIMITED
    #[sea_orm(column_type = "String(StringLen::N(20))")]
    pub status: String,
    pub latency_ms: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
