//! Budget counter and usage record tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BudgetCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetCounters::TenantId)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetCounters::DailyBudgetCents).double().not_null())
                    .col(ColumnDef::new(BudgetCounters::MonthlyBudgetCents).double().not_null())
                    .col(ColumnDef::new(BudgetCounters::DailyRequestLimit).big_integer().not_null())
                    .col(
                        ColumnDef::new(BudgetCounters::CostTodayCents)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(BudgetCounters::CostThisMonthCents)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(BudgetCounters::RequestsToday)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BudgetCounters::TokensUsedThisMonth)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BudgetCounters::HardStop)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BudgetCounters::WarningThresholdPercent)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BudgetCounters::DailyResetMs).big_integer().not_null())
                    .col(ColumnDef::new(BudgetCounters::MonthlyResetMs).big_integer().not_null())
                    .col(ColumnDef::new(BudgetCounters::LastWarningNotifiedMs).big_integer())
                    .col(ColumnDef::new(BudgetCounters::LastLimitNotifiedMs).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UsageRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsageRecords::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(UsageRecords::TenantId).string_len(128).not_null())
                    .col(ColumnDef::new(UsageRecords::Provider).string_len(64))
                    .col(ColumnDef::new(UsageRecords::Model).string())
                    .col(ColumnDef::new(UsageRecords::InputTokens).big_integer().not_null())
                    .col(ColumnDef::new(UsageRecords::OutputTokens).big_integer().not_null())
                    .col(ColumnDef::new(UsageRecords::Messages).big_integer().not_null())
                    .col(ColumnDef::new(UsageRecords::CostCents).double().not_null())
                    .col(ColumnDef::new(UsageRecords::Status).string_len(20).not_null())
                    .col(ColumnDef::new(UsageRecords::LatencyMs).big_integer().not_null())
                    .col(
                        ColumnDef::new(UsageRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_records_tenant_created")
                    .table(UsageRecords::Table)
                    .col(UsageRecords::TenantId)
                    .col(UsageRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_records_status")
                    .table(UsageRecords::Table)
                    .col(UsageRecords::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetCounters::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum BudgetCounters {
    Table,
    TenantId,
    DailyBudgetCents,
    MonthlyBudgetCents,
    DailyRequestLimit,
    CostTodayCents,
    CostThisMonthCents,
    RequestsToday,
    TokensUsedThisMonth,
    HardStop,
    WarningThresholdPercent,
    DailyResetMs,
    MonthlyResetMs,
    LastWarningNotifiedMs,
    LastLimitNotifiedMs,
}

#[derive(Iden)]
enum UsageRecords {
    Table,
    Id,
    TenantId,
    Provider,
    Model,
    InputTokens,
    OutputTokens,
    Messages,
    CostCents,
    Status,
    LatencyMs,
    CreatedAt,
}
