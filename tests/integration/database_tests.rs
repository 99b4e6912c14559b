//! SQL budget store integration tests
//!
//! Run against migrated in-memory SQLite databases.

#[cfg(test)]
mod tests {
    use crate::common::assertions::assert_cents;
    use crate::common::TestDatabase;
    use chrono::{Duration, TimeZone, Utc};
    use provider_gateway::config::BudgetConfig;
    use provider_gateway::core::budget::{
        BudgetCounter, BudgetStore, CounterDelta, NotificationKind, TenantLimits, UsageRecord,
        UsageStatus,
    };
    use std::sync::Arc;
    use uuid::Uuid;

    fn template(tenant: &str) -> BudgetCounter {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
        BudgetCounter::new(tenant, &BudgetConfig::default(), now)
    }

    fn record(tenant: &str, status: UsageStatus, minutes: i64) -> UsageRecord {
        UsageRecord {
            id: Uuid::new_v4(),
            tenant_id: tenant.to_string(),
            provider: Some("openai".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            input_tokens: 1_000,
            output_tokens: 500,
            messages: 0,
            cost_cents: 2.0,
            status,
            latency_ms: 120,
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    // ==================== Connection Tests ====================

    #[tokio::test]
    async fn test_database_connection() {
        let db = TestDatabase::new().await;
        assert!(db.db().health_check().await.is_ok());
        assert!(db.db().is_sqlite());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = TestDatabase::new().await;
        assert!(db.db().migrate().await.is_ok());
    }

    // ==================== Counter Tests ====================

    #[tokio::test]
    async fn test_load_or_create_persists_template_once() {
        let db = TestDatabase::new().await;
        let store = db.db();

        let created = store.load_or_create("acme", &template("acme")).await.unwrap();
        assert_eq!(created.tenant_id, "acme");
        assert_eq!(created.daily_budget_cents, 10_000.0);
        assert_eq!(created.daily_reset_at, template("acme").daily_reset_at);

        let mut other = template("acme");
        other.daily_budget_cents = 1.0;
        let loaded = store.load_or_create("acme", &other).await.unwrap();
        assert_eq!(loaded.daily_budget_cents, 10_000.0);
    }

    #[tokio::test]
    async fn test_increments_accumulate() {
        let db = TestDatabase::new().await;
        let store = db.db();
        store.load_or_create("acme", &template("acme")).await.unwrap();

        for _ in 0..3 {
            store
                .persist_counter_increment(
                    "acme",
                    CounterDelta {
                        cost_cents: 2.5,
                        requests: 1,
                        tokens: 1_500,
                    },
                )
                .await
                .unwrap();
        }

        let counter = store.load_or_create("acme", &template("acme")).await.unwrap();
        assert_cents(counter.cost_today_cents, 7.5);
        assert_cents(counter.cost_this_month_cents, 7.5);
        assert_eq!(counter.requests_today, 3);
        assert_eq!(counter.tokens_used_this_month, 4_500);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let db = TestDatabase::new().await;
        let store = db.db_arc();
        store.load_or_create("acme", &template("acme")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .persist_counter_increment(
                        "acme",
                        CounterDelta {
                            cost_cents: 1.0,
                            requests: 1,
                            tokens: 10,
                        },
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let counter = store.load_or_create("acme", &template("acme")).await.unwrap();
        assert_cents(counter.cost_today_cents, 20.0);
        assert_eq!(counter.requests_today, 20);
    }

    #[tokio::test]
    async fn test_daily_reset_happens_once_per_boundary() {
        let db = TestDatabase::new().await;
        let store = db.db();
        let counter = store.load_or_create("acme", &template("acme")).await.unwrap();
        store
            .persist_counter_increment(
                "acme",
                CounterDelta {
                    cost_cents: 40.0,
                    requests: 4,
                    tokens: 100,
                },
            )
            .await
            .unwrap();

        let next_day = counter.daily_reset_at + Duration::days(1);
        assert!(store.reset_daily("acme", counter.daily_reset_at, next_day).await.unwrap());
        // Second instance saw the same stale stamp
        assert!(!store.reset_daily("acme", counter.daily_reset_at, next_day).await.unwrap());

        let after = store.load_or_create("acme", &template("acme")).await.unwrap();
        assert_eq!(after.cost_today_cents, 0.0);
        assert_eq!(after.requests_today, 0);
        assert_eq!(after.daily_reset_at, next_day);
        // Monthly fields untouched
        assert_cents(after.cost_this_month_cents, 40.0);
        assert_eq!(after.tokens_used_this_month, 100);
    }

    #[tokio::test]
    async fn test_monthly_reset_clears_notification_stamps() {
        let db = TestDatabase::new().await;
        let store = db.db();
        let counter = store.load_or_create("acme", &template("acme")).await.unwrap();
        let now = counter.daily_reset_at;

        assert!(
            store
                .claim_notification("acme", NotificationKind::Warning, now, Duration::hours(1))
                .await
                .unwrap()
        );
        store
            .persist_counter_increment(
                "acme",
                CounterDelta {
                    cost_cents: 90.0,
                    requests: 1,
                    tokens: 10,
                },
            )
            .await
            .unwrap();

        let next_month = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 1).unwrap();
        assert!(store.reset_monthly("acme", counter.monthly_reset_at, next_month).await.unwrap());
        assert!(!store.reset_monthly("acme", counter.monthly_reset_at, next_month).await.unwrap());

        let after = store.load_or_create("acme", &template("acme")).await.unwrap();
        assert_eq!(after.cost_this_month_cents, 0.0);
        assert_eq!(after.tokens_used_this_month, 0);
        assert_eq!(after.last_warning_notified_at, None);
        assert_eq!(after.monthly_reset_at, next_month);
    }

    #[tokio::test]
    async fn test_notification_claim_is_throttled() {
        let db = TestDatabase::new().await;
        let store = db.db();
        let counter = store.load_or_create("acme", &template("acme")).await.unwrap();
        let now = counter.daily_reset_at;
        let interval = Duration::hours(1);

        assert!(store.claim_notification("acme", NotificationKind::Limit, now, interval).await.unwrap());
        assert!(
            !store
                .claim_notification("acme", NotificationKind::Limit, now + Duration::minutes(30), interval)
                .await
                .unwrap()
        );
        // Kinds are throttled independently
        assert!(store.claim_notification("acme", NotificationKind::Warning, now, interval).await.unwrap());
        assert!(
            store
                .claim_notification("acme", NotificationKind::Limit, now + Duration::minutes(61), interval)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_configure_tenant_only_touches_given_limits() {
        let db = TestDatabase::new().await;
        let store = db.db();

        let limits = TenantLimits {
            daily_budget_cents: Some(500.0),
            hard_stop: Some(true),
            ..Default::default()
        };
        let counter = store
            .configure_tenant("acme", &limits, &template("acme"))
            .await
            .unwrap();

        assert_eq!(counter.daily_budget_cents, 500.0);
        assert!(counter.hard_stop);
        assert_eq!(counter.monthly_budget_cents, 200_000.0);
        assert_eq!(counter.warning_threshold_percent, 80.0);
    }

    // ==================== Usage Record Tests ====================

    #[tokio::test]
    async fn test_usage_records_are_append_only_and_ordered() {
        let db = TestDatabase::new().await;
        let store = db.db();

        store.persist_usage_record(&record("acme", UsageStatus::Failed, 5)).await.unwrap();
        store.persist_usage_record(&record("acme", UsageStatus::Success, 1)).await.unwrap();
        store.persist_usage_record(&record("globex", UsageStatus::Blocked, 0)).await.unwrap();

        let records = store.usage_records("acme").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, UsageStatus::Success);
        assert_eq!(records[1].status, UsageStatus::Failed);
        assert_eq!(records[0].provider.as_deref(), Some("openai"));
        assert_eq!(records[0].input_tokens, 1_000);
        assert_cents(records[0].cost_cents, 2.0);

        assert_eq!(store.usage_records("globex").await.unwrap().len(), 1);
        assert!(store.usage_records("initech").await.unwrap().is_empty());
    }
}
