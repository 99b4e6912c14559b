//! Budget governance integration tests
//!
//! Exercise admission, metering and window resets through the gateway, on both
//! the in-memory store and SQLite.

#[cfg(test)]
mod tests {
    use crate::common::assertions::{assert_cents, usage_statuses};
    use crate::common::fixtures::{self, completion, TENANT};
    use crate::common::{Scripts, TestDatabase};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use parking_lot::Mutex;
    use provider_gateway::config::{BudgetConfig, ProviderDescriptor};
    use provider_gateway::core::budget::{
        BudgetCounter, BudgetNotification, BudgetNotifier, BudgetStore, CounterDelta,
        InMemoryBudgetStore, NotificationKind, TenantLimits, UsageStatus,
    };
    use provider_gateway::{GatewayBuilder, GatewayCallError};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<BudgetNotification>>,
    }

    #[async_trait]
    impl BudgetNotifier for RecordingNotifier {
        async fn notify(&self, notification: &BudgetNotification) {
            self.sent.lock().push(notification.clone());
        }
    }

    fn providers() -> Vec<ProviderDescriptor> {
        vec![
            ProviderDescriptor::openai_compatible("openai", "sk-1"),
            ProviderDescriptor::openai_compatible("claude", "sk-2"),
        ]
    }

    fn counter_with_spend(cost_today_cents: f64, hard_stop: bool) -> BudgetCounter {
        let mut counter = BudgetCounter::new(
            TENANT,
            &BudgetConfig {
                daily_budget_cents: 1_000.0,
                monthly_budget_cents: 20_000.0,
                hard_stop,
                ..Default::default()
            },
            Utc::now(),
        );
        counter.cost_today_cents = cost_today_cents;
        counter.cost_this_month_cents = cost_today_cents;
        counter
    }

    // ==================== Admission Tests ====================

    #[tokio::test]
    async fn test_warning_above_threshold_still_allows() {
        let scripts = Scripts::new();
        let store = Arc::new(InMemoryBudgetStore::new());
        store.insert_counter(counter_with_spend(850.0, true));
        let gateway = fixtures::gateway_with_store(
            fixtures::gateway_config(providers()),
            &scripts,
            store.clone(),
        )
        .await;

        let response = gateway.call(TENANT, &completion(), None).await.unwrap();

        let warning = response.audit.budget_warning.expect("warning attached");
        assert!(warning.contains("85.0%"), "unexpected warning: {}", warning);
        assert_eq!(response.audit.utilization.unwrap().daily_percent, 85.0);
        assert_eq!(scripts.calls("openai"), 1);
    }

    #[tokio::test]
    async fn test_hard_stop_blocks_before_any_provider_call() {
        let scripts = Scripts::new();
        let store = Arc::new(InMemoryBudgetStore::new());
        store.insert_counter(counter_with_spend(1_005.0, true));
        let gateway = fixtures::gateway_with_store(
            fixtures::gateway_config(providers()),
            &scripts,
            store.clone(),
        )
        .await;

        let err = gateway.call(TENANT, &completion(), None).await.unwrap_err();

        assert_eq!(err.code(), "BUDGET_DENIED");
        match &err {
            GatewayCallError::BudgetDenied { reason, audit } => {
                assert_eq!(reason, "daily budget exceeded");
                assert!(audit.attempted_providers.is_empty());
                assert_eq!(audit.usage_status, UsageStatus::Blocked);
            }
            other => panic!("expected a budget denial, got {:?}", other),
        }
        assert_eq!(scripts.total_calls(), 0);
        assert_eq!(
            usage_statuses(store.as_ref(), TENANT).await,
            vec![UsageStatus::Blocked]
        );
        let counter = store.load_or_create(TENANT, &counter_with_spend(0.0, true)).await.unwrap();
        assert_eq!(counter.requests_today, 0);
    }

    #[tokio::test]
    async fn test_soft_mode_allows_over_limit_with_warning() {
        let scripts = Scripts::new();
        let store = Arc::new(InMemoryBudgetStore::new());
        store.insert_counter(counter_with_spend(1_200.0, false));
        let gateway = fixtures::gateway_with_store(
            fixtures::gateway_config(providers()),
            &scripts,
            store.clone(),
        )
        .await;

        let response = gateway.call(TENANT, &completion(), None).await.unwrap();

        let warning = response.audit.budget_warning.unwrap();
        assert!(warning.contains("daily budget exceeded"));
        assert_eq!(scripts.calls("openai"), 1);
    }

    #[tokio::test]
    async fn test_daily_reset_happens_before_admission() {
        let scripts = Scripts::new();
        let store = Arc::new(InMemoryBudgetStore::new());
        let mut stale = counter_with_spend(5_000.0, true);
        stale.daily_reset_at = Utc::now() - Duration::days(1);
        stale.requests_today = 42;
        store.insert_counter(stale);
        let gateway = fixtures::gateway_with_store(
            fixtures::gateway_config(providers()),
            &scripts,
            store.clone(),
        )
        .await;

        gateway.call(TENANT, &completion(), None).await.unwrap();

        let counter = gateway.budget().counter(TENANT).await.unwrap();
        assert_cents(counter.cost_today_cents, 2.0);
        assert_eq!(counter.requests_today, 1);
    }

    #[tokio::test]
    async fn test_warning_notification_is_throttled() {
        let scripts = Scripts::new();
        let store = Arc::new(InMemoryBudgetStore::new());
        store.insert_counter(counter_with_spend(900.0, true));
        let notifier = Arc::new(RecordingNotifier::default());
        let gateway = GatewayBuilder::new(fixtures::gateway_config(providers()))
            .with_factory(scripts.factory())
            .with_budget_store(store.clone())
            .with_notifier(notifier.clone())
            .with_retry_policy(fixtures::policy())
            .build()
            .await
            .unwrap();

        for _ in 0..5 {
            let response = gateway.call(TENANT, &completion(), None).await.unwrap();
            assert!(response.audit.budget_warning.is_some());
        }

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Warning);
        assert_eq!(sent[0].tenant_id, TENANT);
    }

    // ==================== SQL-backed Tests ====================

    #[tokio::test]
    async fn test_calls_are_metered_in_sql() {
        let db = TestDatabase::new().await;
        let scripts = Scripts::new();
        scripts.always_fail("openai", fixtures::unauthorized());
        let gateway = fixtures::gateway_with_store(
            fixtures::gateway_config(providers()),
            &scripts,
            db.db_arc(),
        )
        .await;

        let response = gateway.call(TENANT, &completion(), None).await.unwrap();
        assert_eq!(response.used_provider, "claude");
        assert_cents(response.audit.cost_cents, 2.0);

        let counter = gateway.budget().counter(TENANT).await.unwrap();
        assert_cents(counter.cost_today_cents, 2.0);
        assert_cents(counter.cost_this_month_cents, 2.0);
        assert_eq!(counter.requests_today, 1);
        assert_eq!(counter.tokens_used_this_month, 1_500);

        let records = db.db().usage_records(TENANT).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, UsageStatus::Success);
        assert_eq!(records[0].provider.as_deref(), Some("claude"));
    }

    #[tokio::test]
    async fn test_sql_threshold_warning_after_configuration() {
        let db = TestDatabase::new().await;
        let scripts = Scripts::new();
        let gateway = fixtures::gateway_with_store(
            fixtures::gateway_config(providers()),
            &scripts,
            db.db_arc(),
        )
        .await;

        gateway
            .budget()
            .configure_tenant(
                TENANT,
                &TenantLimits {
                    daily_budget_cents: Some(1_000.0),
                    warning_threshold_percent: Some(80.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        db.db()
            .persist_counter_increment(
                TENANT,
                CounterDelta {
                    cost_cents: 850.0,
                    requests: 10,
                    tokens: 0,
                },
            )
            .await
            .unwrap();

        let check = gateway
            .budget()
            .check_budget(TENANT, &completion().estimated_units(), Some("openai"), None)
            .await;
        assert!(check.allowed);
        assert!(check.warning.unwrap().contains("85.0%"));
    }

    #[tokio::test]
    async fn test_sql_hard_stop_records_blocked_call() {
        let db = TestDatabase::new().await;
        let scripts = Scripts::new();
        let gateway = fixtures::gateway_with_store(
            fixtures::gateway_config(providers()),
            &scripts,
            db.db_arc(),
        )
        .await;
        gateway
            .budget()
            .configure_tenant(
                TENANT,
                &TenantLimits {
                    daily_request_limit: Some(2),
                    hard_stop: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        gateway.call(TENANT, &completion(), None).await.unwrap();
        gateway.call(TENANT, &completion(), None).await.unwrap();
        let err = gateway.call(TENANT, &completion(), None).await.unwrap_err();

        assert!(matches!(err, GatewayCallError::BudgetDenied { ref reason, .. } if reason == "daily request limit exceeded"));
        assert_eq!(scripts.total_calls(), 2);
        assert_eq!(
            usage_statuses(db.db(), TENANT).await,
            vec![UsageStatus::Success, UsageStatus::Success, UsageStatus::Blocked]
        );
    }
}
