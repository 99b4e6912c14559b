//! Failover and circuit breaker integration tests
//!
//! Backoff timing runs on paused tokio time. Circuit recovery uses wall-clock
//! time, so those tests run with a short recovery window instead.

#[cfg(test)]
mod tests {
    use crate::common::fixtures::{self, completion, server_error, unauthorized};
    use crate::common::Scripts;
    use provider_gateway::config::CircuitBreakerConfig;
    use provider_gateway::core::health::CircuitState;
    use provider_gateway::core::router::{FailoverExecutor, ProviderAttempt};
    use provider_gateway::AdapterErrorCode;
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    fn fast_recovery() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_window_ms: 100,
        }
    }

    // ==================== Failover Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_primary_outage_fails_over_after_backoff() {
        let scripts = Scripts::new();
        scripts.always_fail("primary", server_error());
        let (executor, registry) = fixtures::executor(
            &fixtures::three_providers(),
            &scripts,
            &CircuitBreakerConfig::default(),
        )
        .await;
        let started = Instant::now();

        let outcome = executor
            .execute(&completion(), &registry.ordered_providers(None), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.used_provider, "secondary");
        assert!(outcome.was_failover);
        assert_eq!(outcome.response.payload["provider"], "secondary");
        assert_eq!(outcome.attempted_providers(), vec!["primary", "secondary"]);
        assert_eq!(scripts.calls("primary"), 3);
        assert_eq!(scripts.calls("tertiary"), 0);
        assert_eq!(started.elapsed(), Duration::from_millis(300));

        let primary = executor.tracker().state("primary").await.unwrap();
        assert_eq!(primary.consecutive_failures, 1);
        assert!(!primary.circuit_open);
        let secondary = executor.tracker().state("secondary").await.unwrap();
        assert!(secondary.last_success_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_fails_over_immediately() {
        let scripts = Scripts::new();
        scripts.always_fail("primary", unauthorized());
        let (executor, registry) = fixtures::executor(
            &fixtures::three_providers(),
            &scripts,
            &CircuitBreakerConfig::default(),
        )
        .await;
        let started = Instant::now();

        let outcome = executor
            .execute(&completion(), &registry.ordered_providers(None), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.used_provider, "secondary");
        assert_eq!(scripts.calls("primary"), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        match &outcome.attempts[0] {
            ProviderAttempt::Failed { error, attempts, .. } => {
                assert_eq!(*attempts, 1);
                assert_eq!(error.code, AdapterErrorCode::Unauthorized);
                assert!(!error.retryable);
            }
            other => panic!("expected a failed attempt, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_are_retried_then_failed_over() {
        let scripts = Scripts::new();
        scripts.delay("primary", Duration::from_secs(120));
        let (executor, registry) = fixtures::executor(
            &fixtures::three_providers(),
            &scripts,
            &CircuitBreakerConfig::default(),
        )
        .await;

        let outcome = executor
            .execute(&completion(), &registry.ordered_providers(None), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.used_provider, "secondary");
        assert_eq!(scripts.calls("primary"), 3);
        match &outcome.attempts[0] {
            ProviderAttempt::Failed { error, .. } => {
                assert_eq!(error.code, AdapterErrorCode::Timeout);
            }
            other => panic!("expected a failed attempt, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_provider_failing_reports_last_error() {
        let scripts = Scripts::new();
        for code in ["primary", "secondary", "tertiary"] {
            scripts.always_fail(code, server_error());
        }
        let (executor, registry) = fixtures::executor(
            &fixtures::three_providers(),
            &scripts,
            &CircuitBreakerConfig::default(),
        )
        .await;

        let failure = executor
            .execute(&completion(), &registry.ordered_providers(None), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(!failure.is_cancelled());
        assert_eq!(failure.error.code, AdapterErrorCode::AllProvidersFailed);
        assert_eq!(failure.total_attempts(), 9);
        assert_eq!(
            failure.attempted_providers(),
            vec!["primary", "secondary", "tertiary"]
        );
        assert_eq!(
            failure.last_error.as_ref().map(|e| e.code),
            Some(AdapterErrorCode::ServerError)
        );
    }

    // ==================== Circuit Breaker Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_is_skipped_without_a_call() {
        let scripts = Scripts::new();
        scripts.always_fail("primary", server_error());
        let (executor, registry) = fixtures::executor(
            &fixtures::three_providers(),
            &scripts,
            &CircuitBreakerConfig::default(),
        )
        .await;
        let providers = registry.ordered_providers(None);
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            executor.execute(&completion(), &providers, &cancel).await.unwrap();
        }
        assert_eq!(
            executor.tracker().circuit_state("primary").await,
            Some(CircuitState::Open)
        );
        let calls_before = scripts.calls("primary");

        let outcome = executor.execute(&completion(), &providers, &cancel).await.unwrap();
        assert_eq!(scripts.calls("primary"), calls_before);
        assert_eq!(outcome.used_provider, "secondary");
        assert!(outcome.was_failover);
        assert!(matches!(outcome.attempts[0], ProviderAttempt::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_circuit_recovers_through_a_single_trial() {
        let scripts = Scripts::new();
        scripts.push("primary", Err(server_error()));
        let registry =
            provider_gateway::ProviderRegistry::initialize(&fixtures::three_providers(), &scripts.factory())
                .await;
        let tracker = fixtures::tracker(&fast_recovery());
        tracker.sync(&registry.codes()).await;
        let executor = FailoverExecutor::new(tracker, fixtures::policy().with_max_retries(1));
        let providers = registry.ordered_providers(None);
        let cancel = CancellationToken::new();

        // One failure opens the circuit at threshold 1
        let outcome = executor.execute(&completion(), &providers, &cancel).await.unwrap();
        assert_eq!(outcome.used_provider, "secondary");
        assert!(executor.tracker().state("primary").await.unwrap().circuit_open);

        let outcome = executor.execute(&completion(), &providers, &cancel).await.unwrap();
        assert_eq!(outcome.used_provider, "secondary");
        assert_eq!(scripts.calls("primary"), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(
            executor.tracker().circuit_state("primary").await,
            Some(CircuitState::HalfOpen)
        );

        let outcome = executor.execute(&completion(), &providers, &cancel).await.unwrap();
        assert_eq!(outcome.used_provider, "primary");
        assert!(!outcome.was_failover);

        let state = executor.tracker().state("primary").await.unwrap();
        assert!(!state.circuit_open);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(
            executor.tracker().circuit_state("primary").await,
            Some(CircuitState::Closed)
        );
    }

    #[tokio::test]
    async fn test_failed_trial_reopens_circuit() {
        let scripts = Scripts::new();
        scripts.always_fail("primary", server_error());
        let registry =
            provider_gateway::ProviderRegistry::initialize(&fixtures::three_providers(), &scripts.factory())
                .await;
        let tracker = fixtures::tracker(&fast_recovery());
        tracker.sync(&registry.codes()).await;
        let executor = FailoverExecutor::new(tracker, fixtures::policy().with_max_retries(1));
        let providers = registry.ordered_providers(None);
        let cancel = CancellationToken::new();

        executor.execute(&completion(), &providers, &cancel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let outcome = executor.execute(&completion(), &providers, &cancel).await.unwrap();
        assert_eq!(outcome.used_provider, "secondary");
        assert_eq!(scripts.calls("primary"), 2);
        assert_eq!(
            executor.tracker().circuit_state("primary").await,
            Some(CircuitState::Open)
        );
    }

    #[tokio::test]
    async fn test_half_open_admits_exactly_one_concurrent_trial() {
        let scripts = Scripts::new();
        scripts.push("primary", Err(server_error()));
        let registry =
            provider_gateway::ProviderRegistry::initialize(&fixtures::three_providers(), &scripts.factory())
                .await;
        let tracker = fixtures::tracker(&fast_recovery());
        tracker.sync(&registry.codes()).await;
        let executor = FailoverExecutor::new(tracker, fixtures::policy().with_max_retries(1));
        let providers = registry.ordered_providers(None);

        executor
            .execute(&completion(), &providers, &CancellationToken::new())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        // The trial call hangs long enough for every other caller to arrive
        scripts.delay("primary", Duration::from_millis(300));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let executor = executor.clone();
            let providers = providers.clone();
            handles.push(tokio::spawn(async move {
                executor
                    .execute(&fixtures::completion(), &providers, &CancellationToken::new())
                    .await
                    .map(|o| o.used_provider)
            }));
        }

        let mut served_by_primary = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == "primary" {
                served_by_primary += 1;
            }
        }
        assert_eq!(served_by_primary, 1);
        // One failed call before the window plus the single trial
        assert_eq!(scripts.calls("primary"), 2);
    }

    #[tokio::test]
    async fn test_slow_trial_blocks_later_callers_past_the_window() {
        let scripts = Scripts::new();
        scripts.always_fail("primary", server_error());
        let registry =
            provider_gateway::ProviderRegistry::initialize(&fixtures::three_providers(), &scripts.factory())
                .await;
        let tracker = fixtures::tracker(&fast_recovery());
        tracker.sync(&registry.codes()).await;
        let executor = FailoverExecutor::new(tracker, fixtures::policy());
        let providers = registry.ordered_providers(None);

        // Three attempts with backoff, then the circuit opens at threshold 1
        executor
            .execute(&completion(), &providers, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(scripts.calls("primary"), 3);
        tokio::time::sleep(Duration::from_millis(150)).await;

        // The trial call outlasts the 100ms recovery window
        scripts.delay("primary", Duration::from_millis(250));
        let trial = {
            let executor = executor.clone();
            let providers = providers.clone();
            tokio::spawn(async move {
                executor
                    .execute(&fixtures::completion(), &providers, &CancellationToken::new())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(150)).await;

        let later = executor
            .execute(&completion(), &providers, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(later.used_provider, "secondary");
        assert!(matches!(later.attempts[0], ProviderAttempt::Skipped { .. }));

        let trial = trial.await.unwrap().unwrap();
        assert_eq!(trial.used_provider, "secondary");
        assert!(matches!(
            trial.attempts[0],
            ProviderAttempt::Failed { attempts: 1, .. }
        ));
        assert_eq!(scripts.calls("primary"), 4);
        assert_eq!(
            executor.tracker().circuit_state("primary").await,
            Some(CircuitState::Open)
        );
    }
}
