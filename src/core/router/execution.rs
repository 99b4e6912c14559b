//! Backoff and deadline primitives for the failover executor

use super::config::RetryPolicy;
use crate::core::providers::{AdapterError, GatewayRequest, NormalizedResult, ProviderAdapter};
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay before attempt `attempt + 1`
///
/// The formula is `base * 2^(attempt - 1)`, capped at `max_delay`, with an
/// optional +/-10% jitter applied after the cap.
pub fn calculate_retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let delay = policy
        .base_delay
        .saturating_mul(2_u32.saturating_pow(exponent))
        .min(policy.max_delay);

    if policy.jitter && !delay.is_zero() {
        let factor = rand::thread_rng().gen_range(0.9..=1.1);
        delay.mul_f64(factor)
    } else {
        delay
    }
}

/// Sleep unless cancelled first; returns `false` on cancellation
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// One adapter call under a deadline and the caller's cancellation
///
/// A missed deadline is a retryable `TIMEOUT`; cancellation is `CANCELLED`.
pub async fn call_with_deadline(
    adapter: &dyn ProviderAdapter,
    request: &GatewayRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> NormalizedResult {
    tokio::select! {
        _ = cancel.cancelled() => Err(AdapterError::cancelled()),
        result = tokio::time::timeout(timeout, adapter.execute(request)) => match result {
            Ok(result) => result,
            Err(_) => Err(AdapterError::timeout(timeout)),
        },
    }
}
