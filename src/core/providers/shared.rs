//! Helpers shared by the HTTP adapters

use super::error::{AdapterError, ConfigurationError};
use reqwest::{Client, RequestBuilder, Response};
use std::time::{Duration, Instant};
use tracing::debug;

/// Build a client with the provider's deadline
pub fn build_client(provider: &str, timeout: Duration) -> Result<Client, ConfigurationError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("provider-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ConfigurationError::Client {
            provider: provider.to_string(),
            message: e.to_string(),
        })
}

/// Normalise a base URL so paths can be appended with `format!("{}{}")`
pub fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Send a request and return the body of a 2xx response as JSON
///
/// An empty 2xx body becomes `{}`; anything else that is not JSON is an
/// `INVALID_RESPONSE`.
pub async fn send_json(
    provider: &str,
    request: RequestBuilder,
    timeout: Duration,
) -> Result<serde_json::Value, AdapterError> {
    let started = Instant::now();
    let response = request
        .send()
        .await
        .map_err(|e| AdapterError::from_reqwest(&e, timeout))?;

    let status = response.status();
    debug!(
        provider = provider,
        status = status.as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Vendor responded"
    );

    if !status.is_success() {
        return Err(error_from_response(response).await);
    }

    let text = response
        .text()
        .await
        .map_err(|e| AdapterError::from_reqwest(&e, timeout))?;
    if text.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(&text)
        .map_err(|e| AdapterError::invalid_response(format!("Response is not JSON: {}", e)))
}

/// Classify a non-success response, honouring `Retry-After`
pub async fn error_from_response(response: Response) -> AdapterError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match response.text().await {
        Ok(body) => AdapterError::from_http_status(status, &body).with_retry_after(retry_after),
        Err(e) => {
            // Status alone still classifies the failure
            debug!("Failed to read error body: {}", e);
            AdapterError::from_http_status(status, "").with_retry_after(retry_after)
        }
    }
}

/// Milliseconds since `started`, saturating
pub fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
