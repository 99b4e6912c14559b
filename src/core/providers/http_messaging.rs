//! Generic JSON messaging adapter
//!
//! Sends `{"to", "body", "template"?, "from"?}` to `{base}{send_path}` with a
//! bearer access token. Vendors with a different body shape get their own
//! constructor registered on the factory.

use super::contract::{NormalizedResult, ProviderAdapter};
use super::error::{AdapterError, ConfigurationError};
use super::shared::{build_client, elapsed_ms, send_json, trim_base_url};
use super::types::{GatewayRequest, HealthCheckReport, MessageRequest, ProviderResponse, UsageUnits};
use crate::config::{
    MessagingSettings, ProviderDescriptor, ProviderKind, ProviderSettings,
    default_request_timeout_ms,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug)]
struct Ready {
    client: Client,
    settings: MessagingSettings,
    base_url: String,
    timeout: Duration,
}

/// Adapter for `http_messaging` providers
#[derive(Debug)]
pub struct HttpMessagingAdapter {
    code: String,
    ready: Option<Ready>,
    healthy: AtomicBool,
}

impl HttpMessagingAdapter {
    pub fn new(descriptor: &ProviderDescriptor) -> Self {
        Self {
            code: descriptor.code.clone(),
            ready: None,
            healthy: AtomicBool::new(false),
        }
    }

    fn request_body(ready: &Ready, message: &MessageRequest) -> Value {
        let mut body = json!({
            "to": message.to,
            "body": message.body,
        });
        if let Some(template) = &message.template {
            body["template"] = json!(template);
        }
        if let Some(sender) = &ready.settings.sender_id {
            body["from"] = json!(sender);
        }
        body
    }
}

#[async_trait]
impl ProviderAdapter for HttpMessagingAdapter {
    fn code(&self) -> &str {
        &self.code
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::HttpMessaging
    }

    async fn initialize(
        &mut self,
        descriptor: &ProviderDescriptor,
    ) -> Result<(), ConfigurationError> {
        let settings = match &descriptor.settings {
            ProviderSettings::HttpMessaging(s) => s.clone(),
            other => {
                return Err(ConfigurationError::KindMismatch {
                    provider: descriptor.code.clone(),
                    expected: ProviderKind::HttpMessaging,
                    actual: other.kind(),
                });
            }
        };

        if settings.access_token.trim().is_empty() {
            return Err(ConfigurationError::MissingCredential {
                provider: descriptor.code.clone(),
                field: "access_token",
            });
        }

        let base_url = trim_base_url(&settings.base_url);
        url::Url::parse(&base_url).map_err(|e| ConfigurationError::InvalidSetting {
            provider: descriptor.code.clone(),
            field: "base_url",
            reason: e.to_string(),
        })?;

        let timeout = descriptor.timeout(default_request_timeout_ms());
        let client = build_client(&descriptor.code, timeout)?;

        debug!(provider = %descriptor.code, base_url = %base_url, "Messaging adapter initialized");
        self.ready = Some(Ready {
            client,
            settings,
            base_url,
            timeout,
        });
        self.healthy.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn execute(&self, request: &GatewayRequest) -> NormalizedResult {
        let Some(ready) = &self.ready else {
            return Err(AdapterError::not_initialized(&self.code));
        };

        let message = match request {
            GatewayRequest::Message(m) => m,
            other => {
                return Err(AdapterError::unsupported(
                    &self.code,
                    self.kind(),
                    other.kind_name(),
                ));
            }
        };

        let url = format!("{}{}", ready.base_url, ready.settings.send_path);
        let builder = ready
            .client
            .post(&url)
            .bearer_auth(&ready.settings.access_token)
            .json(&Self::request_body(ready, message));
        let payload = send_json(&self.code, builder, ready.timeout).await?;

        Ok(ProviderResponse::new(payload, UsageUnits::messages(1)))
    }

    async fn health_check(&self) -> HealthCheckReport {
        let Some(ready) = &self.ready else {
            return HealthCheckReport::unhealthy(&self.code, 0, "not initialized");
        };

        let url = match &ready.settings.health_path {
            Some(path) => format!("{}{}", ready.base_url, path),
            None => ready.base_url.clone(),
        };

        let started = Instant::now();
        let result = ready
            .client
            .get(&url)
            .bearer_auth(&ready.settings.access_token)
            .send()
            .await;
        let latency_ms = elapsed_ms(started);

        let report = match result {
            Ok(response) if response.status().is_success() => {
                HealthCheckReport::healthy(&self.code, latency_ms)
            }
            Ok(response) => HealthCheckReport::unhealthy(
                &self.code,
                latency_ms,
                format!("HTTP {}", response.status().as_u16()),
            ),
            Err(e) => {
                warn!(provider = %self.code, "Health check failed: {}", e);
                HealthCheckReport::unhealthy(&self.code, latency_ms, e.to_string())
            }
        };
        self.healthy.store(report.is_healthy, Ordering::Relaxed);
        report
    }

    fn is_healthy(&self) -> bool {
        self.ready.is_some() && self.healthy.load(Ordering::Relaxed)
    }
}
