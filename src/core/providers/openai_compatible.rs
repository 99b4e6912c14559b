//! OpenAI-compatible completion adapter
//!
//! Works against any vendor exposing `POST {base}/chat/completions` and
//! `GET {base}/models` with bearer authentication.

use super::contract::{NormalizedResult, ProviderAdapter};
use super::error::{AdapterError, ConfigurationError};
use super::shared::{build_client, elapsed_ms, send_json, trim_base_url};
use super::types::{
    CompletionRequest, GatewayRequest, HealthCheckReport, ProviderResponse, UsageUnits,
};
use crate::config::{
    CompletionSettings, ProviderDescriptor, ProviderKind, ProviderSettings,
    default_request_timeout_ms,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug)]
struct Ready {
    client: Client,
    settings: CompletionSettings,
    base_url: String,
    timeout: Duration,
}

/// Adapter for `openai_compatible` providers
#[derive(Debug)]
pub struct OpenAiCompatibleAdapter {
    code: String,
    ready: Option<Ready>,
    healthy: AtomicBool,
}

impl OpenAiCompatibleAdapter {
    pub fn new(descriptor: &ProviderDescriptor) -> Self {
        Self {
            code: descriptor.code.clone(),
            ready: None,
            healthy: AtomicBool::new(false),
        }
    }

    fn request_body(&self, ready: &Ready, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_deref().unwrap_or(&ready.settings.default_model),
            "messages": request.messages,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }

    fn authorized(&self, ready: &Ready, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.bearer_auth(&ready.settings.api_key);
        match &ready.settings.organization {
            Some(org) => builder.header("OpenAI-Organization", org),
            None => builder,
        }
    }
}

/// `usage.prompt_tokens` / `usage.completion_tokens`, zero when absent
fn parse_usage(payload: &Value) -> UsageUnits {
    let usage = payload.get("usage");
    let field = |name: &str| {
        usage
            .and_then(|u| u.get(name))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    UsageUnits::tokens(field("prompt_tokens"), field("completion_tokens"))
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn code(&self) -> &str {
        &self.code
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiCompatible
    }

    async fn initialize(
        &mut self,
        descriptor: &ProviderDescriptor,
    ) -> Result<(), ConfigurationError> {
        let settings = match &descriptor.settings {
            ProviderSettings::OpenAiCompatible(s) => s.clone(),
            other => {
                return Err(ConfigurationError::KindMismatch {
                    provider: descriptor.code.clone(),
                    expected: ProviderKind::OpenAiCompatible,
                    actual: other.kind(),
                });
            }
        };

        if settings.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingCredential {
                provider: descriptor.code.clone(),
                field: "api_key",
            });
        }

        let base_url = trim_base_url(settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        url::Url::parse(&base_url).map_err(|e| ConfigurationError::InvalidSetting {
            provider: descriptor.code.clone(),
            field: "base_url",
            reason: e.to_string(),
        })?;

        let timeout = descriptor.timeout(default_request_timeout_ms());
        let client = build_client(&descriptor.code, timeout)?;

        debug!(provider = %descriptor.code, base_url = %base_url, "Completion adapter initialized");
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

        let completion = match request {
            GatewayRequest::Completion(c) => c,
            other => {
                return Err(AdapterError::unsupported(
                    &self.code,
                    self.kind(),
                    other.kind_name(),
                ));
            }
        };

        let url = format!("{}/chat/completions", ready.base_url);
        let builder = self.authorized(ready, ready.client.post(&url));
        let payload = send_json(
            &self.code,
            builder.json(&self.request_body(ready, completion)),
            ready.timeout,
        )
        .await?;

        if payload.get("choices").and_then(Value::as_array).is_none() {
            return Err(AdapterError::invalid_response(
                "Completion response has no choices",
            ));
        }

        let usage = parse_usage(&payload);
        let model = payload
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(ProviderResponse {
            payload,
            usage,
            model,
        })
    }

    async fn health_check(&self) -> HealthCheckReport {
        let Some(ready) = &self.ready else {
            return HealthCheckReport::unhealthy(&self.code, 0, "not initialized");
        };

        let started = Instant::now();
        let url = format!("{}/models", ready.base_url);
        let result = self.authorized(ready, ready.client.get(&url)).send().await;
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
