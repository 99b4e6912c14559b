//! Request and response types shared by every adapter

use crate::config::ProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// AI completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model override; the adapter's default model is used when absent
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Outbound message request (WhatsApp-class senders)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRequest {
    /// Recipient address
    pub to: String,
    pub body: String,
    /// Pre-approved template name
    #[serde(default)]
    pub template: Option<String>,
}

/// Everything a caller can ask a provider to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayRequest {
    Completion(CompletionRequest),
    Message(MessageRequest),
}

impl GatewayRequest {
    /// Completion request with default parameters
    pub fn completion(messages: Vec<ChatMessage>) -> Self {
        GatewayRequest::Completion(CompletionRequest {
            model: None,
            messages,
            max_tokens: None,
            temperature: None,
        })
    }

    pub fn message(to: impl Into<String>, body: impl Into<String>) -> Self {
        GatewayRequest::Message(MessageRequest {
            to: to.into(),
            body: body.into(),
            template: None,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            GatewayRequest::Completion(_) => "completion",
            GatewayRequest::Message(_) => "message",
        }
    }

    /// Provider family able to serve this request
    pub fn provider_kind(&self) -> ProviderKind {
        match self {
            GatewayRequest::Completion(_) => ProviderKind::OpenAiCompatible,
            GatewayRequest::Message(_) => ProviderKind::HttpMessaging,
        }
    }

    /// Model (completion) or template (message) used for cost rate lookups
    pub fn rate_key(&self) -> Option<&str> {
        match self {
            GatewayRequest::Completion(c) => c.model.as_deref(),
            GatewayRequest::Message(m) => m.template.as_deref(),
        }
    }

    /// Usage estimate for budget admission
    ///
    /// Completion input is approximated at four characters per token; output is
    /// the requested `max_tokens`. A message counts as one message.
    pub fn estimated_units(&self) -> UsageUnits {
        match self {
            GatewayRequest::Completion(c) => {
                let chars: usize = c.messages.iter().map(|m| m.content.chars().count()).sum();
                UsageUnits {
                    input_tokens: chars.div_ceil(4) as u64,
                    output_tokens: c.max_tokens.map(u64::from).unwrap_or(0),
                    messages: 0,
                }
            }
            GatewayRequest::Message(_) => UsageUnits::messages(1),
        }
    }
}

/// Billable units of one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageUnits {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub messages: u64,
}

impl UsageUnits {
    pub fn tokens(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            messages: 0,
        }
    }

    pub fn messages(messages: u64) -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            messages,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Successful adapter result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Vendor payload, passed through untouched
    pub payload: serde_json::Value,
    /// Units actually consumed, as reported by the vendor
    pub usage: UsageUnits,
    /// Model that served the request, if the vendor reports one
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderResponse {
    pub fn new(payload: serde_json::Value, usage: UsageUnits) -> Self {
        Self {
            payload,
            usage,
            model: None,
        }
    }
}

/// Result of one health probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckReport {
    pub provider: String,
    pub is_healthy: bool,
    pub latency_ms: u64,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckReport {
    pub fn healthy(provider: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            provider: provider.into(),
            is_healthy: true,
            latency_ms,
            message: "ok".to_string(),
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(
        provider: impl Into<String>,
        latency_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            is_healthy: false,
            latency_ms,
            message: message.into(),
            checked_at: Utc::now(),
        }
    }
}
