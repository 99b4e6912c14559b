//! Adapter error taxonomy
//!
//! Every vendor failure is folded into an [`AdapterError`] with a stable code
//! and a `retryable` flag. The failover executor only ever looks at the flag.

use crate::config::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Vendor body codes that signal transient overload regardless of HTTP status
const OVERLOADED_BODY_CODES: &[&str] = &["overloaded", "overloaded_error", "server_busy"];

/// Longest vendor body kept in an error message
const MAX_BODY_IN_MESSAGE: usize = 512;

/// Stable error codes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdapterErrorCode {
    RateLimited,
    Overloaded,
    ServerError,
    Timeout,
    NetworkError,
    Unauthorized,
    InvalidRequest,
    NotFound,
    UnsupportedRequest,
    InvalidResponse,
    NotInitialized,
    Cancelled,
    AllProvidersFailed,
}

impl AdapterErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterErrorCode::RateLimited => "RATE_LIMITED",
            AdapterErrorCode::Overloaded => "OVERLOADED",
            AdapterErrorCode::ServerError => "SERVER_ERROR",
            AdapterErrorCode::Timeout => "TIMEOUT",
            AdapterErrorCode::NetworkError => "NETWORK_ERROR",
            AdapterErrorCode::Unauthorized => "UNAUTHORIZED",
            AdapterErrorCode::InvalidRequest => "INVALID_REQUEST",
            AdapterErrorCode::NotFound => "NOT_FOUND",
            AdapterErrorCode::UnsupportedRequest => "UNSUPPORTED_REQUEST",
            AdapterErrorCode::InvalidResponse => "INVALID_RESPONSE",
            AdapterErrorCode::NotInitialized => "NOT_INITIALIZED",
            AdapterErrorCode::Cancelled => "CANCELLED",
            AdapterErrorCode::AllProvidersFailed => "ALL_PROVIDERS_FAILED",
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdapterErrorCode::RateLimited
                | AdapterErrorCode::Overloaded
                | AdapterErrorCode::ServerError
                | AdapterErrorCode::Timeout
                | AdapterErrorCode::NetworkError
        )
    }
}

impl fmt::Display for AdapterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified adapter failure
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct AdapterError {
    pub code: AdapterErrorCode,
    pub message: String,
    pub retryable: bool,
    /// HTTP status, when the failure came from a vendor response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Vendor-provided `Retry-After`, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl AdapterError {
    /// Error whose retryability follows its code
    pub fn new(code: AdapterErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
            status: None,
            retry_after_secs: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_retry_after(mut self, secs: Option<u64>) -> Self {
        self.retry_after_secs = secs;
        self
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            AdapterErrorCode::Timeout,
            format!("No response within {} ms", after.as_millis()),
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorCode::NetworkError, message)
    }

    pub fn cancelled() -> Self {
        Self::new(AdapterErrorCode::Cancelled, "Call cancelled by caller")
    }

    pub fn not_initialized(provider: &str) -> Self {
        Self::new(
            AdapterErrorCode::NotInitialized,
            format!("Provider {} has not been initialized", provider),
        )
    }

    pub fn unsupported(provider: &str, kind: ProviderKind, request: &str) -> Self {
        Self::new(
            AdapterErrorCode::UnsupportedRequest,
            format!(
                "Provider {} ({}) cannot serve a {} request",
                provider, kind, request
            ),
        )
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorCode::InvalidResponse, message)
    }

    /// Terminal failover error, carrying the last concrete vendor error
    pub fn all_providers_failed(attempted: &[String], last: Option<&AdapterError>) -> Self {
        let message = match last {
            Some(last) => format!(
                "All providers failed (attempted: [{}]); last error: {}",
                attempted.join(", "),
                last
            ),
            None if attempted.is_empty() => "No eligible provider available".to_string(),
            None => format!("All providers failed (attempted: [{}])", attempted.join(", ")),
        };
        Self {
            code: AdapterErrorCode::AllProvidersFailed,
            message,
            retryable: false,
            status: last.and_then(|e| e.status),
            retry_after_secs: None,
        }
    }

    /// Classify a non-success vendor response
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let vendor_code = parsed.as_ref().and_then(vendor_error_code);

        let overloaded = status == 529
            || vendor_code
                .as_deref()
                .is_some_and(|c| OVERLOADED_BODY_CODES.contains(&c.to_ascii_lowercase().as_str()));

        let code = if overloaded {
            AdapterErrorCode::Overloaded
        } else {
            match status {
                429 => AdapterErrorCode::RateLimited,
                408 => AdapterErrorCode::Timeout,
                401 | 403 => AdapterErrorCode::Unauthorized,
                404 => AdapterErrorCode::NotFound,
                500..=599 => AdapterErrorCode::ServerError,
                400..=499 => AdapterErrorCode::InvalidRequest,
                _ => AdapterErrorCode::InvalidResponse,
            }
        };

        let detail = parsed
            .as_ref()
            .and_then(vendor_error_message)
            .unwrap_or_else(|| truncate(body, MAX_BODY_IN_MESSAGE));

        Self::new(code, format!("HTTP {}: {}", status, detail)).with_status(status)
    }

    pub fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::timeout(timeout)
        } else if err.is_decode() {
            Self::invalid_response(format!("Failed to decode response: {}", err))
        } else {
            Self::network(err.to_string())
        }
    }
}

/// `{"error": {"type"|"code": ...}}` or a top level `code`
fn vendor_error_code(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error");
    [
        error.and_then(|e| e.get("type")),
        error.and_then(|e| e.get("code")),
        body.get("code"),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| v.as_str().map(str::to_string))
}

fn vendor_error_message(body: &serde_json::Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(|m| m.as_str())
        .or_else(|| body.get("message").and_then(|m| m.as_str()))
        .map(str::to_string)
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Why a single provider could not be initialized
///
/// Fatal only for that provider: the registry logs it and carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("provider {provider}: missing credential `{field}`")]
    MissingCredential {
        provider: String,
        field: &'static str,
    },

    #[error("provider {provider}: invalid `{field}`: {reason}")]
    InvalidSetting {
        provider: String,
        field: &'static str,
        reason: String,
    },

    #[error("provider {provider}: expected {expected} settings, got {actual}")]
    KindMismatch {
        provider: String,
        expected: ProviderKind,
        actual: ProviderKind,
    },

    #[error("provider {provider}: failed to build HTTP client: {message}")]
    Client { provider: String, message: String },
}
