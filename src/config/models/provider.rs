//! Provider configuration

use super::default_true;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Vendor family an adapter belongs to
///
/// This is the key of the adapter registration map, so adding a family means
/// adding a variant here and a constructor in `AdapterFactory::with_builtin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OpenAI-style `/chat/completions` API (OpenAI, Claude and Gemini proxies, ...)
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    /// JSON messaging API (WhatsApp Business-class senders)
    #[serde(rename = "http_messaging")]
    HttpMessaging,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAiCompatible => "openai_compatible",
            ProviderKind::HttpMessaging => "http_messaging",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for completion vendors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSettings {
    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model used when the request does not name one
    #[serde(default = "default_completion_model")]
    pub default_model: String,
    /// Organization header, if the vendor wants one
    #[serde(default)]
    pub organization: Option<String>,
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Settings for messaging vendors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingSettings {
    /// Access token sent as a bearer token
    #[serde(default)]
    pub access_token: String,
    /// Base URL of the vendor API
    pub base_url: String,
    /// Sender phone number or channel id
    #[serde(default)]
    pub sender_id: Option<String>,
    /// Path appended to `base_url` for sends
    #[serde(default = "default_send_path")]
    pub send_path: String,
    /// Path probed by health checks; the base URL is probed when unset
    #[serde(default)]
    pub health_path: Option<String>,
}

fn default_send_path() -> String {
    "/messages".to_string()
}

/// Vendor-family specific settings, discriminated by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ProviderSettings {
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible(CompletionSettings),
    #[serde(rename = "http_messaging")]
    HttpMessaging(MessagingSettings),
}

impl ProviderSettings {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSettings::OpenAiCompatible(_) => ProviderKind::OpenAiCompatible,
            ProviderSettings::HttpMessaging(_) => ProviderKind::HttpMessaging,
        }
    }

    /// The credential of whichever family this is
    pub fn credential(&self) -> &str {
        match self {
            ProviderSettings::OpenAiCompatible(s) => &s.api_key,
            ProviderSettings::HttpMessaging(s) => &s.access_token,
        }
    }

    pub(crate) fn credential_mut(&mut self) -> &mut String {
        match self {
            ProviderSettings::OpenAiCompatible(s) => &mut s.api_key,
            ProviderSettings::HttpMessaging(s) => &mut s.access_token,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        match self {
            ProviderSettings::OpenAiCompatible(s) => s.base_url.as_deref(),
            ProviderSettings::HttpMessaging(s) => Some(s.base_url.as_str()),
        }
    }
}

/// One vendor as described by configuration
///
/// Immutable for the lifetime of a registry generation; a reload replaces the
/// whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Stable provider code, unique within a registry
    pub code: String,
    /// Human readable name
    #[serde(default)]
    pub display_name: String,
    /// Inactive providers are never registered
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Primary providers are ordered first
    #[serde(default)]
    pub is_primary: bool,
    /// Per-call deadline override
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Retry budget override for this provider
    #[serde(default)]
    pub max_retries: Option<u32>,
    pub settings: ProviderSettings,
}

impl ProviderDescriptor {
    pub fn new(code: impl Into<String>, settings: ProviderSettings) -> Self {
        Self {
            code: code.into(),
            display_name: String::new(),
            is_active: true,
            is_primary: false,
            timeout_ms: None,
            max_retries: None,
            settings,
        }
    }

    /// Completion descriptor with default settings
    pub fn openai_compatible(code: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(
            code,
            ProviderSettings::OpenAiCompatible(CompletionSettings {
                api_key: api_key.into(),
                base_url: None,
                default_model: default_completion_model(),
                organization: None,
            }),
        )
    }

    /// Messaging descriptor with default settings
    pub fn http_messaging(
        code: impl Into<String>,
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::new(
            code,
            ProviderSettings::HttpMessaging(MessagingSettings {
                access_token: access_token.into(),
                base_url: base_url.into(),
                sender_id: None,
                send_path: default_send_path(),
                health_path: None,
            }),
        )
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        match &mut self.settings {
            ProviderSettings::OpenAiCompatible(s) => s.base_url = Some(url.into()),
            ProviderSettings::HttpMessaging(s) => s.base_url = url.into(),
        }
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.settings.kind()
    }

    /// Display name, falling back to the code
    pub fn name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.code
        } else {
            &self.display_name
        }
    }

    /// Deadline for one call, falling back to `default_ms`
    pub fn timeout(&self, default_ms: u64) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(default_ms))
    }
}
