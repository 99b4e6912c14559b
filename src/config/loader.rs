//! Environment overlay
//!
//! Applied after the file is parsed. Provider credentials may be supplied as
//! `GATEWAY_PROVIDER_<CODE>_API_KEY` or `GATEWAY_PROVIDER_<CODE>_ACCESS_TOKEN`
//! and only fill credentials the file left empty.

use super::models::*;
use crate::utils::error::{GatewayError, Result};
use std::env;
use tracing::debug;

impl GatewayConfig {
    /// Overlay values from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_from(|key| env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("GATEWAY_LOG_FORMAT") {
            self.logging.format = format.parse().map_err(GatewayError::Config)?;
        }

        if let Some(db_url) = lookup("DATABASE_URL") {
            self.storage.database.url = db_url;
            self.storage.database.enabled = true;
        }
        if let Some(max_conn) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.storage.database.max_connections = max_conn
                .parse()
                .map_err(|e| GatewayError::Config(format!("Invalid max connections: {}", e)))?;
        }

        for provider in &mut self.providers {
            if !provider.settings.credential().is_empty() {
                continue;
            }
            let prefix = format!("GATEWAY_PROVIDER_{}", env_key(&provider.code));
            let suffix = match provider.kind() {
                ProviderKind::OpenAiCompatible => "API_KEY",
                ProviderKind::HttpMessaging => "ACCESS_TOKEN",
            };
            if let Some(secret) = lookup(&format!("{}_{}", prefix, suffix)) {
                debug!(provider = %provider.code, "Credential loaded from environment");
                *provider.settings.credential_mut() = secret;
            }
        }

        Ok(())
    }
}

/// `open-ai.eu` -> `OPEN_AI_EU`
fn env_key(code: &str) -> String {
    code.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
