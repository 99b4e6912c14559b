//! Core configuration validators
//!
//! Validation implementations for the gateway root, provider descriptors and
//! the resilience sections.

use super::trait_def::Validate;
use crate::config::models::*;
use std::collections::HashSet;
use tracing::{debug, warn};

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating gateway configuration");

        if self.active_providers().next().is_none() {
            warn!("No active providers configured; every call will fail until a reload");
        }

        // Duplicates are tolerated (the registry keeps the first) but worth a warning
        let mut codes = HashSet::new();
        for provider in &self.providers {
            if !codes.insert(provider.code.as_str()) {
                warn!("Duplicate provider code in configuration: {}", provider.code);
            }
            provider.validate()?;
        }

        self.resilience.validate()?;
        self.health_monitor.validate()?;
        self.budget.validate()?;
        self.rate_limit.validate()?;
        self.cost_rates.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;

        debug!("Gateway configuration validation completed");
        Ok(())
    }
}

impl Validate for ProviderDescriptor {
    fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("Provider code cannot be empty".to_string());
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms == 0 {
                return Err(format!("Provider {} timeout must be greater than 0", self.code));
            }
        }

        if let Some(max_retries) = self.max_retries {
            if max_retries == 0 {
                return Err(format!(
                    "Provider {} max_retries must be at least 1",
                    self.code
                ));
            }
        }

        match &self.settings {
            ProviderSettings::OpenAiCompatible(settings) => {
                if let Some(base_url) = &settings.base_url {
                    validate_http_url(&self.code, base_url)?;
                }
                if settings.default_model.is_empty() {
                    return Err(format!("Provider {} default model cannot be empty", self.code));
                }
            }
            ProviderSettings::HttpMessaging(settings) => {
                validate_http_url(&self.code, &settings.base_url)?;
                if !settings.send_path.starts_with('/') {
                    return Err(format!(
                        "Provider {} send_path must start with '/'",
                        self.code
                    ));
                }
            }
        }

        // Empty credentials are a per-provider initialization failure, not a startup error
        if self.is_active && self.settings.credential().is_empty() {
            warn!("Provider {} has no credential configured", self.code);
        }

        Ok(())
    }
}

fn validate_http_url(code: &str, raw: &str) -> Result<(), String> {
    let url = url::Url::parse(raw)
        .map_err(|e| format!("Provider {} base_url is invalid: {}", code, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!(
            "Provider {} base_url must use http or https, got {}",
            code, scheme
        )),
    }
}

impl Validate for ResilienceConfig {
    fn validate(&self) -> Result<(), String> {
        self.circuit_breaker.validate()?;
        self.retry.validate()?;
        self.timeouts.validate()
    }
}

impl Validate for CircuitBreakerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("Circuit breaker failure threshold must be greater than 0".to_string());
        }
        if self.recovery_window_ms == 0 {
            return Err("Circuit breaker recovery window must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Validate for RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 {
            return Err("Retry max_retries must be at least 1".to_string());
        }
        if self.max_retries > 10 {
            return Err("Retry max_retries should not exceed 10".to_string());
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err("Retry base delay cannot exceed max delay".to_string());
        }
        Ok(())
    }
}

impl Validate for TimeoutConfig {
    fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }
        if self.health_check_timeout_ms == 0 {
            return Err("Health check timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Validate for HealthMonitorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.interval_secs == 0 {
            return Err("Health monitor interval must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.level.trim().is_empty() {
            return Err("Log level cannot be empty".to_string());
        }
        Ok(())
    }
}
