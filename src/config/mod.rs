//! Configuration management for the gateway
//!
//! Configuration is read from a YAML file, overlaid with environment variables
//! and validated before any component is built from it.

pub mod loader;
pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{GatewayError, Result};
use std::path::Path;
use tracing::{debug, info};

impl GatewayConfig {
    /// Load configuration from file, apply the environment overlay and validate
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate_all()?;

        debug!(
            providers = config.providers.len(),
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Parse configuration without touching the environment
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Defaults plus the environment overlay, for running without a file
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate_all()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        Validate::validate(self).map_err(GatewayError::Config)
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GatewayError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}
