//! Cost rate types

use serde::{Deserialize, Serialize};

/// Unit prices for one provider and, optionally, one model or channel
///
/// All prices are in fractional cents. A row with `model: None` is the
/// provider's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRate {
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub input_cost_per_1k_cents: f64,
    #[serde(default)]
    pub output_cost_per_1k_cents: f64,
    #[serde(default)]
    pub per_message_cents: f64,
}

impl CostRate {
    /// Token-priced provider default row
    pub fn per_1k_tokens(provider: impl Into<String>, input_cents: f64, output_cents: f64) -> Self {
        Self {
            provider: provider.into(),
            model: None,
            input_cost_per_1k_cents: input_cents,
            output_cost_per_1k_cents: output_cents,
            per_message_cents: 0.0,
        }
    }

    /// Message-priced provider default row
    pub fn per_message(provider: impl Into<String>, cents: f64) -> Self {
        Self {
            provider: provider.into(),
            model: None,
            input_cost_per_1k_cents: 0.0,
            output_cost_per_1k_cents: 0.0,
            per_message_cents: cents,
        }
    }

    pub fn for_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
