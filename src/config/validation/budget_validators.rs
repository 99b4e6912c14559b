//! Budget configuration validators

use super::trait_def::Validate;
use crate::config::models::*;
use crate::core::cost::CostRate;

fn non_negative(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be a non-negative number", name));
    }
    Ok(())
}

impl Validate for BudgetConfig {
    fn validate(&self) -> Result<(), String> {
        non_negative("Daily budget", self.daily_budget_cents)?;
        non_negative("Monthly budget", self.monthly_budget_cents)?;

        if !(self.warning_threshold_percent > 0.0 && self.warning_threshold_percent <= 100.0) {
            return Err("Warning threshold must be within (0, 100]".to_string());
        }

        if self.notification_interval_secs == 0 {
            return Err("Notification interval must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.requests_per_minute == 0 {
            return Err("Rate limit requests per minute must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Validate for CostRateConfig {
    fn validate(&self) -> Result<(), String> {
        if self.cache_ttl_secs == 0 {
            return Err("Cost rate cache TTL must be greater than 0".to_string());
        }
        for rate in &self.rates {
            rate.validate()?;
        }
        Ok(())
    }
}

impl Validate for CostRate {
    fn validate(&self) -> Result<(), String> {
        if self.provider.is_empty() {
            return Err("Cost rate provider cannot be empty".to_string());
        }
        non_negative("Input cost per 1k", self.input_cost_per_1k_cents)?;
        non_negative("Output cost per 1k", self.output_cost_per_1k_cents)?;
        non_negative("Per message cost", self.per_message_cents)
    }
}
