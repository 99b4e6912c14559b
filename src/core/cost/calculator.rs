//! Cost calculation
//!
//! `cost = input/1000 * input_rate + output/1000 * output_rate + messages * per_message`

use super::types::CostRate;
use crate::core::providers::UsageUnits;

/// Cost in cents of `units` at `rate`; a missing rate costs nothing
pub fn calculate_cost(rate: Option<&CostRate>, units: &UsageUnits) -> f64 {
    let Some(rate) = rate else {
        return 0.0;
    };
    let cost = units.input_tokens as f64 / 1000.0 * rate.input_cost_per_1k_cents
        + units.output_tokens as f64 / 1000.0 * rate.output_cost_per_1k_cents
        + units.messages as f64 * rate.per_message_cents;
    cost.max(0.0)
}

/// Exact model/channel match first, then the provider default row
pub fn select_rate<'a>(rates: &'a [CostRate], key: Option<&str>) -> Option<&'a CostRate> {
    key.and_then(|key| rates.iter().find(|r| r.model.as_deref() == Some(key)))
        .or_else(|| rates.iter().find(|r| r.model.is_none()))
}
