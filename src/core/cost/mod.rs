//! Cost rates and cost calculation

pub mod cache;
pub mod calculator;
pub mod types;

pub use cache::{CostRateCache, CostRateSource, StaticCostRates};
pub use calculator::{calculate_cost, select_rate};
pub use types::CostRate;
