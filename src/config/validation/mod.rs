//! Configuration validation
//!
//! - `trait_def`: Core Validate trait definition
//! - `config_validators`: gateway, provider and resilience validators
//! - `budget_validators`: budget, rate limit and cost rate validators
//! - `storage_validators`: storage validators

mod budget_validators;
mod config_validators;
mod storage_validators;
mod trait_def;

pub use trait_def::Validate;
