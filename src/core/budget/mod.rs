//! Tenant budget governance
//!
//! # Module Structure
//!
//! - `types` - Counters, usage records and admission results
//! - `reset` - Daily and monthly window boundaries
//! - `store` - Budget store trait and the in-memory implementation
//! - `notifier` - Throttled warning and limit notifications
//! - `guard` - Admission check and usage metering

pub mod guard;
pub mod notifier;
pub mod reset;
pub mod store;
pub mod types;

pub use guard::BudgetGuard;
pub use notifier::{BudgetNotification, BudgetNotifier, LogNotifier};
pub use reset::{needs_daily_reset, needs_monthly_reset};
pub use store::{BudgetStore, InMemoryBudgetStore};
pub use types::{
    BudgetCheck, BudgetCounter, BudgetDenied, CounterDelta, NotificationKind, TenantLimits,
    UsageInput, UsageRecord, UsageStatus, Utilization,
};
