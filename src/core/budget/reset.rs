//! Calendar window boundaries (UTC)

use super::types::BudgetCounter;
use chrono::{DateTime, Datelike, Duration, Utc};

/// New UTC day since the last daily reset, or more than 24h elapsed
pub fn needs_daily_reset(counter: &BudgetCounter, now: DateTime<Utc>) -> bool {
    counter.daily_reset_at.date_naive() != now.date_naive()
        || now - counter.daily_reset_at > Duration::hours(24)
}

/// New UTC month (or year) since the last monthly reset
pub fn needs_monthly_reset(counter: &BudgetCounter, now: DateTime<Utc>) -> bool {
    let last = counter.monthly_reset_at;
    (last.year(), last.month()) != (now.year(), now.month())
}
