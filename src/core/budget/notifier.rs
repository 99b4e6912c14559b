//! Budget notification sink

use super::types::{NotificationKind, Utilization};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;
use tracing::warn;

/// One throttled budget notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetNotification {
    pub tenant_id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub utilization: Utilization,
    pub at: DateTime<Utc>,
}

/// Delivery is best-effort; implementations must not fail the request path
#[async_trait]
pub trait BudgetNotifier: Send + Sync + Debug {
    async fn notify(&self, notification: &BudgetNotification);
}

/// Emits a structured log line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl BudgetNotifier for LogNotifier {
    async fn notify(&self, notification: &BudgetNotification) {
        warn!(
            tenant = %notification.tenant_id,
            kind = %notification.kind,
            daily_percent = notification.utilization.daily_percent,
            monthly_percent = notification.utilization.monthly_percent,
            "{}",
            notification.message
        );
    }
}
