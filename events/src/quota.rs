//! Quota events.
//!
//! A quota aggregate (aggregate id = quota id) records one
//! `quota.notification.due` event each time a usage notification fires.

use crate::payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate type of quotas.
pub const AGGREGATE_TYPE: &str = "quota";

/// What a quota counts.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuotaUnit {
    /// Authenticated API requests.
    RequestsAllAuthenticated,
    /// Seconds spent running actions.
    ActionsAllRunsSeconds,
}

impl QuotaUnit {
    /// Stable name of the unit.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestsAllAuthenticated => "requests.all.authenticated",
            Self::ActionsAllRunsSeconds => "actions.all.runs.seconds",
        }
    }
}

impl fmt::Display for QuotaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification crossed its threshold and is handed to delivery.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationDue {
    /// Unit of the quota.
    pub unit: QuotaUnit,
    /// Notification id within the quota config.
    pub id: String,
    /// Endpoint the notification is delivered to.
    pub call_url: String,
    /// Start of the period the notification fired in.
    pub period_start: DateTime<Utc>,
    /// Threshold percent that fired.
    pub threshold: u16,
    /// Absolute usage when the notification fired.
    pub usage: u64,
}
payload!(NotificationDue, AGGREGATE_TYPE, "quota.notification.due");
