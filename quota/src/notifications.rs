//! Due-notification evaluation.
//!
//! A notification is due when usage reached its candidate threshold and the
//! threshold recorded for it this period is strictly lower. Evaluation has no
//! side effects: a delivery collaborator later appends the
//! `quota.notification.due` event, which is what moves the recorded
//! threshold forward.

use crate::config::Quota;
use crate::error::Result;
use crate::read_model::NotificationsReadModel;
use chrono::{DateTime, Utc};
use readmodel_core::context::QueryContext;
use readmodel_core::event_log::EventLog;
use readmodel_core::read_model;
use readmodel_events::quota::{NotificationDue, QuotaUnit};
use std::sync::Arc;

/// A notification ready to be handed to delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DueNotification {
    /// Quota (aggregate) id.
    pub aggregate_id: String,
    /// Resource owner of the quota aggregate (the instance).
    pub resource_owner: String,
    /// Unit of the quota.
    pub unit: QuotaUnit,
    /// Notification id.
    pub id: String,
    /// Endpoint to call.
    pub call_url: String,
    /// Start of the current period.
    pub period_start: DateTime<Utc>,
    /// Threshold percent reached.
    pub threshold: u16,
    /// Absolute usage at evaluation time.
    pub used_absolute: u64,
}

impl DueNotification {
    /// Payload the delivery collaborator appends once delivered.
    #[must_use]
    pub fn to_event(&self) -> NotificationDue {
        NotificationDue {
            unit: self.unit,
            id: self.id.clone(),
            call_url: self.call_url.clone(),
            period_start: self.period_start,
            threshold: self.threshold,
            usage: self.used_absolute,
        }
    }
}

/// Evaluate `quota` against recorded thresholds without touching the log.
#[must_use]
pub fn evaluate(
    quota: &Quota,
    resource_owner: &str,
    fired: &NotificationsReadModel,
    used_absolute: u64,
) -> Vec<DueNotification> {
    let used_relative = quota.used_relative(used_absolute);

    quota
        .notifications
        .iter()
        .filter_map(|notification| {
            let threshold = notification.candidate_threshold(used_relative)?;
            if fired.last_fired(&notification.id) >= threshold {
                return None;
            }
            Some(DueNotification {
                aggregate_id: quota.id.clone(),
                resource_owner: resource_owner.to_string(),
                unit: quota.unit,
                id: notification.id.clone(),
                call_url: notification.call_url.clone(),
                period_start: fired.period_start(),
                threshold,
                used_absolute,
            })
        })
        .collect()
}

/// Quota notification engine.
///
/// # Example
///
/// ```ignore
/// let engine = QuotaNotifications::new(log);
/// let start = quota.current_period_start(clock.now());
/// for due in engine.due_notifications(&ctx, &quota, start, used).await? {
///     deliver(due).await?;
/// }
/// ```
#[derive(Clone)]
pub struct QuotaNotifications {
    log: Arc<dyn EventLog>,
    await_open_transactions: bool,
}

impl std::fmt::Debug for QuotaNotifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaNotifications")
            .field("await_open_transactions", &self.await_open_transactions)
            .finish_non_exhaustive()
    }
}

impl QuotaNotifications {
    /// Create an engine reading from `log`.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            log,
            await_open_transactions: true,
        }
    }

    /// Whether reads wait for in-flight commits (on by default).
    #[must_use]
    pub const fn with_await_open_transactions(mut self, enabled: bool) -> Self {
        self.await_open_transactions = enabled;
        self
    }

    /// Notifications of `quota` due at `used_absolute` in the period starting
    /// at `period_start`.
    ///
    /// A quota without notifications returns empty without reading the log.
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidArgument`](readmodel_core::QueryError::InvalidArgument)
    ///   if the quota configuration is invalid
    /// - [`QueryError::Cancelled`](readmodel_core::QueryError::Cancelled) on
    ///   cancellation or deadline
    /// - [`QueryError::Internal`](readmodel_core::QueryError::Internal) on log
    ///   or decoding failures
    #[tracing::instrument(
        skip(self, ctx, quota),
        fields(instance_id = %ctx.instance_id(), quota_id = %quota.id)
    )]
    pub async fn due_notifications(
        &self,
        ctx: &QueryContext,
        quota: &Quota,
        period_start: DateTime<Utc>,
        used_absolute: u64,
    ) -> Result<Vec<DueNotification>> {
        if quota.notifications.is_empty() {
            return Ok(Vec::new());
        }
        quota.validate()?;

        let model = NotificationsReadModel::new(ctx.instance_id(), &quota.id, period_start)
            .with_await_open_transactions(self.await_open_transactions);
        let fired = read_model::load(self.log.as_ref(), ctx, model).await?;

        let due = evaluate(quota, ctx.instance_id(), &fired, used_absolute);
        tracing::debug!(
            used_relative = quota.used_relative(used_absolute),
            due = due.len(),
            "evaluated quota notifications"
        );
        Ok(due)
    }
}
