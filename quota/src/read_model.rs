//! Fired-notification read model.
//!
//! Folds the `quota.notification.due` events of one quota within one period
//! into "highest threshold fired so far, per notification id".

use chrono::{DateTime, Utc};
use readmodel_core::event::{Event, EventError, EventMeta, StoredEvent};
use readmodel_core::read_model::{ReadModel, ReadModelBase};
use readmodel_core::search::{FilterClause, SearchQuery};
use readmodel_core::ReduceError;
use readmodel_events::Payload;
use readmodel_events::quota::{self, NotificationDue};
use std::collections::HashMap;

/// Events the notification read model subscribes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuotaEvent {
    /// A notification fired.
    NotificationDue(NotificationDue),
}

impl Event for QuotaEvent {
    fn decode(event: &StoredEvent) -> Result<Self, EventError> {
        match event.event_type() {
            NotificationDue::EVENT_TYPE => Ok(Self::NotificationDue(event.payload()?)),
            other => Err(EventError::UnknownEventType(other.to_string())),
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::NotificationDue(_) => NotificationDue::EVENT_TYPE,
        }
    }
}

/// Highest fired threshold per notification id within one period.
#[derive(Clone, Debug)]
pub struct NotificationsReadModel {
    base: ReadModelBase,
    period_start: DateTime<Utc>,
    await_open_transactions: bool,
    latest_due_thresholds: HashMap<String, u16>,
}

impl NotificationsReadModel {
    /// Fresh model for quota `quota_id` in the period starting at `period_start`.
    #[must_use]
    pub fn new(
        instance_id: impl Into<String>,
        quota_id: impl Into<String>,
        period_start: DateTime<Utc>,
    ) -> Self {
        Self {
            base: ReadModelBase::new(instance_id, quota_id),
            period_start,
            await_open_transactions: true,
            latest_due_thresholds: HashMap::new(),
        }
    }

    /// Whether the fetch waits for in-flight commits (on by default).
    #[must_use]
    pub const fn with_await_open_transactions(mut self, enabled: bool) -> Self {
        self.await_open_transactions = enabled;
        self
    }

    /// Last fired threshold of `notification_id`, 0 if it never fired this period.
    #[must_use]
    pub fn last_fired(&self, notification_id: &str) -> u16 {
        self.latest_due_thresholds
            .get(notification_id)
            .copied()
            .unwrap_or_default()
    }

    /// Start of the period the model covers.
    #[must_use]
    pub const fn period_start(&self) -> DateTime<Utc> {
        self.period_start
    }
}

impl ReadModel for NotificationsReadModel {
    type Event = QuotaEvent;

    fn query(&self) -> SearchQuery {
        let query = SearchQuery::new(self.base.instance_id())
            .created_since(self.period_start)
            .clause(
                FilterClause::aggregate(quota::AGGREGATE_TYPE)
                    .aggregate_id(self.base.aggregate_id())
                    .event_types([NotificationDue::EVENT_TYPE]),
            );
        if self.await_open_transactions {
            query.await_open_transactions()
        } else {
            query
        }
    }

    fn base(&self) -> &ReadModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ReadModelBase {
        &mut self.base
    }

    fn apply(&mut self, _meta: &EventMeta, event: QuotaEvent) -> Result<(), ReduceError> {
        match event {
            QuotaEvent::NotificationDue(due) => {
                // Fired for an earlier period but committed late.
                if due.period_start != self.period_start {
                    return Ok(());
                }
                let recorded = self.latest_due_thresholds.entry(due.id).or_default();
                *recorded = (*recorded).max(due.threshold);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmodel_core::environment::Clock;
    use readmodel_events::quota::QuotaUnit;
    use readmodel_testing::{EventBuilder, ReadModelTest, test_clock};

    fn due(id: &str, threshold: u16, period_start: DateTime<Utc>) -> EventBuilder {
        EventBuilder::new(
            "quota-1",
            &NotificationDue {
                unit: QuotaUnit::RequestsAllAuthenticated,
                id: id.to_string(),
                call_url: "https://hooks.example".to_string(),
                period_start,
                threshold,
                usage: 0,
            },
        )
    }

    fn model() -> NotificationsReadModel {
        NotificationsReadModel::new("instance-1", "quota-1", test_clock().now())
    }

    #[test]
    fn test_records_highest_threshold_per_id() {
        let start = test_clock().now();
        ReadModelTest::new(model())
            .given_events([due("a", 80, start), due("a", 160, start), due("b", 50, start)])
            .then_model(|model| {
                assert_eq!(model.last_fired("a"), 160);
                assert_eq!(model.last_fired("b"), 50);
                assert_eq!(model.last_fired("c"), 0);
            })
            .run();
    }

    #[test]
    fn test_record_never_decreases() {
        let start = test_clock().now();
        ReadModelTest::new(model())
            .given_events([due("a", 160, start), due("a", 80, start)])
            .then_model(|model| assert_eq!(model.last_fired("a"), 160))
            .run();
    }

    #[test]
    fn test_other_period_is_ignored() {
        let start = test_clock().now();
        ReadModelTest::new(model())
            .given_events([due("a", 80, start - chrono::Duration::days(30))])
            .then_model(|model| assert_eq!(model.last_fired("a"), 0))
            .run();
    }

    #[test]
    fn test_no_events_is_not_an_error() {
        ReadModelTest::new(model())
            .then_model(|model| assert_eq!(model.last_fired("a"), 0))
            .run();
    }

    #[test]
    fn test_query_scopes_period_and_waits_for_commits() {
        let query = model().query();
        assert_eq!(query.created_lower_bound(), Some(test_clock().now()));
        assert!(query.awaits_open_transactions());
        assert_eq!(query.clauses()[0].aggregate_id_list(), ["quota-1"]);

        let relaxed = model().with_await_open_transactions(false).query();
        assert!(!relaxed.awaits_open_transactions());
    }
}
