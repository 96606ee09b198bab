//! Read-model engine: fold an ordered slice of the event log into state.
//!
//! # Overview
//!
//! Every derived state in the read layer is a pure function of an ordered
//! prefix of the event log. A consumer describes *which* events it needs
//! ([`ReadModel::query`]) and *how* each one changes its state
//! ([`ReadModel::apply`]); the engine does the rest:
//!
//! ```text
//! ┌───────────┐  query()   ┌───────────┐  ascending   ┌──────────────┐
//! │ ReadModel │──────────▶│ EventLog  │─────────────▶│ reduce(model)│
//! └───────────┘            └───────────┘  positions   └──────┬───────┘
//!       ▲                                                    │
//!       └──────────────── model (only on full success) ──────┘
//! ```
//!
//! # Guarantees
//!
//! - **Replayable**: folding the same sequence into a fresh model always
//!   yields the same state; `apply` must not look at clocks or globals.
//! - **All-or-nothing**: [`reduce`] takes the model by value and only hands it
//!   back when every event was applied, so partial state never escapes.
//! - **Ordered**: events must arrive in strictly ascending position order.
//!
//! # Example
//!
//! ```ignore
//! let model = AccessTokenReadModel::new("instance-1", "V2_oidc-session-1");
//! let model = read_model::load(log.as_ref(), &ctx, model).await?;
//! assert_eq!(model.base().position(), Some(Position::new(3)));
//! ```

use crate::context::QueryContext;
use crate::error::{QueryError, ReduceError, Result};
use crate::event::{Event, EventMeta, Position, StoredEvent};
use crate::event_log::EventLog;
use crate::search::SearchQuery;
use chrono::{DateTime, Utc};

/// State shared by every read model: identity plus fold bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadModelBase {
    aggregate_id: String,
    instance_id: String,
    resource_owner: String,
    applied: Vec<EventMeta>,
    position: Option<Position>,
    creation_date: Option<DateTime<Utc>>,
    change_date: Option<DateTime<Utc>>,
}

impl ReadModelBase {
    /// Base for a fresh model of one aggregate.
    #[must_use]
    pub fn new(instance_id: impl Into<String>, aggregate_id: impl Into<String>) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            instance_id: instance_id.into(),
            ..Self::default()
        }
    }

    /// Base that continues after `position` (for incremental refreshes).
    #[must_use]
    pub const fn starting_after(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Aggregate id the model was created for.
    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    /// Instance the model belongs to.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Resource owner, taken from the first applied event.
    #[must_use]
    pub fn resource_owner(&self) -> &str {
        &self.resource_owner
    }

    /// Headers of the events applied so far, in order.
    #[must_use]
    pub fn applied(&self) -> &[EventMeta] {
        &self.applied
    }

    /// Position of the last applied event (or the starting position).
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        self.position
    }

    /// Creation date of the first applied event.
    #[must_use]
    pub const fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    /// Creation date of the last applied event.
    #[must_use]
    pub const fn change_date(&self) -> Option<DateTime<Utc>> {
        self.change_date
    }

    fn record(&mut self, meta: EventMeta) {
        if self.resource_owner.is_empty() {
            self.resource_owner.clone_from(&meta.resource_owner);
        }
        if self.creation_date.is_none() {
            self.creation_date = Some(meta.created_at);
        }
        self.change_date = Some(meta.created_at);
        self.position = Some(meta.position);
        self.applied.push(meta);
    }
}

/// A consumer-defined fold over a filtered slice of the event log.
///
/// # Example
///
/// ```ignore
/// impl ReadModel for QuotaNotificationsReadModel {
///     type Event = QuotaEvent;
///
///     fn query(&self) -> SearchQuery {
///         SearchQuery::new(self.base.instance_id())
///             .await_open_transactions()
///             .created_since(self.period_start)
///             .clause(FilterClause::aggregate("quota")
///                 .aggregate_id(self.base.aggregate_id())
///                 .event_types(["quota.notification.due"]))
///     }
///
///     fn apply(&mut self, _meta: &EventMeta, event: QuotaEvent) -> Result<(), ReduceError> {
///         match event {
///             QuotaEvent::NotificationDue(due) => { /* ... */ }
///         }
///         Ok(())
///     }
///     // base()/base_mut() omitted
/// }
/// ```
pub trait ReadModel: Send {
    /// Sum type over the subscribed event types.
    type Event: Event;

    /// Whether a missing or non-creating first event means "not found".
    const REQUIRES_CREATION: bool = false;

    /// Fetch descriptor for the events this model needs.
    fn query(&self) -> SearchQuery;

    /// Shared bookkeeping.
    fn base(&self) -> &ReadModelBase;

    /// Shared bookkeeping, mutable.
    fn base_mut(&mut self) -> &mut ReadModelBase;

    /// Apply one decoded event.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::Inconsistent`] if the event contradicts the state.
    fn apply(&mut self, meta: &EventMeta, event: Self::Event) -> std::result::Result<(), ReduceError>;

    /// Whether `event` creates the aggregate. Only consulted with
    /// [`ReadModel::REQUIRES_CREATION`].
    fn is_creation_event(_event: &Self::Event) -> bool {
        false
    }
}

/// Fold `events` into `model`.
///
/// # Errors
///
/// - [`ReduceError::NotFound`] if the model requires a creation event and
///   there are no events or the first one does not create the aggregate
/// - [`ReduceError::OutOfOrder`] if positions do not strictly ascend
/// - [`ReduceError::Decode`] if an event cannot be decoded
/// - any error returned by [`ReadModel::apply`]
///
/// On error the model is dropped.
pub fn reduce<M: ReadModel>(
    mut model: M,
    events: Vec<StoredEvent>,
) -> std::result::Result<M, ReduceError> {
    let fresh = model.base().applied().is_empty() && model.base().position().is_none();
    if M::REQUIRES_CREATION && fresh && events.is_empty() {
        return Err(ReduceError::NotFound);
    }

    for (index, stored) in events.into_iter().enumerate() {
        if let Some(previous) = model.base().position() {
            if stored.position() <= previous {
                return Err(ReduceError::OutOfOrder {
                    previous,
                    next: stored.position(),
                });
            }
        }

        let event = M::Event::decode(&stored)?;
        if M::REQUIRES_CREATION && fresh && index == 0 && !M::is_creation_event(&event) {
            return Err(ReduceError::NotFound);
        }

        let (meta, _) = stored.into_parts();
        model.apply(&meta, event)?;
        model.base_mut().record(meta);
    }

    Ok(model)
}

/// Fetch the events selected by `query` under the context's deadline and cancellation.
///
/// The context's consistency window is applied when the query has none.
///
/// # Errors
///
/// - [`QueryError::Cancelled`] on cancellation or deadline
/// - [`QueryError::Internal`] if the log fails
pub async fn fetch(
    log: &dyn EventLog,
    ctx: &QueryContext,
    query: SearchQuery,
) -> Result<Vec<StoredEvent>> {
    let query = match (ctx.consistency_window(), query.consistency_window_override()) {
        (Some(window), None) => query.consistency_window(window),
        _ => query,
    };

    let events = ctx
        .run(async {
            log.filter(query).await.map_err(|error| {
                tracing::warn!(error = %error, "event log fetch failed");
                QueryError::from(error)
            })
        })
        .await?;

    tracing::debug!(count = events.len(), "fetched events");
    Ok(events)
}

/// Fetch the model's events and fold them.
///
/// # Errors
///
/// - [`QueryError::NotFound`] if the model requires a creation event and none exists
/// - [`QueryError::Cancelled`] on cancellation or deadline
/// - [`QueryError::Internal`] on log or decoding failures
pub async fn load<M: ReadModel>(log: &dyn EventLog, ctx: &QueryContext, model: M) -> Result<M> {
    let events = fetch(log, ctx, model.query()).await?;
    reduce(model, events).map_err(QueryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventError;
    use crate::search::FilterClause;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct Counted {
        by: i64,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum CounterEvent {
        Created,
        Incremented(Counted),
    }

    impl Event for CounterEvent {
        fn decode(event: &StoredEvent) -> std::result::Result<Self, EventError> {
            match event.event_type() {
                "counter.created" => Ok(Self::Created),
                "counter.incremented" => Ok(Self::Incremented(event.payload()?)),
                other => Err(EventError::UnknownEventType(other.to_string())),
            }
        }

        fn event_type(&self) -> &'static str {
            match self {
                Self::Created => "counter.created",
                Self::Incremented(_) => "counter.incremented",
            }
        }
    }

    #[derive(Debug, Default)]
    struct CounterModel {
        base: ReadModelBase,
        total: i64,
    }

    impl ReadModel for CounterModel {
        type Event = CounterEvent;
        const REQUIRES_CREATION: bool = true;

        fn query(&self) -> SearchQuery {
            SearchQuery::new(self.base.instance_id()).clause(
                FilterClause::aggregate("counter").aggregate_id(self.base.aggregate_id()),
            )
        }

        fn base(&self) -> &ReadModelBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ReadModelBase {
            &mut self.base
        }

        fn apply(
            &mut self,
            _meta: &EventMeta,
            event: CounterEvent,
        ) -> std::result::Result<(), ReduceError> {
            match event {
                CounterEvent::Created => {}
                CounterEvent::Incremented(Counted { by }) => {
                    if by < 0 {
                        return Err(ReduceError::Inconsistent("negative increment".to_string()));
                    }
                    self.total += by;
                }
            }
            Ok(())
        }

        fn is_creation_event(event: &CounterEvent) -> bool {
            matches!(event, CounterEvent::Created)
        }
    }

    fn model() -> CounterModel {
        CounterModel {
            base: ReadModelBase::new("instance-1", "counter-1"),
            total: 0,
        }
    }

    fn meta(event_type: &str, position: u64) -> EventMeta {
        EventMeta {
            instance_id: "instance-1".to_string(),
            aggregate_type: "counter".to_string(),
            aggregate_id: "counter-1".to_string(),
            resource_owner: "org-1".to_string(),
            event_type: event_type.to_string(),
            position: Position::new(position),
            created_at: Utc::now(),
            creator: "user-1".to_string(),
        }
    }

    #[allow(clippy::unwrap_used)] // Test code
    fn increment(position: u64, by: i64) -> StoredEvent {
        StoredEvent::encode(meta("counter.incremented", position), &Counted { by }).unwrap()
    }

    fn created(position: u64) -> StoredEvent {
        StoredEvent::new(meta("counter.created", position), Vec::new())
    }

    #[test]
    #[allow(clippy::unwrap_used)] // Test code
    fn folds_in_order_and_tracks_position() {
        let folded = reduce(model(), vec![created(1), increment(4, 2), increment(9, 3)]).unwrap();

        assert_eq!(folded.total, 5);
        assert_eq!(folded.base().position(), Some(Position::new(9)));
        assert_eq!(folded.base().applied().len(), 3);
        assert_eq!(folded.base().resource_owner(), "org-1");
    }

    #[test]
    fn zero_events_is_not_found() {
        assert_eq!(reduce(model(), Vec::new()).err(), Some(ReduceError::NotFound));
    }

    #[test]
    fn first_event_must_create() {
        let result = reduce(model(), vec![increment(1, 1)]);
        assert_eq!(result.err(), Some(ReduceError::NotFound));
    }

    #[test]
    fn out_of_order_positions_are_rejected() {
        let result = reduce(model(), vec![created(5), increment(3, 1)]);
        assert_eq!(
            result.err(),
            Some(ReduceError::OutOfOrder {
                previous: Position::new(5),
                next: Position::new(3),
            })
        );
    }

    #[test]
    fn failing_apply_discards_model() {
        let result = reduce(model(), vec![created(1), increment(2, 4), increment(3, -1)]);
        assert!(matches!(result, Err(ReduceError::Inconsistent(_))));
    }

    #[test]
    fn unsubscribed_event_type_is_a_decode_error() {
        let result = reduce(model(), vec![created(1), created(2).clone_with_type("counter.reset")]);
        assert!(matches!(
            result,
            Err(ReduceError::Decode(EventError::UnknownEventType(_)))
        ));
    }

    trait CloneWithType {
        fn clone_with_type(self, event_type: &str) -> StoredEvent;
    }

    impl CloneWithType for StoredEvent {
        fn clone_with_type(self, event_type: &str) -> StoredEvent {
            let (mut meta, data) = self.into_parts();
            meta.event_type = event_type.to_string();
            StoredEvent::new(meta, data)
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)] // Test code
    fn starting_after_skips_creation_requirement_and_orders_from_start() {
        let mut continued = model();
        continued.base = ReadModelBase::new("instance-1", "counter-1").starting_after(Position::new(10));

        assert!(matches!(
            reduce(continued, vec![increment(10, 1)]),
            Err(ReduceError::OutOfOrder { .. })
        ));

        let mut continued = model();
        continued.base = ReadModelBase::new("instance-1", "counter-1").starting_after(Position::new(10));
        let folded = reduce(continued, vec![increment(11, 1)]).unwrap();
        assert_eq!(folded.total, 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            #[allow(clippy::unwrap_used)] // Test code
            fn folding_twice_from_scratch_is_identical(increments in proptest::collection::vec(0i64..1000, 0..50)) {
                let events: Vec<StoredEvent> = std::iter::once(created(1))
                    .chain(increments.iter().enumerate().map(|(i, by)| increment(i as u64 + 2, *by)))
                    .collect();

                let first = reduce(model(), events.clone()).unwrap();
                let second = reduce(model(), events).unwrap();

                prop_assert_eq!(first.total, second.total);
                prop_assert_eq!(first.base(), second.base());
            }
        }
    }
}
