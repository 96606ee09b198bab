//! In-memory event log for fast, deterministic tests.
//!
//! - [`InMemoryEventLog`]: assigns strictly increasing positions on commit and
//!   answers [`SearchQuery`]s with the exact reference filter semantics
//! - [`PendingTransaction`]: events appended but not yet committed, to exercise
//!   the "await open transactions" read mode
//! - [`EventBuilder`]: typed payload + header defaults

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use chrono::{DateTime, Utc};
use readmodel_core::event::{EventMeta, Position, StoredEvent};
use readmodel_core::event_log::{EventLog, EventLogError};
use readmodel_core::search::SearchQuery;
use readmodel_events::Payload;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;

/// Default instance id used by [`EventBuilder`].
pub const TEST_INSTANCE: &str = "instance-1";

/// Default resource owner used by [`EventBuilder`].
pub const TEST_OWNER: &str = "org-1";

/// Default creator used by [`EventBuilder`] (a regular user).
pub const TEST_CREATOR: &str = "user-1";

/// Builder for an event to append to an [`InMemoryEventLog`].
///
/// # Example
///
/// ```
/// use readmodel_testing::EventBuilder;
/// use readmodel_events::session::Terminated;
///
/// let builder = EventBuilder::new("session-1", &Terminated {})
///     .creator("admin-7")
///     .owner("org-2");
/// assert_eq!(builder.event_type(), "session.terminated");
/// ```
#[derive(Clone, Debug)]
pub struct EventBuilder {
    instance_id: String,
    aggregate_type: String,
    aggregate_id: String,
    resource_owner: String,
    event_type: String,
    created_at: Option<DateTime<Utc>>,
    creator: String,
    data: Vec<u8>,
}

impl EventBuilder {
    /// Event carrying `payload` on aggregate `aggregate_id`.
    #[must_use]
    pub fn new<P: Payload>(aggregate_id: impl Into<String>, payload: &P) -> Self {
        Self {
            instance_id: TEST_INSTANCE.to_string(),
            aggregate_type: P::AGGREGATE_TYPE.to_string(),
            aggregate_id: aggregate_id.into(),
            resource_owner: TEST_OWNER.to_string(),
            event_type: P::EVENT_TYPE.to_string(),
            created_at: None,
            creator: TEST_CREATOR.to_string(),
            data: bincode::serialize(payload).unwrap(),
        }
    }

    /// Override the instance id.
    #[must_use]
    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Override the resource owner.
    #[must_use]
    pub fn owner(mut self, resource_owner: impl Into<String>) -> Self {
        self.resource_owner = resource_owner.into();
        self
    }

    /// Override the creator.
    #[must_use]
    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Fix the creation time (defaults to the time of commit).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Event type this builder produces.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Build the stored event at `position`.
    #[must_use]
    pub fn build(self, position: Position) -> StoredEvent {
        let meta = EventMeta {
            instance_id: self.instance_id,
            aggregate_type: self.aggregate_type,
            aggregate_id: self.aggregate_id,
            resource_owner: self.resource_owner,
            event_type: self.event_type,
            position,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            creator: self.creator,
        };
        StoredEvent::new(meta, self.data)
    }
}

#[derive(Debug, Default)]
struct LogState {
    events: Vec<StoredEvent>,
    last_position: Position,
    queries: Vec<SearchQuery>,
    fail_next: Option<EventLogError>,
}

/// In-memory event log for testing.
///
/// Cloning shares the same log, so a test can keep a handle while the
/// consumer under test holds an `Arc<dyn EventLog>`.
///
/// # Example
///
/// ```
/// use readmodel_testing::{EventBuilder, InMemoryEventLog};
/// use readmodel_core::event_log::EventLog;
/// use readmodel_core::search::{FilterClause, SearchQuery};
/// use readmodel_events::session::Terminated;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let log = InMemoryEventLog::new();
/// let position = log.append(EventBuilder::new("session-1", &Terminated {}));
///
/// let events = log
///     .filter(SearchQuery::new("instance-1").clause(FilterClause::aggregate("session")))
///     .await?;
/// assert_eq!(events[0].position(), position);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryEventLog {
    state: Arc<RwLock<LogState>>,
    open_transactions: Arc<watch::Sender<usize>>,
    fetch_delay: Option<Duration>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        let (open_transactions, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(LogState::default())),
            open_transactions: Arc::new(open_transactions),
            fetch_delay: None,
        }
    }

    /// Delay every fetch by `delay` (to exercise deadlines and cancellation).
    #[must_use]
    pub const fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Commit one event and return its position.
    pub fn append(&self, event: EventBuilder) -> Position {
        let mut state = self.state.write().unwrap();
        let position = state.last_position.next();
        state.last_position = position;
        state.events.push(event.build(position));
        position
    }

    /// Commit several events atomically, in order.
    pub fn append_all(&self, events: impl IntoIterator<Item = EventBuilder>) -> Vec<Position> {
        let mut state = self.state.write().unwrap();
        events
            .into_iter()
            .map(|event| {
                let position = state.last_position.next();
                state.last_position = position;
                state.events.push(event.build(position));
                position
            })
            .collect()
    }

    /// Open a transaction whose events stay invisible until committed.
    #[must_use]
    pub fn begin(&self) -> PendingTransaction {
        self.open_transactions.send_modify(|open| *open += 1);
        PendingTransaction {
            log: self.clone(),
            events: Vec::new(),
            open: true,
        }
    }

    /// Make the next fetch fail with `error`.
    pub fn fail_next_fetch(&self, error: EventLogError) {
        self.state.write().unwrap().fail_next = Some(error);
    }

    /// Number of fetches served so far (including failed ones).
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.state.read().unwrap().queries.len()
    }

    /// Every query received so far, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.state.read().unwrap().queries.clone()
    }

    /// The most recent query, if any.
    #[must_use]
    pub fn last_query(&self) -> Option<SearchQuery> {
        self.state.read().unwrap().queries.last().cloned()
    }

    /// Number of committed events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().unwrap().events.len()
    }

    /// Check if no event was committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().unwrap().events.is_empty()
    }

    /// Position of the last committed event.
    #[must_use]
    pub fn last_position(&self) -> Position {
        self.state.read().unwrap().last_position
    }

    fn close_transaction(&self) {
        self.open_transactions
            .send_modify(|open| *open = open.saturating_sub(1));
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for InMemoryEventLog {
    fn filter(
        &self,
        query: SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<StoredEvent>, EventLogError>> + Send + '_>> {
        Box::pin(async move {
            {
                let mut state = self.state.write().unwrap();
                state.queries.push(query.clone());
                if let Some(error) = state.fail_next.take() {
                    return Err(error);
                }
            }

            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }

            if query.awaits_open_transactions() {
                let mut open = self.open_transactions.subscribe();
                open.wait_for(|count| *count == 0)
                    .await
                    .map_err(|e| EventLogError::AwaitTimeout(e.to_string()))?;
            }

            let state = self.state.read().unwrap();
            Ok(state
                .events
                .iter()
                .filter(|event| query.matches(event.meta()))
                .cloned()
                .collect())
        })
    }
}

/// Events staged in an open transaction.
///
/// Dropping without [`PendingTransaction::commit`] rolls back.
#[derive(Debug)]
pub struct PendingTransaction {
    log: InMemoryEventLog,
    events: Vec<EventBuilder>,
    open: bool,
}

impl PendingTransaction {
    /// Stage an event.
    pub fn push(&mut self, event: EventBuilder) {
        self.events.push(event);
    }

    /// Commit the staged events and close the transaction.
    pub fn commit(mut self) -> Vec<Position> {
        let events = std::mem::take(&mut self.events);
        let positions = self.log.append_all(events);
        self.open = false;
        self.log.close_transaction();
        positions
    }

    /// Discard the staged events and close the transaction.
    pub fn rollback(self) {
        drop(self);
    }
}

impl Drop for PendingTransaction {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.log.close_transaction();
        }
    }
}
