//! Fetch descriptors for the event log.
//!
//! A [`SearchQuery`] is scoped to one instance and holds one or more
//! [`FilterClause`]s combined with OR. Each clause ANDs its aggregate type,
//! aggregate id and event-type allow-lists; an empty list does not restrict
//! that field. Lower bounds, the resource-owner scope and the read mode apply
//! to the whole query.
//!
//! # Example
//!
//! ```
//! use readmodel_core::search::{FilterClause, SearchQuery};
//! use readmodel_core::event::Position;
//!
//! let query = SearchQuery::new("instance-1")
//!     .position_after(Position::new(42))
//!     .clause(
//!         FilterClause::aggregate("session")
//!             .aggregate_id("session-1")
//!             .event_types(["session.terminated"]),
//!     )
//!     .or(
//!         FilterClause::aggregate("user")
//!             .aggregate_id("user-1")
//!             .event_types(["user.locked", "user.removed"]),
//!     );
//!
//! assert_eq!(query.clauses().len(), 2);
//! ```

use crate::event::{EventMeta, Position};
use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::time::Duration;

/// One AND-combined sub-filter of a [`SearchQuery`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterClause {
    aggregate_types: Vec<String>,
    aggregate_ids: Vec<String>,
    event_types: Vec<String>,
}

impl FilterClause {
    /// Clause over a single aggregate type.
    #[must_use]
    pub fn aggregate(aggregate_type: impl Into<String>) -> Self {
        Self {
            aggregate_types: vec![aggregate_type.into()],
            ..Self::default()
        }
    }

    /// Clause over several aggregate types.
    #[must_use]
    pub fn aggregates<I, S>(aggregate_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aggregate_types: aggregate_types.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Restrict the clause to one more aggregate id.
    #[must_use]
    pub fn aggregate_id(mut self, aggregate_id: impl Into<String>) -> Self {
        self.aggregate_ids.push(aggregate_id.into());
        self
    }

    /// Restrict the clause to the given event types (appends to the allow-list).
    #[must_use]
    pub fn event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types
            .extend(event_types.into_iter().map(Into::into));
        self
    }

    /// Aggregate types this clause accepts (empty = any).
    #[must_use]
    pub fn aggregate_type_list(&self) -> &[String] {
        &self.aggregate_types
    }

    /// Aggregate ids this clause accepts (empty = any).
    #[must_use]
    pub fn aggregate_id_list(&self) -> &[String] {
        &self.aggregate_ids
    }

    /// Event types this clause accepts (empty = any).
    #[must_use]
    pub fn event_type_list(&self) -> &[String] {
        &self.event_types
    }

    /// Whether `meta` satisfies this clause.
    #[must_use]
    pub fn matches(&self, meta: &EventMeta) -> bool {
        allows(&self.aggregate_types, &meta.aggregate_type)
            && allows(&self.aggregate_ids, &meta.aggregate_id)
            && allows(&self.event_types, &meta.event_type)
    }
}

fn allows(list: &[String], value: &str) -> bool {
    list.is_empty() || list.iter().any(|item| item == value)
}

/// Fetch descriptor handed to [`EventLog::filter`](crate::event_log::EventLog::filter).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    instance_id: String,
    clauses: SmallVec<[FilterClause; 2]>,
    position_after: Option<Position>,
    created_since: Option<DateTime<Utc>>,
    resource_owner: Option<String>,
    await_open_transactions: bool,
    consistency_window: Option<Duration>,
}

impl SearchQuery {
    /// Create an empty query for an instance. A query without clauses matches nothing.
    #[must_use]
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            clauses: SmallVec::new(),
            position_after: None,
            created_since: None,
            resource_owner: None,
            await_open_transactions: false,
            consistency_window: None,
        }
    }

    /// Add the first (or another) clause.
    #[must_use]
    pub fn clause(mut self, clause: FilterClause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// OR another clause onto the query. Same as [`SearchQuery::clause`]; reads better in chains.
    #[must_use]
    pub fn or(self, clause: FilterClause) -> Self {
        self.clause(clause)
    }

    /// Only return events whose position is strictly greater than `position`.
    #[must_use]
    pub const fn position_after(mut self, position: Position) -> Self {
        self.position_after = Some(position);
        self
    }

    /// Only return events created at or after `since`.
    #[must_use]
    pub const fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.created_since = Some(since);
        self
    }

    /// Only return events owned by `resource_owner`.
    #[must_use]
    pub fn resource_owner(mut self, resource_owner: impl Into<String>) -> Self {
        self.resource_owner = Some(resource_owner.into());
        self
    }

    /// Wait for in-flight commits touching the filtered aggregates before reading.
    #[must_use]
    pub const fn await_open_transactions(mut self) -> Self {
        self.await_open_transactions = true;
        self
    }

    /// Override the log's default consistency window for this read.
    #[must_use]
    pub const fn consistency_window(mut self, window: Duration) -> Self {
        self.consistency_window = Some(window);
        self
    }

    /// Instance the query is scoped to.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// OR-combined clauses.
    #[must_use]
    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Exclusive position lower bound.
    #[must_use]
    pub const fn position_lower_bound(&self) -> Option<Position> {
        self.position_after
    }

    /// Inclusive creation-date lower bound.
    #[must_use]
    pub const fn created_lower_bound(&self) -> Option<DateTime<Utc>> {
        self.created_since
    }

    /// Resource-owner scope.
    #[must_use]
    pub fn resource_owner_scope(&self) -> Option<&str> {
        self.resource_owner.as_deref()
    }

    /// Whether the read must await open transactions.
    #[must_use]
    pub const fn awaits_open_transactions(&self) -> bool {
        self.await_open_transactions
    }

    /// Explicit consistency window, if any.
    #[must_use]
    pub const fn consistency_window_override(&self) -> Option<Duration> {
        self.consistency_window
    }

    /// Whether `meta` is selected by this query.
    ///
    /// This is the reference semantics every [`EventLog`](crate::event_log::EventLog)
    /// implementation must reproduce.
    #[must_use]
    pub fn matches(&self, meta: &EventMeta) -> bool {
        if meta.instance_id != self.instance_id {
            return false;
        }
        if let Some(after) = self.position_after {
            if meta.position <= after {
                return false;
            }
        }
        if let Some(since) = self.created_since {
            if meta.created_at < since {
                return false;
            }
        }
        if let Some(owner) = &self.resource_owner {
            if &meta.resource_owner != owner {
                return false;
            }
        }
        self.clauses.iter().any(|clause| clause.matches(meta))
    }
}
