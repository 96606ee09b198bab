//! Consistency guard: "has anything disqualifying happened after position P?"
//!
//! A security decision taken from a read model is only as fresh as the
//! snapshot it was folded from. Between that snapshot and the caller acting
//! on the answer, a disqualifying event (a revocation, a termination) can be
//! committed. The guard re-queries the log for such events *after* the
//! snapshot's position only, which is cheap: it never re-reads history.
//!
//! ```text
//! snapshot read ──▶ position P ──▶ checks pass ──▶ guard: any match > P ?
//!                                                   │
//!                                    yes ◀──────────┴──────────▶ no
//!                                  reject                       accept
//! ```
//!
//! Positions, never creation dates, decide "after".

use crate::context::QueryContext;
use crate::error::Result;
use crate::event::{Position, StoredEvent};
use crate::event_log::EventLog;
use crate::read_model::fetch;
use crate::search::{FilterClause, SearchQuery};

/// Re-check for disqualifying events committed after a snapshot position.
#[derive(Clone, Copy)]
pub struct ConsistencyGuard<'a> {
    log: &'a dyn EventLog,
}

impl std::fmt::Debug for ConsistencyGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyGuard").finish_non_exhaustive()
    }
}

impl<'a> ConsistencyGuard<'a> {
    /// Create a guard over `log`.
    #[must_use]
    pub const fn new(log: &'a dyn EventLog) -> Self {
        Self { log }
    }

    /// Events matching any of `clauses` with a position greater than `after`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Cancelled`](crate::QueryError::Cancelled) or
    /// [`QueryError::Internal`](crate::QueryError::Internal) from the fetch.
    pub async fn events_after<I>(
        &self,
        ctx: &QueryContext,
        after: Position,
        clauses: I,
    ) -> Result<Vec<StoredEvent>>
    where
        I: IntoIterator<Item = FilterClause>,
    {
        let query = clauses
            .into_iter()
            .fold(
                SearchQuery::new(ctx.instance_id()).position_after(after),
                SearchQuery::or,
            );
        if query.clauses().is_empty() {
            return Ok(Vec::new());
        }
        fetch(self.log, ctx, query).await
    }

    /// Whether any event matching `clauses` was committed after `after`.
    ///
    /// # Errors
    ///
    /// Same as [`ConsistencyGuard::events_after`].
    pub async fn happened_after<I>(
        &self,
        ctx: &QueryContext,
        after: Position,
        clauses: I,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = FilterClause>,
    {
        self.happened_after_matching(ctx, after, clauses, |_| true)
            .await
    }

    /// Like [`ConsistencyGuard::happened_after`], but an event only counts if
    /// `predicate` accepts it (e.g. a payload field must match).
    ///
    /// # Errors
    ///
    /// Same as [`ConsistencyGuard::events_after`].
    pub async fn happened_after_matching<I, F>(
        &self,
        ctx: &QueryContext,
        after: Position,
        clauses: I,
        predicate: F,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = FilterClause>,
        F: Fn(&StoredEvent) -> bool,
    {
        let events = self.events_after(ctx, after, clauses).await?;
        Ok(events.iter().any(predicate))
    }
}
