//! Event log contract.
//!
//! The event log is the append-only, per-instance store every read model is
//! derived from. This crate only reads from it; appending is the business of
//! command-side writers and of test doubles.
//!
//! # Implementations
//!
//! - SQL-backed log (external collaborator, not part of this workspace)
//! - `InMemoryEventLog` (in `readmodel-testing`): fast, deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use readmodel_core::event_log::{EventLog, EventLogError};
//! use readmodel_core::search::{FilterClause, SearchQuery};
//!
//! async fn example<L: EventLog>(log: &L) -> Result<(), EventLogError> {
//!     let query = SearchQuery::new("instance-1")
//!         .clause(FilterClause::aggregate("oidc_session").aggregate_id("V2_abc"));
//!
//!     let events = log.filter(query).await?;
//!     for event in &events {
//!         println!("{event}");
//!     }
//!     Ok(())
//! }
//! ```

use crate::event::StoredEvent;
use crate::search::SearchQuery;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur while reading from the event log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Timed out waiting for open transactions to commit.
    #[error("Timed out awaiting open transactions: {0}")]
    AwaitTimeout(String),

    /// Stored data could not be read back.
    #[error("Corrupt event data: {0}")]
    Corrupt(String),
}

/// Read access to the append-only event log.
///
/// # Contract
///
/// - Results contain exactly the events selected by
///   [`SearchQuery::matches`](crate::search::SearchQuery::matches).
/// - Results are ordered by ascending position.
/// - With `await_open_transactions`, the read blocks until transactions that
///   were in flight when the read started are committed or rolled back.
/// - A non-existent aggregate yields an empty vector, not an error.
///
/// # Dyn Compatibility
///
/// The trait returns `Pin<Box<dyn Future>>` instead of using `async fn` so
/// that consumers can hold an `Arc<dyn EventLog>`.
pub trait EventLog: Send + Sync {
    /// Fetch all events selected by `query` in ascending position order.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: the backing store failed
    /// - `AwaitTimeout`: open transactions did not settle in time
    /// - `Corrupt`: stored rows could not be decoded into events
    fn filter(
        &self,
        query: SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<StoredEvent>, EventLogError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_error_display() {
        let error = EventLogError::DatabaseError("connection refused".to_string());
        assert_eq!(format!("{error}"), "Database error: connection refused");
    }

    #[test]
    fn await_timeout_display() {
        let error = EventLogError::AwaitTimeout("quota q1".to_string());
        assert!(format!("{error}").contains("quota q1"));
    }
}
