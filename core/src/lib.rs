//! # Readmodel Core
//!
//! Core traits and types for deriving "what is true right now" from an
//! append-only, per-instance-ordered event log.
//!
//! Instead of reading a mutable row that is updated in place, every answer
//! is computed by folding a filtered, position-ordered slice of the log into
//! a fresh, short-lived read model.
//!
//! ## Core Concepts
//!
//! - **Event**: an immutable fact with a commit [`Position`](event::Position)
//! - **Event Log**: the append-only store, read through [`EventLog`](event_log::EventLog)
//! - **Search Query**: which events a read model needs ([`SearchQuery`](search::SearchQuery))
//! - **Read Model**: a pure fold `(events) → state` ([`ReadModel`](read_model::ReadModel))
//! - **Consistency Guard**: "anything disqualifying after position P?"
//!   ([`ConsistencyGuard`](consistency::ConsistencyGuard))
//! - **Query Context**: instance scope, deadline and cancellation per request
//!
//! ## Architecture Principles
//!
//! - Positions are the only "happened after" signal, never wall-clock time
//! - Read models are created per call and never shared or persisted
//! - Reduction is all-or-nothing
//! - Dependencies (log, clock) are injected
//!
//! ## Example
//!
//! ```ignore
//! use readmodel_core::*;
//!
//! let ctx = QueryContext::new("instance-1").with_timeout(Duration::from_secs(2));
//! let model = read_model::load(log.as_ref(), &ctx, MyReadModel::new("instance-1", "agg-1")).await?;
//!
//! let guard = ConsistencyGuard::new(log.as_ref());
//! let stale = guard
//!     .happened_after(&ctx, model.base().position().unwrap_or_default(), [clause])
//!     .await?;
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod consistency;
pub mod context;
pub mod error;
pub mod event;
pub mod event_log;
pub mod read_model;
pub mod search;

pub use consistency::ConsistencyGuard;
pub use context::QueryContext;
pub use error::{QueryError, ReduceError, Result};
pub use event::{Event, EventError, EventMeta, Position, StoredEvent};
pub use event_log::{EventLog, EventLogError};
pub use read_model::{ReadModel, ReadModelBase};
pub use search::{FilterClause, SearchQuery};

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// by the caller, so consumers stay deterministic under test.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Only expiry checks and period arithmetic read the clock. Ordering
    /// decisions use log positions instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use readmodel_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
