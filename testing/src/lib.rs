//! # Readmodel Testing
//!
//! Testing utilities and helpers for the read layer.
//!
//! This crate provides:
//! - An in-memory [`EventLog`](readmodel_core::event_log::EventLog) with
//!   open-transaction simulation and failure injection
//! - Typed event builders with sensible header defaults
//! - A fixed clock for deterministic expiry and period arithmetic
//! - A Given-Then harness for read-model folds
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use readmodel_testing::{EventBuilder, InMemoryEventLog, test_clock};
//!
//! #[tokio::test]
//! async fn test_revoked_token_is_invalid() {
//!     let log = InMemoryEventLog::new();
//!     log.append(EventBuilder::new("V2_s1", &session_added()));
//!     log.append(EventBuilder::new("V2_s1", &AccessTokenRevoked {}));
//!
//!     let validator = AccessTokenValidator::new(Arc::new(log), Arc::new(test_clock()));
//!     let result = validator.validate_access_token(&ctx, "V2_s1.at-1").await;
//!     assert_eq!(result.unwrap_err(), QueryError::InvalidToken);
//! }
//! ```

use chrono::{DateTime, Utc};
use readmodel_core::environment::Clock;

pub mod event_log_mocks;
pub mod read_model_test;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use readmodel_testing::mocks::FixedClock;
    /// use readmodel_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Install a test-friendly tracing subscriber.
    ///
    /// Output is captured per test and filtered by `RUST_LOG`. Safe to call
    /// from every test; only the first call installs the subscriber.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Strictly increasing positions, starting at 1, with random gaps.
    pub fn ascending_positions(max_len: usize) -> impl Strategy<Value = Vec<u64>> {
        proptest::collection::vec(1u64..5, 0..max_len).prop_map(|gaps| {
            gaps.into_iter()
                .scan(0u64, |position, gap| {
                    *position += gap;
                    Some(*position)
                })
                .collect()
        })
    }

    /// Notification thresholds in percent (may exceed 100).
    pub fn threshold() -> impl Strategy<Value = u16> {
        1u16..=300
    }

    /// Identifiers of the shape used across the log (`[a-z0-9-]`).
    pub fn identifier() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9-]{0,15}"
    }
}

// Re-export commonly used items
pub use event_log_mocks::{EventBuilder, InMemoryEventLog, PendingTransaction};
pub use helpers::init_test_tracing;
pub use mocks::{FixedClock, test_clock};
pub use read_model_test::ReadModelTest;
