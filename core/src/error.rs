//! Error taxonomy returned by every query consumer.

use crate::event::{EventError, Position};
use crate::event_log::EventLogError;
use thiserror::Error;

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors surfaced to callers of the read layer.
///
/// Consumers translate their domain conditions into this taxonomy before
/// returning. Raw payloads and log positions never appear in the messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The aggregate never existed.
    #[error("Not found")]
    NotFound,

    /// Malformed input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The token is not valid. Deliberately coarse: malformed tokens, unknown
    /// or revoked ids and terminations after the snapshot all map here.
    #[error("Invalid token")]
    InvalidToken,

    /// The token's deadline has passed.
    #[error("Token has expired")]
    Expired,

    /// The caller abandoned the request or its deadline elapsed mid-fetch.
    #[error("Request cancelled")]
    Cancelled,

    /// Event log, storage or decoding failure. Callers own retry policy.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Returns `true` if the error is caused by the caller's input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use readmodel_core::QueryError;
    /// assert!(QueryError::InvalidToken.is_user_error());
    /// assert!(!QueryError::Internal("db down".to_string()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::InvalidToken | Self::Expired | Self::NotFound
        )
    }

    /// Returns `true` if retrying the same request may succeed.
    ///
    /// Nothing in this workspace retries automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<EventLogError> for QueryError {
    fn from(error: EventLogError) -> Self {
        Self::Internal(error.to_string())
    }
}

/// Errors raised while folding events into a read model.
///
/// A reduction that fails discards the partially folded model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReduceError {
    /// The aggregate has no events, or its first event is not a creation event.
    #[error("Aggregate not found")]
    NotFound,

    /// A payload could not be decoded into the consumer's event type.
    #[error("Failed to decode event: {0}")]
    Decode(#[from] EventError),

    /// The log returned events out of ascending position order.
    #[error("Event at position {next} does not follow position {previous}")]
    OutOfOrder {
        /// Position of the last applied event.
        previous: Position,
        /// Position of the offending event.
        next: Position,
    },

    /// A consumer rejected an event as inconsistent with its state.
    #[error("Inconsistent event: {0}")]
    Inconsistent(String),
}

impl From<ReduceError> for QueryError {
    fn from(error: ReduceError) -> Self {
        match error {
            ReduceError::NotFound => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_failures_become_internal() {
        let error: QueryError = EventLogError::DatabaseError("boom".to_string()).into();
        assert!(matches!(error, QueryError::Internal(ref msg) if msg.contains("boom")));
        assert!(error.is_retryable());
    }

    #[test]
    fn missing_aggregate_becomes_not_found() {
        let error: QueryError = ReduceError::NotFound.into();
        assert_eq!(error, QueryError::NotFound);
        assert!(!error.is_retryable());
    }

    #[test]
    fn out_of_order_is_internal() {
        let error: QueryError = ReduceError::OutOfOrder {
            previous: Position::new(5),
            next: Position::new(3),
        }
        .into();
        assert!(matches!(error, QueryError::Internal(_)));
    }

    #[test]
    fn token_errors_do_not_leak_details() {
        assert_eq!(QueryError::InvalidToken.to_string(), "Invalid token");
        assert_eq!(QueryError::Expired.to_string(), "Token has expired");
    }
}
