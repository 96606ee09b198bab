//! Error types for quota configuration.

use readmodel_core::QueryError;
use thiserror::Error;

/// Result type alias for quota operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// A quota configuration that cannot be evaluated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuotaConfigError {
    /// Amount must be positive; usage is relative to it.
    #[error("quota amount must be greater than zero")]
    ZeroAmount,

    /// Periods must advance.
    #[error("quota reset interval must be at least one millisecond")]
    NonPositiveResetInterval,

    /// A notification at 0 % would fire on every evaluation.
    #[error("notification {id} has a zero percent threshold")]
    ZeroPercent {
        /// Offending notification id
        id: String,
    },

    /// Fired thresholds are tracked per notification id.
    #[error("notification id {id} is used more than once")]
    DuplicateNotification {
        /// Duplicated notification id
        id: String,
    },
}

impl From<QuotaConfigError> for QueryError {
    fn from(error: QuotaConfigError) -> Self {
        Self::InvalidArgument(error.to_string())
    }
}
