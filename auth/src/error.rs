//! Error types for token parsing.

use readmodel_core::QueryError;
use thiserror::Error;

/// Result type alias for validation operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Why a raw token string could not be split into its two segments.
///
/// Callers only ever see [`QueryError::InvalidArgument`] (empty input) or
/// [`QueryError::InvalidToken`] (everything else); the detail stays in logs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenFormatError {
    /// Nothing was supplied.
    #[error("token is empty")]
    Empty,

    /// The token does not contain exactly one
    /// [`TOKEN_DELIMITER`](crate::constants::TOKEN_DELIMITER).
    #[error("token must contain exactly one '.'")]
    Delimiter,

    /// One of the two segments is empty.
    #[error("token segment is empty")]
    EmptySegment,
}

impl From<TokenFormatError> for QueryError {
    fn from(error: TokenFormatError) -> Self {
        match error {
            TokenFormatError::Empty => Self::InvalidArgument(error.to_string()),
            TokenFormatError::Delimiter | TokenFormatError::EmptySegment => Self::InvalidToken,
        }
    }
}
