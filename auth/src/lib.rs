//! # Readmodel Auth
//!
//! Access token validation derived from the event log.
//!
//! An opaque access token names an OIDC session and one access token id
//! inside it. Validation folds the session's lifecycle events, checks the
//! token is the session's current one and unexpired, then re-checks the log
//! for terminations committed after the snapshot it read.
//!
//! ## Failure taxonomy
//!
//! - **InvalidToken**: malformed, unknown, replaced, revoked, or terminated
//!   after the snapshot. Deliberately one error so a prober cannot tell
//!   which check failed.
//! - **Expired**: past its expiration.
//! - **Internal**: the log failed.
//!
//! ## Example
//!
//! ```rust,ignore
//! use readmodel_auth::AccessTokenValidator;
//!
//! let validator = AccessTokenValidator::new(log, clock);
//! match validator.validate_access_token(&ctx, "V2_sess1.tok1").await {
//!     Ok(state) => println!("user {}", state.user_id),
//!     Err(QueryError::Expired) => refresh(),
//!     Err(_) => reject(),
//! }
//! ```

pub mod constants;
pub mod error;
pub mod read_model;
pub mod state;
mod termination;
pub mod token;
pub mod validator;

// Re-export main types for convenience
pub use error::{Result, TokenFormatError};
pub use read_model::{AccessTokenReadModel, OidcSessionEvent};
pub use state::TokenState;
pub use token::AccessToken;
pub use validator::AccessTokenValidator;
