//! Event catalogue for the read layer.
//!
//! This crate names every event type the read-side consumers subscribe to and
//! defines the payload each one carries. Writers (outside this workspace)
//! append these facts; the consumers fold them.
//!
//! # Aggregates
//!
//! - **instance**: lifecycle and primary domain of a tenant
//! - **project**: projects, applications and their client configs
//! - **user**: account state changes and issued tokens
//! - **session**: interactive login sessions
//! - **oidc_session**: OIDC sessions holding access and refresh tokens
//! - **quota**: notifications fired for usage thresholds
//! - **milestone**: milestones pushed to telemetry endpoints
//!
//! # Naming
//!
//! Event types are dotted, lowercase, and prefixed with the aggregate type
//! (`"oidc_session.access_token.added"`). Names are stable; a changed payload
//! shape gets a new event type.

use serde::{Serialize, de::DeserializeOwned};

/// A typed event payload bound to its aggregate and event type.
///
/// # Example
///
/// ```
/// use readmodel_events::{Payload, session::Terminated};
///
/// assert_eq!(Terminated::AGGREGATE_TYPE, "session");
/// assert_eq!(Terminated::EVENT_TYPE, "session.terminated");
/// ```
pub trait Payload: Serialize + DeserializeOwned + Send + 'static {
    /// Aggregate type the event is appended to.
    const AGGREGATE_TYPE: &'static str;

    /// Event type name.
    const EVENT_TYPE: &'static str;
}

/// Implements [`Payload`] for a struct.
macro_rules! payload {
    ($ty:ty, $aggregate:expr, $event:expr) => {
        impl $crate::Payload for $ty {
            const AGGREGATE_TYPE: &'static str = $aggregate;
            const EVENT_TYPE: &'static str = $event;
        }
    };
}

pub(crate) use payload;

pub mod instance;
pub mod milestone;
pub mod oidc_session;
pub mod project;
pub mod quota;
pub mod session;
pub mod user;
