//! Event envelope types for the append-only event log.
//!
//! Every fact in the log is a [`StoredEvent`]: a metadata header ([`EventMeta`])
//! plus a bincode-encoded payload. The header carries everything the log can
//! filter on; the payload is opaque to the log and decoded by the consumer
//! that subscribed to the event type.
//!
//! # Design
//!
//! Consumers never fold raw [`StoredEvent`]s. Each consumer declares a sum type
//! implementing [`Event`] that lists exactly the event types it subscribes to,
//! so the fold is an exhaustive `match` and a new event type without a handler
//! is a compile error.
//!
//! # Example
//!
//! ```
//! use readmodel_core::event::{Event, EventError, StoredEvent};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
//! struct Renamed {
//!     name: String,
//! }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum OrgEvent {
//!     Renamed(Renamed),
//! }
//!
//! impl Event for OrgEvent {
//!     fn decode(event: &StoredEvent) -> Result<Self, EventError> {
//!         match event.event_type() {
//!             "org.renamed" => Ok(Self::Renamed(event.payload()?)),
//!             other => Err(EventError::UnknownEventType(other.to_string())),
//!         }
//!     }
//!
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             Self::Renamed(_) => "org.renamed",
//!         }
//!     }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event encoding and decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Failed to serialize a payload to bytes.
    #[error("Failed to serialize event payload: {0}")]
    SerializationError(String),

    /// Failed to deserialize a payload from bytes.
    #[error("Failed to deserialize event payload: {0}")]
    DeserializationError(String),

    /// The event type is not part of the consumer's subscription.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// Commit position of an event within one instance's log.
///
/// Positions are assigned by the log at commit time and strictly increase
/// per instance. They are the only ordering signal used for "happened after"
/// decisions; wall-clock creation dates are never compared for that purpose.
///
/// # Examples
///
/// ```
/// use readmodel_core::event::Position;
///
/// let first = Position::new(10);
/// let second = Position::new(11);
/// assert!(second > first);
/// assert_eq!(Position::ZERO.value(), 0);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(u64);

impl Position {
    /// The position before any event was committed.
    pub const ZERO: Self = Self(0);

    /// Create a position from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw position value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The next position (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Position {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Header of a stored event: everything the log can filter on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Instance (tenant) the event belongs to.
    pub instance_id: String,

    /// Aggregate type, e.g. `"oidc_session"` or `"quota"`.
    pub aggregate_type: String,

    /// Aggregate identifier; the unit of identity and ordering.
    pub aggregate_id: String,

    /// Organization (or instance) owning the aggregate.
    pub resource_owner: String,

    /// Event type, e.g. `"oidc_session.access_token.added"`.
    pub event_type: String,

    /// Commit position assigned by the log.
    pub position: Position,

    /// Creation time as recorded by the writer.
    pub created_at: DateTime<Utc>,

    /// Identity of whoever caused the event (user id, or a system sentinel).
    pub creator: String,
}

/// An event as returned by the log: header plus encoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEvent {
    meta: EventMeta,
    data: Vec<u8>,
}

impl StoredEvent {
    /// Create a stored event from a header and already encoded payload bytes.
    #[must_use]
    pub const fn new(meta: EventMeta, data: Vec<u8>) -> Self {
        Self { meta, data }
    }

    /// Encode `payload` with bincode and wrap it with `meta`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the payload cannot be encoded.
    pub fn encode<T: Serialize>(meta: EventMeta, payload: &T) -> Result<Self, EventError> {
        let data =
            bincode::serialize(payload).map_err(|e| EventError::SerializationError(e.to_string()))?;
        Ok(Self { meta, data })
    }

    /// Decode the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes do not decode as `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, EventError> {
        bincode::deserialize(&self.data).map_err(|e| EventError::DeserializationError(e.to_string()))
    }

    /// Header of this event.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        &self.meta
    }

    /// Shortcut for `meta().event_type`.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.meta.event_type
    }

    /// Shortcut for `meta().position`.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.meta.position
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Split into header and payload bytes.
    #[must_use]
    pub fn into_parts(self) -> (EventMeta, Vec<u8>) {
        (self.meta, self.data)
    }
}

impl fmt::Display for StoredEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoredEvent {{ type: {}, aggregate: {}/{}, position: {}, size: {} bytes }}",
            self.meta.event_type,
            self.meta.aggregate_type,
            self.meta.aggregate_id,
            self.meta.position,
            self.data.len()
        )
    }
}

/// A consumer-defined sum type over the event types one read model subscribes to.
///
/// Event type names are stable strings; payloads are versioned by adding new
/// event types rather than changing existing payload shapes.
pub trait Event: Sized + Send + 'static {
    /// Decode a stored event into this sum type.
    ///
    /// # Errors
    ///
    /// - [`EventError::UnknownEventType`] if the event type is not subscribed
    /// - [`EventError::DeserializationError`] if the payload is malformed
    fn decode(event: &StoredEvent) -> Result<Self, EventError>;

    /// The event type name of this variant.
    fn event_type(&self) -> &'static str;
}
