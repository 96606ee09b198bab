//! Instance (tenant) lifecycle events.

use crate::payload;
use serde::{Deserialize, Serialize};

/// Aggregate type of instances.
pub const AGGREGATE_TYPE: &str = "instance";

/// Instance was set up.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Added {
    /// Display name.
    pub name: String,
}
payload!(Added, AGGREGATE_TYPE, "instance.added");

/// Instance's primary domain was set or changed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrimaryDomainSet {
    /// The new primary domain.
    pub domain: String,
}
payload!(PrimaryDomainSet, AGGREGATE_TYPE, "instance.domain.primary.set");

/// Instance was removed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Removed {
    /// Display name at removal time.
    pub name: String,
}
payload!(Removed, AGGREGATE_TYPE, "instance.removed");
