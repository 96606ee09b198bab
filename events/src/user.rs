//! User events relevant to token validity and onboarding.

use crate::payload;
use serde::{Deserialize, Serialize};

/// Aggregate type of users.
pub const AGGREGATE_TYPE: &str = "user";

/// User was deactivated.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deactivated {}
payload!(Deactivated, AGGREGATE_TYPE, "user.deactivated");

/// User was locked, e.g. after too many failed attempts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Locked {}
payload!(Locked, AGGREGATE_TYPE, "user.locked");

/// User was removed.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Removed {
    /// Login name at removal time.
    pub user_name: String,
}
payload!(Removed, AGGREGATE_TYPE, "user.removed");

/// Legacy sign-out of a human user on one device.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedOut {
    /// Device fingerprint the sign-out applies to.
    pub user_agent_id: String,
}
payload!(SignedOut, AGGREGATE_TYPE, "user.human.signed.out");

/// A token was issued to the user after a successful authentication.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenAdded {
    /// Token id.
    pub token_id: String,
    /// Client the user authenticated to; empty when issued outside a client.
    pub client_id: String,
    /// Device fingerprint of the authentication.
    pub user_agent_id: String,
}
payload!(TokenAdded, AGGREGATE_TYPE, "user.token.added");
