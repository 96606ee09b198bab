//! Interactive login session events.

use crate::payload;
use serde::{Deserialize, Serialize};

/// Aggregate type of login sessions.
pub const AGGREGATE_TYPE: &str = "session";

/// Session was explicitly terminated (logout or admin action).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Terminated {}
payload!(Terminated, AGGREGATE_TYPE, "session.terminated");
