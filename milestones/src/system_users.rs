//! System versus user event classification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Creator ids the platform itself writes events as.
pub const SYSTEM_SENTINELS: [&str; 5] = ["", "system", "OIDC", "LOGIN", "SYSTEM"];

/// Creators whose events count as system-generated.
///
/// Always includes [`SYSTEM_SENTINELS`]; callers add the ids of known
/// system and machine users. Passed into every tracker call.
///
/// # Example
///
/// ```
/// use readmodel_milestones::SystemUsers;
///
/// let users = SystemUsers::new().with_user("provisioner");
/// assert!(users.is_system("SYSTEM"));
/// assert!(users.is_system("provisioner"));
/// assert!(!users.is_system("alice"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemUsers {
    ids: BTreeSet<String>,
}

impl SystemUsers {
    /// Only the sentinel creators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a known system user.
    #[must_use]
    pub fn with_user(mut self, id: impl Into<String>) -> Self {
        self.ids.insert(id.into());
        self
    }

    /// Whether events created by `creator` are system-generated.
    #[must_use]
    pub fn is_system(&self, creator: &str) -> bool {
        SYSTEM_SENTINELS.contains(&creator) || self.ids.contains(creator)
    }

    /// Caller-supplied ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SystemUsers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}
