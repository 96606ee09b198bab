//! Milestone events and the fixed milestone enumeration.

use crate::payload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate type of milestones (aggregate id = instance id).
pub const AGGREGATE_TYPE: &str = "milestone";

/// Lifecycle milestones an instance can reach.
///
/// The derived `Ord` is the declaration order; sorted milestone lists and
/// their binary search depend on it, so new variants go before
/// `InstanceDeleted` only together with a matching entry in [`MilestoneType::ALL`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MilestoneType {
    /// The instance was set up.
    InstanceCreated,
    /// A user created the first project.
    ProjectCreated,
    /// A user created the first application.
    ApplicationCreated,
    /// Someone authenticated on the instance for the first time.
    AuthenticationSucceededOnInstance,
    /// A human authenticated to a user-created application for the first time.
    AuthenticationSucceededOnApplication,
    /// The instance was removed.
    InstanceDeleted,
}

impl MilestoneType {
    /// Every milestone type, sorted.
    pub const ALL: [Self; 6] = [
        Self::InstanceCreated,
        Self::ProjectCreated,
        Self::ApplicationCreated,
        Self::AuthenticationSucceededOnInstance,
        Self::AuthenticationSucceededOnApplication,
        Self::InstanceDeleted,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InstanceCreated => "instance_created",
            Self::ProjectCreated => "project_created",
            Self::ApplicationCreated => "application_created",
            Self::AuthenticationSucceededOnInstance => "authentication_succeeded_on_instance",
            Self::AuthenticationSucceededOnApplication => "authentication_succeeded_on_application",
            Self::InstanceDeleted => "instance_deleted",
        }
    }
}

impl fmt::Display for MilestoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reached milestone was pushed to telemetry endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pushed {
    /// Which milestone.
    pub milestone_type: MilestoneType,
    /// Endpoints it was delivered to.
    pub endpoints: Vec<String>,
    /// Primary domain reported with the push.
    pub primary_domain: String,
}
payload!(Pushed, AGGREGATE_TYPE, "milestone.pushed");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted_and_complete() {
        let mut sorted = MilestoneType::ALL;
        sorted.sort();
        assert_eq!(sorted, MilestoneType::ALL);

        for milestone in MilestoneType::ALL {
            // Stops compiling when a variant is added; extend ALL with it.
            match milestone {
                MilestoneType::InstanceCreated
                | MilestoneType::ProjectCreated
                | MilestoneType::ApplicationCreated
                | MilestoneType::AuthenticationSucceededOnInstance
                | MilestoneType::AuthenticationSucceededOnApplication
                | MilestoneType::InstanceDeleted => {}
            }
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = MilestoneType::ALL.iter().map(|m| m.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MilestoneType::ALL.len());
    }
}
