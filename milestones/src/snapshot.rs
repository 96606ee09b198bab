//! Milestones of one instance.

use chrono::{DateTime, Utc};
use readmodel_core::Position;
use readmodel_events::milestone::MilestoneType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One lifecycle milestone.
///
/// Reached and pushed dates are set once and never overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Which milestone.
    pub milestone_type: MilestoneType,
    /// When it was first reached.
    pub reached_date: Option<DateTime<Utc>>,
    /// When it was first pushed to telemetry endpoints.
    pub pushed_date: Option<DateTime<Utc>>,
    /// Primary domain of the instance.
    pub primary_domain: String,
}

impl Milestone {
    /// Unreached milestone.
    #[must_use]
    pub const fn new(milestone_type: MilestoneType) -> Self {
        Self {
            milestone_type,
            reached_date: None,
            pushed_date: None,
            primary_domain: String::new(),
        }
    }

    /// Check if the milestone was reached.
    #[must_use]
    pub const fn is_reached(&self) -> bool {
        self.reached_date.is_some()
    }

    /// Check if the milestone was pushed.
    #[must_use]
    pub const fn is_pushed(&self) -> bool {
        self.pushed_date.is_some()
    }

    /// Record the reached date; returns whether this was the first time.
    pub(crate) fn reach(&mut self, at: DateTime<Utc>) -> bool {
        if self.reached_date.is_some() {
            return false;
        }
        self.reached_date = Some(at);
        true
    }

    pub(crate) fn push(&mut self, at: DateTime<Utc>) {
        if self.pushed_date.is_none() {
            self.pushed_date = Some(at);
        }
    }
}

/// Milestones of one instance, sorted by type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSnapshot {
    instance_id: String,
    milestones: Vec<Milestone>,
    ignored_client_ids: BTreeSet<String>,
    start_position: Option<Position>,
    position: Option<Position>,
}

impl MilestoneSnapshot {
    /// Every milestone unreached.
    #[must_use]
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            milestones: MilestoneType::ALL.into_iter().map(Milestone::new).collect(),
            ignored_client_ids: BTreeSet::new(),
            start_position: None,
            position: None,
        }
    }

    /// Instance the snapshot belongs to.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// All milestones, sorted by type.
    #[must_use]
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// Milestone of `milestone_type` (binary search).
    #[must_use]
    pub fn get(&self, milestone_type: MilestoneType) -> Option<&Milestone> {
        self.index_of(milestone_type).map(|index| &self.milestones[index])
    }

    pub(crate) fn get_mut(&mut self, milestone_type: MilestoneType) -> Option<&mut Milestone> {
        self.index_of(milestone_type)
            .map(move |index| &mut self.milestones[index])
    }

    fn index_of(&self, milestone_type: MilestoneType) -> Option<usize> {
        self.milestones
            .binary_search_by(|milestone| milestone.milestone_type.cmp(&milestone_type))
            .ok()
    }

    /// Check if `milestone_type` was reached.
    #[must_use]
    pub fn is_reached(&self, milestone_type: MilestoneType) -> bool {
        self.get(milestone_type).is_some_and(Milestone::is_reached)
    }

    /// Reached milestones.
    pub fn reached(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter().filter(|m| m.is_reached())
    }

    /// Reached milestones not pushed yet.
    pub fn unpushed_reached(&self) -> impl Iterator<Item = &Milestone> {
        self.reached().filter(|m| !m.is_pushed())
    }

    /// Check if every milestone was pushed.
    #[must_use]
    pub fn all_pushed(&self) -> bool {
        self.milestones.iter().all(Milestone::is_pushed)
    }

    /// Primary domain of the instance, empty until known.
    #[must_use]
    pub fn primary_domain(&self) -> &str {
        self.milestones
            .first()
            .map_or("", |milestone| milestone.primary_domain.as_str())
    }

    pub(crate) fn set_primary_domain(&mut self, domain: &str) {
        for milestone in &mut self.milestones {
            milestone.primary_domain = domain.to_string();
        }
    }

    /// Client ids that never satisfy "first authentication on an application".
    pub fn ignored_client_ids(&self) -> impl Iterator<Item = &str> {
        self.ignored_client_ids.iter().map(String::as_str)
    }

    /// Check if authentications through `client_id` are ignored.
    #[must_use]
    pub fn is_client_ignored(&self, client_id: &str) -> bool {
        self.ignored_client_ids.contains(client_id)
    }

    pub(crate) fn ignore_client(&mut self, client_id: String) {
        self.ignored_client_ids.insert(client_id);
    }

    /// Position the snapshot was continued from (`None` when built from scratch).
    #[must_use]
    pub const fn start_position(&self) -> Option<Position> {
        self.start_position
    }

    /// Position of the last applied event.
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        self.position
    }

    pub(crate) const fn set_positions(&mut self, start: Option<Position>, last: Option<Position>) {
        self.start_position = start;
        self.position = last;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_new_snapshot_has_every_type_unreached() {
        let snapshot = MilestoneSnapshot::new("instance-1");
        assert_eq!(snapshot.milestones().len(), MilestoneType::ALL.len());
        assert_eq!(snapshot.reached().count(), 0);
        assert_eq!(snapshot.primary_domain(), "");
        assert!(!snapshot.all_pushed());
    }

    #[test]
    fn test_reach_is_set_once() {
        let first = Utc::now();
        let later = first + chrono::Duration::minutes(5);
        let mut milestone = Milestone::new(MilestoneType::ProjectCreated);

        assert!(milestone.reach(first));
        assert!(!milestone.reach(later));
        assert_eq!(milestone.reached_date, Some(first));

        milestone.push(first);
        milestone.push(later);
        assert_eq!(milestone.pushed_date, Some(first));
    }

    #[test]
    fn test_primary_domain_is_shared() {
        let mut snapshot = MilestoneSnapshot::new("instance-1");
        snapshot.set_primary_domain("acme.example");
        assert!(snapshot.milestones().iter().all(|m| m.primary_domain == "acme.example"));
        assert_eq!(snapshot.primary_domain(), "acme.example");
    }

    #[test]
    fn test_unpushed_reached() {
        let now = Utc::now();
        let mut snapshot = MilestoneSnapshot::new("instance-1");
        snapshot.get_mut(MilestoneType::InstanceCreated).unwrap().reach(now);
        snapshot.get_mut(MilestoneType::ProjectCreated).unwrap().reach(now);
        snapshot.get_mut(MilestoneType::InstanceCreated).unwrap().push(now);

        let unpushed: Vec<_> = snapshot.unpushed_reached().map(|m| m.milestone_type).collect();
        assert_eq!(unpushed, [MilestoneType::ProjectCreated]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn binary_search_matches_linear_scan(
                reached in proptest::collection::vec(any::<bool>(), MilestoneType::ALL.len()),
                pushed in proptest::collection::vec(any::<bool>(), MilestoneType::ALL.len()),
            ) {
                let now = Utc::now();
                let mut snapshot = MilestoneSnapshot::new("instance-1");
                for (index, milestone_type) in MilestoneType::ALL.into_iter().enumerate() {
                    let milestone = snapshot.get_mut(milestone_type).unwrap();
                    if reached[index] {
                        milestone.reach(now);
                    }
                    if pushed[index] {
                        milestone.push(now);
                    }
                }

                for milestone_type in MilestoneType::ALL {
                    let linear = snapshot
                        .milestones()
                        .iter()
                        .find(|m| m.milestone_type == milestone_type);
                    prop_assert_eq!(snapshot.get(milestone_type), linear);
                    prop_assert!(linear.is_some());
                }
            }
        }
    }
}
