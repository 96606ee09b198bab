//! Milestone read model.
//!
//! # Fold rules
//!
//! | event                                   | effect                                             |
//! |-----------------------------------------|----------------------------------------------------|
//! | `instance.added`                        | reach `InstanceCreated`                            |
//! | `instance.domain.primary.set`           | record the domain on every milestone               |
//! | `project.added`                         | reach `ProjectCreated` unless system-generated     |
//! | `project.application.added`             | reach `ApplicationCreated` unless system-generated |
//! | `project.application.config.*.added`    | ignore the client id if system-generated           |
//! | `user.token.added`                      | reach `AuthenticationSucceededOnInstance`; also `AuthenticationSucceededOnApplication` for a user-generated event through a client that is not ignored |
//! | `instance.removed`                      | reach `InstanceDeleted`                            |
//! | `milestone.pushed`                      | record the pushed date                             |
//!
//! # Narrowing
//!
//! The query only asks for event types that can still change the snapshot,
//! so the scan shrinks over an instance's lifetime.

use crate::snapshot::MilestoneSnapshot;
use crate::system_users::SystemUsers;
use readmodel_core::event::{Event, EventError, EventMeta, StoredEvent};
use readmodel_core::read_model::{ReadModel, ReadModelBase};
use readmodel_core::search::{FilterClause, SearchQuery};
use readmodel_core::ReduceError;
use readmodel_events::Payload;
use readmodel_events::milestone::{self, MilestoneType, Pushed};
use readmodel_events::{instance, project, user};

/// Events the milestone read model subscribes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MilestoneEvent {
    /// `instance.added`
    InstanceAdded(instance::Added),
    /// `instance.domain.primary.set`
    PrimaryDomainSet(instance::PrimaryDomainSet),
    /// `instance.removed`
    InstanceRemoved(instance::Removed),
    /// `project.added`
    ProjectAdded(project::Added),
    /// `project.application.added`
    ApplicationAdded(project::ApplicationAdded),
    /// `project.application.config.oidc.added`
    OidcConfigAdded(project::OidcConfigAdded),
    /// `project.application.config.api.added`
    ApiConfigAdded(project::ApiConfigAdded),
    /// `user.token.added`
    UserTokenAdded(user::TokenAdded),
    /// `milestone.pushed`
    Pushed(Pushed),
}

impl Event for MilestoneEvent {
    fn decode(event: &StoredEvent) -> Result<Self, EventError> {
        match event.event_type() {
            instance::Added::EVENT_TYPE => Ok(Self::InstanceAdded(event.payload()?)),
            instance::PrimaryDomainSet::EVENT_TYPE => Ok(Self::PrimaryDomainSet(event.payload()?)),
            instance::Removed::EVENT_TYPE => Ok(Self::InstanceRemoved(event.payload()?)),
            project::Added::EVENT_TYPE => Ok(Self::ProjectAdded(event.payload()?)),
            project::ApplicationAdded::EVENT_TYPE => Ok(Self::ApplicationAdded(event.payload()?)),
            project::OidcConfigAdded::EVENT_TYPE => Ok(Self::OidcConfigAdded(event.payload()?)),
            project::ApiConfigAdded::EVENT_TYPE => Ok(Self::ApiConfigAdded(event.payload()?)),
            user::TokenAdded::EVENT_TYPE => Ok(Self::UserTokenAdded(event.payload()?)),
            Pushed::EVENT_TYPE => Ok(Self::Pushed(event.payload()?)),
            other => Err(EventError::UnknownEventType(other.to_string())),
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::InstanceAdded(_) => instance::Added::EVENT_TYPE,
            Self::PrimaryDomainSet(_) => instance::PrimaryDomainSet::EVENT_TYPE,
            Self::InstanceRemoved(_) => instance::Removed::EVENT_TYPE,
            Self::ProjectAdded(_) => project::Added::EVENT_TYPE,
            Self::ApplicationAdded(_) => project::ApplicationAdded::EVENT_TYPE,
            Self::OidcConfigAdded(_) => project::OidcConfigAdded::EVENT_TYPE,
            Self::ApiConfigAdded(_) => project::ApiConfigAdded::EVENT_TYPE,
            Self::UserTokenAdded(_) => user::TokenAdded::EVENT_TYPE,
            Self::Pushed(_) => Pushed::EVENT_TYPE,
        }
    }
}

/// Folds an instance's events into its [`MilestoneSnapshot`].
#[derive(Clone, Debug)]
pub struct MilestonesReadModel {
    base: ReadModelBase,
    snapshot: MilestoneSnapshot,
    system_users: SystemUsers,
}

impl MilestonesReadModel {
    /// Model building `instance_id`'s snapshot from scratch.
    #[must_use]
    pub fn new(instance_id: impl Into<String>, system_users: SystemUsers) -> Self {
        let instance_id = instance_id.into();
        Self {
            base: ReadModelBase::new(instance_id.clone(), instance_id.clone()),
            snapshot: MilestoneSnapshot::new(instance_id),
            system_users,
        }
    }

    /// Model continuing `snapshot` after its last applied position.
    #[must_use]
    pub fn continuing(snapshot: MilestoneSnapshot, system_users: SystemUsers) -> Self {
        let instance_id = snapshot.instance_id().to_string();
        let base = ReadModelBase::new(instance_id.clone(), instance_id);
        let base = match snapshot.position() {
            Some(position) => base.starting_after(position),
            None => base,
        };
        Self {
            base,
            snapshot,
            system_users,
        }
    }

    /// The snapshot folded so far.
    #[must_use]
    pub const fn snapshot(&self) -> &MilestoneSnapshot {
        &self.snapshot
    }

    /// Finish the fold, stamping the positions it started from and ended at.
    #[must_use]
    pub fn into_snapshot(self) -> MilestoneSnapshot {
        let start = self.snapshot.position();
        let last = self.base.position().or(start);
        let mut snapshot = self.snapshot;
        snapshot.set_positions(start, last);
        snapshot
    }

    /// Event types that can still change the snapshot.
    #[must_use]
    pub fn needed_event_types(&self) -> Vec<&'static str> {
        let snapshot = &self.snapshot;
        let mut types = Vec::with_capacity(9);

        if !snapshot.is_reached(MilestoneType::InstanceCreated) {
            types.push(instance::Added::EVENT_TYPE);
        }
        if snapshot.primary_domain().is_empty() {
            types.push(instance::PrimaryDomainSet::EVENT_TYPE);
        }
        if !snapshot.is_reached(MilestoneType::ProjectCreated) {
            types.push(project::Added::EVENT_TYPE);
        }
        if !snapshot.is_reached(MilestoneType::ApplicationCreated) {
            types.push(project::ApplicationAdded::EVENT_TYPE);
        }
        if !snapshot.is_reached(MilestoneType::AuthenticationSucceededOnApplication) {
            types.push(project::OidcConfigAdded::EVENT_TYPE);
            types.push(project::ApiConfigAdded::EVENT_TYPE);
        }
        if !snapshot.is_reached(MilestoneType::AuthenticationSucceededOnInstance)
            || !snapshot.is_reached(MilestoneType::AuthenticationSucceededOnApplication)
        {
            types.push(user::TokenAdded::EVENT_TYPE);
        }
        if !snapshot.is_reached(MilestoneType::InstanceDeleted) {
            types.push(instance::Removed::EVENT_TYPE);
        }
        types
    }

    fn reach(&mut self, milestone_type: MilestoneType, meta: &EventMeta) {
        if let Some(milestone) = self.snapshot.get_mut(milestone_type) {
            milestone.reach(meta.created_at);
        }
    }

    fn reach_unless_system(&mut self, milestone_type: MilestoneType, meta: &EventMeta) {
        if !self.system_users.is_system(&meta.creator) {
            self.reach(milestone_type, meta);
        }
    }

    fn ignore_client_if_system(&mut self, client_id: String, meta: &EventMeta) {
        if self.system_users.is_system(&meta.creator) {
            self.snapshot.ignore_client(client_id);
        }
    }
}

impl ReadModel for MilestonesReadModel {
    type Event = MilestoneEvent;

    fn query(&self) -> SearchQuery {
        let mut query = SearchQuery::new(self.base.instance_id());
        if let Some(position) = self.base.position() {
            query = query.position_after(position);
        }

        let needed = self.needed_event_types();
        if !needed.is_empty() {
            query = query.or(FilterClause::aggregates([
                instance::AGGREGATE_TYPE,
                project::AGGREGATE_TYPE,
                user::AGGREGATE_TYPE,
            ])
            .event_types(needed));
        }
        if !self.snapshot.all_pushed() {
            query = query.or(FilterClause::aggregate(milestone::AGGREGATE_TYPE)
                .aggregate_id(self.base.aggregate_id())
                .event_types([Pushed::EVENT_TYPE]));
        }
        query
    }

    fn base(&self) -> &ReadModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ReadModelBase {
        &mut self.base
    }

    fn apply(&mut self, meta: &EventMeta, event: MilestoneEvent) -> Result<(), ReduceError> {
        match event {
            MilestoneEvent::InstanceAdded(_) => self.reach(MilestoneType::InstanceCreated, meta),
            MilestoneEvent::PrimaryDomainSet(set) => self.snapshot.set_primary_domain(&set.domain),
            MilestoneEvent::InstanceRemoved(_) => self.reach(MilestoneType::InstanceDeleted, meta),
            MilestoneEvent::ProjectAdded(_) => {
                self.reach_unless_system(MilestoneType::ProjectCreated, meta);
            }
            MilestoneEvent::ApplicationAdded(_) => {
                self.reach_unless_system(MilestoneType::ApplicationCreated, meta);
            }
            MilestoneEvent::OidcConfigAdded(added) => {
                self.ignore_client_if_system(added.client_id, meta);
            }
            MilestoneEvent::ApiConfigAdded(added) => {
                self.ignore_client_if_system(added.client_id, meta);
            }
            MilestoneEvent::UserTokenAdded(token) => {
                self.reach(MilestoneType::AuthenticationSucceededOnInstance, meta);
                if !token.client_id.is_empty() && !self.snapshot.is_client_ignored(&token.client_id)
                {
                    self.reach_unless_system(MilestoneType::AuthenticationSucceededOnApplication, meta);
                }
            }
            MilestoneEvent::Pushed(pushed) => {
                let Some(milestone) = self.snapshot.get_mut(pushed.milestone_type) else {
                    return Err(ReduceError::Inconsistent(format!(
                        "pushed unknown milestone {}",
                        pushed.milestone_type
                    )));
                };
                milestone.push(meta.created_at);
            }
        }
        Ok(())
    }
}
