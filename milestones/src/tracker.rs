//! Milestone tracker: build or refresh an instance's milestone snapshot.

use crate::read_model::MilestonesReadModel;
use crate::snapshot::MilestoneSnapshot;
use crate::system_users::SystemUsers;
use readmodel_core::event_log::EventLog;
use readmodel_core::read_model::{self, ReadModel};
use readmodel_core::{QueryContext, QueryError, Result};
use readmodel_events::milestone::MilestoneType;
use std::sync::Arc;

/// Reads milestone snapshots from the event log.
///
/// # Example
///
/// ```ignore
/// let tracker = MilestoneTracker::new(log.clone());
/// let users = SystemUsers::new().with_user("provisioner");
///
/// let snapshot = tracker.snapshot(&ctx, "instance-1", &users).await?;
/// // later, only read what was appended since
/// let snapshot = tracker.refresh(&ctx, snapshot, &users).await?;
/// ```
#[derive(Clone)]
pub struct MilestoneTracker {
    log: Arc<dyn EventLog>,
}

impl std::fmt::Debug for MilestoneTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilestoneTracker").finish_non_exhaustive()
    }
}

impl MilestoneTracker {
    /// Create a tracker reading from `log`.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }

    /// Build the milestone snapshot of `instance_id` from scratch.
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidArgument`] if `instance_id` is not the context's instance
    /// - [`QueryError::Cancelled`] on cancellation or deadline
    /// - [`QueryError::Internal`] on log or decoding failures
    #[tracing::instrument(skip(self, ctx, instance_id, system_users), fields(instance_id = %ctx.instance_id()))]
    pub async fn snapshot(
        &self,
        ctx: &QueryContext,
        instance_id: &str,
        system_users: &SystemUsers,
    ) -> Result<MilestoneSnapshot> {
        check_instance(ctx, instance_id)?;
        let model = MilestonesReadModel::new(instance_id, system_users.clone());
        self.fold(ctx, model).await
    }

    /// Continue `snapshot` with the events appended after its last position.
    ///
    /// Already reached or pushed dates are kept.
    ///
    /// # Errors
    ///
    /// Same as [`MilestoneTracker::snapshot`].
    #[tracing::instrument(skip(self, ctx, snapshot, system_users), fields(instance_id = %ctx.instance_id()))]
    pub async fn refresh(
        &self,
        ctx: &QueryContext,
        snapshot: MilestoneSnapshot,
        system_users: &SystemUsers,
    ) -> Result<MilestoneSnapshot> {
        check_instance(ctx, snapshot.instance_id())?;
        let model = MilestonesReadModel::continuing(snapshot, system_users.clone());
        self.fold(ctx, model).await
    }

    async fn fold(&self, ctx: &QueryContext, model: MilestonesReadModel) -> Result<MilestoneSnapshot> {
        let query = model.query();
        if query.clauses().is_empty() {
            tracing::debug!("every milestone reached and pushed, skipping fetch");
            return Ok(model.into_snapshot());
        }
        tracing::debug!(
            event_types = model.needed_event_types().len(),
            "narrowed milestone filter"
        );

        let before: Vec<MilestoneType> = model.snapshot().reached().map(|m| m.milestone_type).collect();
        let model = read_model::load(self.log.as_ref(), ctx, model).await?;
        let snapshot = model.into_snapshot();

        for milestone in snapshot.reached() {
            if !before.contains(&milestone.milestone_type) {
                tracing::info!(milestone = %milestone.milestone_type, "milestone reached");
            }
        }
        Ok(snapshot)
    }
}

fn check_instance(ctx: &QueryContext, instance_id: &str) -> Result<()> {
    if ctx.instance_id() == instance_id {
        Ok(())
    } else {
        Err(QueryError::InvalidArgument(format!(
            "instance {instance_id} is outside the request scope"
        )))
    }
}
