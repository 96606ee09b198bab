//! The query facade.

use crate::config::QueryConfig;
use crate::metrics::{QueryMetrics, outcome};
use readmodel_auth::{AccessTokenValidator, TokenState};
use readmodel_core::environment::Clock;
use readmodel_core::event_log::EventLog;
use readmodel_core::{QueryContext, Result};
use readmodel_milestones::{MilestoneSnapshot, MilestoneTracker};
use readmodel_quota::{DueNotification, Quota, QuotaNotifications};
use std::sync::Arc;
use std::time::Instant;

/// Entry point answering every read-side question over one event log.
///
/// Contexts without a deadline get the configured fetch timeout, and
/// contexts without a consistency window get the configured one.
///
/// # Example
///
/// ```ignore
/// let queries = Queries::new(log, Arc::new(SystemClock), QueryConfig::from_env()?);
///
/// let ctx = QueryContext::new("instance-1");
/// let token = queries.validate_access_token(&ctx, bearer).await?;
/// ```
#[derive(Clone)]
pub struct Queries {
    clock: Arc<dyn Clock>,
    config: QueryConfig,
    validator: AccessTokenValidator,
    notifications: QuotaNotifications,
    milestones: MilestoneTracker,
}

impl std::fmt::Debug for Queries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queries")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Queries {
    /// Wire every consumer to `log` and `clock`.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>, clock: Arc<dyn Clock>, config: QueryConfig) -> Self {
        Self {
            validator: AccessTokenValidator::new(Arc::clone(&log), Arc::clone(&clock)),
            notifications: QuotaNotifications::new(Arc::clone(&log))
                .with_await_open_transactions(config.await_open_transactions),
            milestones: MilestoneTracker::new(log),
            clock,
            config,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Validate a bearer access token.
    ///
    /// # Errors
    ///
    /// See [`AccessTokenValidator::validate_access_token`].
    pub async fn validate_access_token(&self, ctx: &QueryContext, token: &str) -> Result<TokenState> {
        let ctx = self.scope(ctx);
        let started = Instant::now();
        let result = self.validator.validate_access_token(&ctx, token).await;
        QueryMetrics::record_fetch("access_token", started.elapsed());
        QueryMetrics::record_validation(outcome(&result));
        result
    }

    /// Validate a bearer access token issued to `client_id`.
    ///
    /// # Errors
    ///
    /// See [`AccessTokenValidator::validate_access_token_for_client`].
    pub async fn validate_access_token_for_client(
        &self,
        ctx: &QueryContext,
        token: &str,
        client_id: &str,
    ) -> Result<TokenState> {
        let ctx = self.scope(ctx);
        let started = Instant::now();
        let result = self
            .validator
            .validate_access_token_for_client(&ctx, token, client_id)
            .await;
        QueryMetrics::record_fetch("access_token", started.elapsed());
        QueryMetrics::record_validation(outcome(&result));
        result
    }

    /// Notifications of `quota` due for the current period at `used_absolute`.
    ///
    /// The period is derived from the clock.
    ///
    /// # Errors
    ///
    /// See [`QuotaNotifications::due_notifications`].
    pub async fn due_notifications(
        &self,
        ctx: &QueryContext,
        quota: &Quota,
        used_absolute: u64,
    ) -> Result<Vec<DueNotification>> {
        let ctx = self.scope(ctx);
        let period_start = quota.current_period_start(self.clock.now());
        let started = Instant::now();
        let due = self
            .notifications
            .due_notifications(&ctx, quota, period_start, used_absolute)
            .await?;
        QueryMetrics::record_fetch("quota_notifications", started.elapsed());
        QueryMetrics::record_due_notifications(due.len());
        Ok(due)
    }

    /// Milestone snapshot of the context's instance, built from scratch.
    ///
    /// # Errors
    ///
    /// See [`MilestoneTracker::snapshot`].
    pub async fn milestones(&self, ctx: &QueryContext) -> Result<MilestoneSnapshot> {
        let ctx = self.scope(ctx);
        let system_users = self.config.system_users_for(ctx.instance_id());
        let started = Instant::now();
        let snapshot = self
            .milestones
            .snapshot(&ctx, ctx.instance_id(), &system_users)
            .await?;
        QueryMetrics::record_fetch("milestones", started.elapsed());
        QueryMetrics::record_milestone_snapshot();
        Ok(snapshot)
    }

    /// Continue `snapshot` with the events appended since it was taken.
    ///
    /// # Errors
    ///
    /// See [`MilestoneTracker::refresh`].
    pub async fn refresh_milestones(
        &self,
        ctx: &QueryContext,
        snapshot: MilestoneSnapshot,
    ) -> Result<MilestoneSnapshot> {
        let ctx = self.scope(ctx);
        let system_users = self.config.system_users_for(ctx.instance_id());
        let started = Instant::now();
        let snapshot = self.milestones.refresh(&ctx, snapshot, &system_users).await?;
        QueryMetrics::record_fetch("milestones", started.elapsed());
        QueryMetrics::record_milestone_snapshot();
        Ok(snapshot)
    }

    fn scope(&self, ctx: &QueryContext) -> QueryContext {
        let mut scoped = ctx.clone();
        if scoped.deadline().is_none() {
            scoped = scoped.with_timeout(self.config.fetch_timeout);
        }
        if let (None, Some(window)) = (scoped.consistency_window(), self.config.consistency_window) {
            scoped = scoped.with_consistency_window(window);
        }
        scoped
    }
}
