//! End-to-end scenarios through the query facade.

#![allow(clippy::unwrap_used)] // Test code

use chrono::Duration as ChronoDuration;
use readmodel_core::environment::Clock;
use readmodel_core::{QueryContext, QueryError};
use readmodel_events::{oidc_session, project, session};
use readmodel_milestones::MilestoneType;
use readmodel_quota::{Notification, Quota, QuotaUnit};
use readmodel_runtime::{Queries, QueryConfig};
use readmodel_testing::{EventBuilder, InMemoryEventLog, test_clock};
use std::sync::Arc;
use std::time::Duration;

const SESSION: &str = "V2_oidc-1";

fn queries(log: &InMemoryEventLog, config: QueryConfig) -> Queries {
    Queries::new(Arc::new(log.clone()), Arc::new(test_clock()), config)
}

fn ctx() -> QueryContext {
    QueryContext::new("instance-1")
}

fn issue_token(log: &InMemoryEventLog) {
    let now = test_clock().now();
    log.append_all([
        EventBuilder::new(
            SESSION,
            &oidc_session::Added {
                user_id: "user-1".to_string(),
                user_resource_owner: "org-1".to_string(),
                session_id: "session-1".to_string(),
                client_id: "web-client".to_string(),
                audience: vec!["web-client".to_string()],
                scope: vec!["openid".to_string()],
                auth_methods: vec!["password".to_string()],
                auth_time: now,
                user_agent_id: Some("device-1".to_string()),
            },
        )
        .created_at(now),
        EventBuilder::new(
            SESSION,
            &oidc_session::AccessTokenAdded {
                id: "at-1".to_string(),
                scope: vec!["openid".to_string()],
                lifetime: Duration::from_secs(3600),
                reason: oidc_session::TokenReason::AuthRequest,
            },
        )
        .created_at(now),
    ]);
}

#[tokio::test]
async fn test_validation_and_termination() {
    let log = InMemoryEventLog::new();
    issue_token(&log);
    let queries = queries(&log, QueryConfig::default());

    let state = queries
        .validate_access_token(&ctx(), &format!("{SESSION}.at-1"))
        .await
        .unwrap();
    assert_eq!(state.user_id, "user-1");

    log.append(EventBuilder::new("session-1", &session::Terminated {}));
    let result = queries
        .validate_access_token(&ctx(), &format!("{SESSION}.at-1"))
        .await;
    assert_eq!(result.err(), Some(QueryError::InvalidToken));
}

#[tokio::test]
async fn test_configured_timeout_applies_to_contexts_without_deadline() {
    let log = InMemoryEventLog::new().with_fetch_delay(Duration::from_millis(200));
    issue_token(&log);
    let queries = queries(
        &log,
        QueryConfig::default().with_fetch_timeout(Duration::from_millis(20)),
    );

    let result = queries
        .validate_access_token(&ctx(), &format!("{SESSION}.at-1"))
        .await;

    assert_eq!(result.err(), Some(QueryError::Cancelled));
}

#[tokio::test]
async fn test_consistency_window_is_forwarded() {
    let log = InMemoryEventLog::new();
    issue_token(&log);
    let window = Duration::from_millis(75);
    let queries = queries(&log, QueryConfig::default().with_consistency_window(window));

    queries
        .validate_access_token(&ctx(), &format!("{SESSION}.at-1"))
        .await
        .unwrap();

    assert!(log
        .queries()
        .iter()
        .all(|query| query.consistency_window_override() == Some(window)));
}

#[tokio::test]
async fn test_due_notifications_use_the_current_period() {
    let log = InMemoryEventLog::new();
    let clock = test_clock();
    let quota = Quota::new(
        "quota-1",
        QuotaUnit::RequestsAllAuthenticated,
        1000,
        clock.now() - ChronoDuration::days(45),
        ChronoDuration::days(30),
    )
    .with_notification(Notification::new("n1", 50, "https://hooks.example/quota"));
    let queries = queries(&log, QueryConfig::default());

    let due = queries.due_notifications(&ctx(), &quota, 600).await.unwrap();

    assert_eq!(due.len(), 1);
    assert_eq!(due[0].period_start, clock.now() - ChronoDuration::days(15));
    assert_eq!(due[0].threshold, 50);

    log.append(EventBuilder::new("quota-1", &due[0].to_event()).created_at(clock.now()));
    assert!(queries.due_notifications(&ctx(), &quota, 700).await.unwrap().is_empty());
    assert!(log.last_query().unwrap().awaits_open_transactions());
}

#[tokio::test]
async fn test_await_open_transactions_can_be_disabled() {
    let log = InMemoryEventLog::new();
    let quota = Quota::new(
        "quota-1",
        QuotaUnit::ActionsAllRunsSeconds,
        100,
        test_clock().now(),
        ChronoDuration::days(1),
    )
    .with_notification(Notification::new("n1", 80, "https://hooks.example/quota"));
    let queries = queries(&log, QueryConfig::default().with_await_open_transactions(false));

    queries.due_notifications(&ctx(), &quota, 10).await.unwrap();

    assert!(!log.last_query().unwrap().awaits_open_transactions());
}

#[tokio::test]
async fn test_milestones_use_configured_system_users() {
    let log = InMemoryEventLog::new();
    log.append(
        EventBuilder::new("project-1", &project::Added { name: "seed".to_string() })
            .creator("provisioner"),
    );

    let plain = queries(&log, QueryConfig::default());
    let configured = queries(
        &log,
        QueryConfig::default().with_system_user("instance-1", "provisioner"),
    );

    let snapshot = plain.milestones(&ctx()).await.unwrap();
    assert!(snapshot.is_reached(MilestoneType::ProjectCreated));

    let snapshot = configured.milestones(&ctx()).await.unwrap();
    assert!(!snapshot.is_reached(MilestoneType::ProjectCreated));

    log.append(
        EventBuilder::new("project-2", &project::Added { name: "shop".to_string() })
            .creator("alice"),
    );
    let refreshed = configured.refresh_milestones(&ctx(), snapshot).await.unwrap();
    assert!(refreshed.is_reached(MilestoneType::ProjectCreated));
}
