//! Integration tests for the in-memory event log and the consistency guard.

#![allow(clippy::unwrap_used)] // Test code

use readmodel_core::consistency::ConsistencyGuard;
use readmodel_core::context::QueryContext;
use readmodel_core::environment::Clock;
use readmodel_core::error::QueryError;
use readmodel_core::event::Position;
use readmodel_core::event_log::{EventLog, EventLogError};
use readmodel_core::read_model;
use readmodel_core::search::{FilterClause, SearchQuery};
use readmodel_events::session::Terminated;
use readmodel_events::user::{Locked, SignedOut};
use readmodel_testing::{EventBuilder, InMemoryEventLog, test_clock};
use chrono::Duration as ChronoDuration;
use std::time::Duration;

fn sessions(instance: &str) -> SearchQuery {
    SearchQuery::new(instance).clause(FilterClause::aggregate("session"))
}

#[tokio::test]
async fn test_positions_strictly_increase() {
    let log = InMemoryEventLog::new();
    let first = log.append(EventBuilder::new("s1", &Terminated {}));
    let rest = log.append_all([
        EventBuilder::new("s2", &Terminated {}),
        EventBuilder::new("s3", &Terminated {}),
    ]);

    assert_eq!(first, Position::new(1));
    assert_eq!(rest, vec![Position::new(2), Position::new(3)]);
    assert_eq!(log.len(), 3);
    assert_eq!(log.last_position(), Position::new(3));
}

#[tokio::test]
async fn test_filter_is_scoped_to_instance() {
    let log = InMemoryEventLog::new();
    log.append(EventBuilder::new("s1", &Terminated {}));
    log.append(EventBuilder::new("s1", &Terminated {}).instance("instance-2"));

    let events = log.filter(sessions("instance-1")).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].meta().instance_id, "instance-1");
}

#[tokio::test]
async fn test_filter_applies_lower_bounds() {
    let log = InMemoryEventLog::new();
    let start = test_clock().now();
    log.append(EventBuilder::new("s1", &Terminated {}).created_at(start - ChronoDuration::hours(1)));
    let second = log.append(EventBuilder::new("s2", &Terminated {}).created_at(start));
    log.append(EventBuilder::new("s3", &Terminated {}).created_at(start + ChronoDuration::hours(1)));

    let after = log
        .filter(sessions("instance-1").position_after(second))
        .await
        .unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].meta().aggregate_id, "s3");

    let since = log
        .filter(sessions("instance-1").created_since(start))
        .await
        .unwrap();
    let ids: Vec<_> = since.iter().map(|e| e.meta().aggregate_id.as_str()).collect();
    assert_eq!(ids, ["s2", "s3"]);
}

#[tokio::test]
async fn test_injected_failure_is_internal_and_one_shot() {
    let log = InMemoryEventLog::new();
    log.append(EventBuilder::new("s1", &Terminated {}));
    log.fail_next_fetch(EventLogError::DatabaseError("connection reset".to_string()));

    let ctx = QueryContext::new("instance-1");
    let failed = read_model::fetch(&log, &ctx, sessions("instance-1")).await;
    assert!(matches!(failed, Err(QueryError::Internal(_))));

    let recovered = read_model::fetch(&log, &ctx, sessions("instance-1")).await.unwrap();
    assert_eq!(recovered.len(), 1);
    assert_eq!(log.fetch_count(), 2);
}

#[tokio::test]
async fn test_uncommitted_events_are_invisible() {
    let log = InMemoryEventLog::new();
    let mut tx = log.begin();
    tx.push(EventBuilder::new("s1", &Terminated {}));

    assert!(log.filter(sessions("instance-1")).await.unwrap().is_empty());

    tx.rollback();
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_await_open_transactions_sees_commit() {
    let log = InMemoryEventLog::new();
    let mut tx = log.begin();
    tx.push(EventBuilder::new("s1", &Terminated {}));

    let reader = {
        let log = log.clone();
        tokio::spawn(async move {
            log.filter(sessions("instance-1").await_open_transactions())
                .await
                .unwrap()
        })
    };

    tokio::task::yield_now().await;
    tx.commit();

    let events = reader.await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_hits_deadline() {
    let log = InMemoryEventLog::new().with_fetch_delay(Duration::from_secs(10));
    log.append(EventBuilder::new("s1", &Terminated {}));

    let ctx = QueryContext::new("instance-1").with_timeout(Duration::from_secs(1));
    let result = read_model::fetch(&log, &ctx, sessions("instance-1")).await;
    assert_eq!(result.unwrap_err(), QueryError::Cancelled);
}

#[tokio::test]
async fn test_context_window_is_forwarded() {
    let log = InMemoryEventLog::new();
    let ctx = QueryContext::new("instance-1").with_consistency_window(Duration::from_millis(250));

    read_model::fetch(&log, &ctx, sessions("instance-1")).await.unwrap();
    let query = log.last_query().unwrap();
    assert_eq!(
        query.consistency_window_override(),
        Some(Duration::from_millis(250))
    );
}

#[tokio::test]
async fn test_guard_only_looks_after_snapshot() {
    let log = InMemoryEventLog::new();
    let ctx = QueryContext::new("instance-1");
    let guard = ConsistencyGuard::new(&log);
    let clause = FilterClause::aggregate("session")
        .aggregate_id("s1")
        .event_types(["session.terminated"]);

    let terminated = log.append(EventBuilder::new("s1", &Terminated {}));
    assert!(
        !guard
            .happened_after(&ctx, terminated, [clause.clone()])
            .await
            .unwrap()
    );
    assert!(
        guard
            .happened_after(&ctx, Position::ZERO, [clause])
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_guard_ors_clauses_into_one_fetch() {
    let log = InMemoryEventLog::new();
    let ctx = QueryContext::new("instance-1");
    let guard = ConsistencyGuard::new(&log);

    log.append(EventBuilder::new("u1", &Locked {}));

    let matched = guard
        .happened_after(
            &ctx,
            Position::ZERO,
            [
                FilterClause::aggregate("session").aggregate_id("s1"),
                FilterClause::aggregate("user")
                    .aggregate_id("u1")
                    .event_types(["user.locked"]),
            ],
        )
        .await
        .unwrap();

    assert!(matched);
    assert_eq!(log.fetch_count(), 1);
}

#[tokio::test]
async fn test_guard_without_clauses_skips_log() {
    let log = InMemoryEventLog::new();
    let ctx = QueryContext::new("instance-1");
    let guard = ConsistencyGuard::new(&log);

    let matched = guard
        .happened_after(&ctx, Position::ZERO, std::iter::empty())
        .await
        .unwrap();
    assert!(!matched);
    assert_eq!(log.fetch_count(), 0);
}

#[tokio::test]
async fn test_guard_predicate_filters_payloads() {
    let log = InMemoryEventLog::new();
    let ctx = QueryContext::new("instance-1");
    let guard = ConsistencyGuard::new(&log);

    log.append(EventBuilder::new(
        "u1",
        &SignedOut {
            user_agent_id: "other-device".to_string(),
        },
    ));

    let clause = FilterClause::aggregate("user")
        .aggregate_id("u1")
        .event_types(["user.human.signed.out"]);
    let same_device = |event: &readmodel_core::event::StoredEvent| {
        event
            .payload::<SignedOut>()
            .is_ok_and(|signed_out| signed_out.user_agent_id == "device-1")
    };

    assert!(
        !guard
            .happened_after_matching(&ctx, Position::ZERO, [clause], same_device)
            .await
            .unwrap()
    );
}
