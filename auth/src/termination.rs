//! Post-snapshot termination check.
//!
//! After the session snapshot passed, look for anything that ended the
//! token's login session or user at a position greater than the snapshot:
//!
//! - `session.terminated` on the login session
//! - `user.deactivated`, `user.locked`, `user.removed` on the user
//! - `user.human.signed.out` on the user, for the token's device only

use crate::constants::termination_events;
use crate::state::TokenState;
use readmodel_core::consistency::ConsistencyGuard;
use readmodel_core::context::QueryContext;
use readmodel_core::event::{Event, EventError, StoredEvent};
use readmodel_core::search::FilterClause;
use readmodel_core::{QueryError, ReduceError, Result};
use readmodel_events::user::SignedOut;
use readmodel_events::{session, user};

/// Events that end a token, decoded for the device match.
#[derive(Clone, Debug, PartialEq, Eq)]
enum TerminationEvent {
    SessionTerminated,
    UserDeactivated,
    UserLocked,
    UserRemoved,
    UserSignedOut(SignedOut),
}

impl Event for TerminationEvent {
    fn decode(event: &StoredEvent) -> std::result::Result<Self, EventError> {
        match event.event_type() {
            termination_events::SESSION_TERMINATED => Ok(Self::SessionTerminated),
            termination_events::USER_DEACTIVATED => Ok(Self::UserDeactivated),
            termination_events::USER_LOCKED => Ok(Self::UserLocked),
            termination_events::USER_REMOVED => Ok(Self::UserRemoved),
            termination_events::USER_SIGNED_OUT => Ok(Self::UserSignedOut(event.payload()?)),
            other => Err(EventError::UnknownEventType(other.to_string())),
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::SessionTerminated => termination_events::SESSION_TERMINATED,
            Self::UserDeactivated => termination_events::USER_DEACTIVATED,
            Self::UserLocked => termination_events::USER_LOCKED,
            Self::UserRemoved => termination_events::USER_REMOVED,
            Self::UserSignedOut(_) => termination_events::USER_SIGNED_OUT,
        }
    }
}

impl TerminationEvent {
    fn terminates(&self, state: &TokenState) -> bool {
        match self {
            Self::SessionTerminated | Self::UserDeactivated | Self::UserLocked | Self::UserRemoved => {
                true
            }
            Self::UserSignedOut(signed_out) => {
                state.user_agent_id.as_deref() == Some(signed_out.user_agent_id.as_str())
            }
        }
    }
}

/// Clauses selecting termination candidates for `state`.
///
/// Aggregates without an id (e.g. tokens not derived from a login session)
/// contribute no clause.
pub(crate) fn termination_clauses(state: &TokenState) -> Vec<FilterClause> {
    let mut clauses = Vec::with_capacity(2);
    if !state.user_session_id.is_empty() {
        clauses.push(
            FilterClause::aggregate(session::AGGREGATE_TYPE)
                .aggregate_id(&state.user_session_id)
                .event_types([termination_events::SESSION_TERMINATED]),
        );
    }
    if !state.user_id.is_empty() {
        clauses.push(
            FilterClause::aggregate(user::AGGREGATE_TYPE)
                .aggregate_id(&state.user_id)
                .event_types(termination_events::USER),
        );
    }
    clauses
}

/// Whether a termination for `state` was committed after its snapshot.
///
/// # Errors
///
/// Returns [`QueryError::Cancelled`] or [`QueryError::Internal`] from the
/// fetch, and [`QueryError::Internal`] if a candidate cannot be decoded.
pub(crate) async fn terminated_after_snapshot(
    guard: ConsistencyGuard<'_>,
    ctx: &QueryContext,
    state: &TokenState,
) -> Result<bool> {
    let candidates = guard
        .events_after(ctx, state.position, termination_clauses(state))
        .await?;

    for candidate in &candidates {
        let event = TerminationEvent::decode(candidate)
            .map_err(|error| QueryError::from(ReduceError::from(error)))?;
        if event.terminates(state) {
            tracing::info!(
                oidc_session_id = %state.oidc_session_id,
                event_type = event.event_type(),
                "token terminated after snapshot"
            );
            return Ok(true);
        }
    }
    Ok(false)
}
