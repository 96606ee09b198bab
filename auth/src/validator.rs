//! Access token validation.
//!
//! ```text
//! parse ──▶ fold OIDC session ──▶ current token id? ──▶ unexpired? ──▶ terminated after snapshot?
//!   │              │                     │                   │                    │
//! Invalid     NotFound→Invalid        Invalid             Expired              Invalid
//! ```
//!
//! The last step closes the window between reading the snapshot and the
//! caller acting on it: a termination committed after the snapshot position
//! fails the validation even though the snapshot itself looked valid.

use crate::error::Result;
use crate::read_model::AccessTokenReadModel;
use crate::state::TokenState;
use crate::termination::terminated_after_snapshot;
use crate::token::AccessToken;
use readmodel_core::consistency::ConsistencyGuard;
use readmodel_core::context::QueryContext;
use readmodel_core::environment::Clock;
use readmodel_core::event_log::EventLog;
use readmodel_core::{QueryError, read_model};
use std::sync::Arc;

/// Validates opaque access tokens against the event log.
///
/// Stateless between calls; every validation folds a fresh read model.
///
/// # Example
///
/// ```ignore
/// let validator = AccessTokenValidator::new(log, Arc::new(SystemClock));
/// let ctx = QueryContext::new("instance-1").with_timeout(Duration::from_secs(2));
///
/// let state = validator.validate_access_token(&ctx, bearer).await?;
/// authorize(&state.user_id, &state.scope)?;
/// ```
#[derive(Clone)]
pub struct AccessTokenValidator {
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AccessTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenValidator").finish_non_exhaustive()
    }
}

impl AccessTokenValidator {
    /// Create a validator reading from `log`; `clock` decides expiry.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>, clock: Arc<dyn Clock>) -> Self {
        Self { log, clock }
    }

    /// Validate `token` in the context's instance.
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidArgument`] if `token` is empty
    /// - [`QueryError::InvalidToken`] if the token is malformed, unknown,
    ///   replaced or revoked, or its login session or user was terminated
    ///   after the snapshot
    /// - [`QueryError::Expired`] if the token's expiration has passed
    /// - [`QueryError::Cancelled`] on cancellation or deadline
    /// - [`QueryError::Internal`] on log or decoding failures
    #[tracing::instrument(skip(self, ctx, token), fields(instance_id = %ctx.instance_id()))]
    pub async fn validate_access_token(&self, ctx: &QueryContext, token: &str) -> Result<TokenState> {
        let token = AccessToken::parse(token).map_err(|error| {
            tracing::debug!(error = %error, "malformed access token");
            QueryError::from(error)
        })?;
        tracing::debug!(oidc_session_id = token.oidc_session_id(), "validating access token");

        let model = AccessTokenReadModel::new(ctx.instance_id(), token.oidc_session_id());
        let model = match read_model::load(self.log.as_ref(), ctx, model).await {
            Ok(model) => model,
            Err(QueryError::NotFound) => {
                tracing::debug!(oidc_session_id = token.oidc_session_id(), "unknown oidc session");
                return Err(QueryError::InvalidToken);
            }
            Err(error) => return Err(error),
        };

        let Some(state) = model.into_token_state(token.token_id()) else {
            tracing::debug!(
                oidc_session_id = token.oidc_session_id(),
                "access token is not the current token of its session"
            );
            return Err(QueryError::InvalidToken);
        };

        if state.is_expired(self.clock.now()) {
            return Err(QueryError::Expired);
        }

        let guard = ConsistencyGuard::new(self.log.as_ref());
        if terminated_after_snapshot(guard, ctx, &state).await? {
            return Err(QueryError::InvalidToken);
        }

        Ok(state)
    }

    /// Validate `token` and require it to be issued to `client_id`.
    ///
    /// # Errors
    ///
    /// Same as [`AccessTokenValidator::validate_access_token`], plus
    /// [`QueryError::InvalidToken`] if the token belongs to another client.
    pub async fn validate_access_token_for_client(
        &self,
        ctx: &QueryContext,
        token: &str,
        client_id: &str,
    ) -> Result<TokenState> {
        let state = self.validate_access_token(ctx, token).await?;
        if state.client_id != client_id {
            tracing::debug!(
                oidc_session_id = %state.oidc_session_id,
                "access token presented by another client"
            );
            return Err(QueryError::InvalidToken);
        }
        Ok(state)
    }
}
