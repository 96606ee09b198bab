//! OIDC session read model.
//!
//! Folds the lifecycle of one OIDC session into "which access token is
//! current, and until when". A session holds at most one current access
//! token: issuing a new one replaces it, and revoking either the access
//! token or the refresh token clears it.

use crate::constants::oidc_session_events;
use crate::state::TokenState;
use chrono::{DateTime, Utc};
use readmodel_core::event::{Event, EventError, EventMeta, StoredEvent};
use readmodel_core::read_model::{ReadModel, ReadModelBase};
use readmodel_core::search::{FilterClause, SearchQuery};
use readmodel_core::ReduceError;
use readmodel_events::oidc_session::{
    self, AccessTokenAdded, AccessTokenRevoked, Added, RefreshTokenRevoked, TokenReason,
};

/// Events the access token read model subscribes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OidcSessionEvent {
    /// Session created.
    Added(Added),
    /// Access token issued.
    AccessTokenAdded(AccessTokenAdded),
    /// Access token revoked.
    AccessTokenRevoked(AccessTokenRevoked),
    /// Refresh token revoked.
    RefreshTokenRevoked(RefreshTokenRevoked),
}

impl Event for OidcSessionEvent {
    fn decode(event: &StoredEvent) -> Result<Self, EventError> {
        match event.event_type() {
            oidc_session_events::ADDED => Ok(Self::Added(event.payload()?)),
            oidc_session_events::ACCESS_TOKEN_ADDED => Ok(Self::AccessTokenAdded(event.payload()?)),
            oidc_session_events::ACCESS_TOKEN_REVOKED => {
                Ok(Self::AccessTokenRevoked(event.payload()?))
            }
            oidc_session_events::REFRESH_TOKEN_REVOKED => {
                Ok(Self::RefreshTokenRevoked(event.payload()?))
            }
            other => Err(EventError::UnknownEventType(other.to_string())),
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::Added(_) => oidc_session_events::ADDED,
            Self::AccessTokenAdded(_) => oidc_session_events::ACCESS_TOKEN_ADDED,
            Self::AccessTokenRevoked(_) => oidc_session_events::ACCESS_TOKEN_REVOKED,
            Self::RefreshTokenRevoked(_) => oidc_session_events::REFRESH_TOKEN_REVOKED,
        }
    }
}

/// The access token currently held by a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentAccessToken {
    /// Token id.
    pub id: String,
    /// Scopes of the token.
    pub scope: Vec<String>,
    /// Issue time (creation time of the issuing event).
    pub creation: DateTime<Utc>,
    /// Issue time plus lifetime.
    pub expiration: DateTime<Utc>,
    /// Grant that issued the token.
    pub reason: TokenReason,
}

/// Read model over one OIDC session aggregate.
#[derive(Clone, Debug)]
pub struct AccessTokenReadModel {
    base: ReadModelBase,
    session: Option<Added>,
    access_token: Option<CurrentAccessToken>,
}

impl AccessTokenReadModel {
    /// Fresh model for OIDC session `oidc_session_id` in `instance_id`.
    #[must_use]
    pub fn new(instance_id: impl Into<String>, oidc_session_id: impl Into<String>) -> Self {
        Self {
            base: ReadModelBase::new(instance_id, oidc_session_id),
            session: None,
            access_token: None,
        }
    }

    /// Session data from the creation event.
    #[must_use]
    pub const fn session(&self) -> Option<&Added> {
        self.session.as_ref()
    }

    /// The current access token, if one is held.
    #[must_use]
    pub const fn access_token(&self) -> Option<&CurrentAccessToken> {
        self.access_token.as_ref()
    }

    /// Token state if `token_id` is the session's current access token.
    ///
    /// Unknown, replaced and revoked ids all yield `None`.
    #[must_use]
    pub fn into_token_state(self, token_id: &str) -> Option<TokenState> {
        let position = self.base.position()?;
        let session = self.session?;
        let access_token = self.access_token.filter(|token| token.id == token_id)?;

        Some(TokenState {
            oidc_session_id: self.base.aggregate_id().to_string(),
            resource_owner: self.base.resource_owner().to_string(),
            user_id: session.user_id,
            user_resource_owner: session.user_resource_owner,
            user_session_id: session.session_id,
            client_id: session.client_id,
            user_agent_id: session.user_agent_id,
            access_token_id: access_token.id,
            scope: access_token.scope,
            audience: session.audience,
            auth_methods: session.auth_methods,
            auth_time: session.auth_time,
            reason: access_token.reason,
            creation: access_token.creation,
            expiration: access_token.expiration,
            position,
        })
    }
}

impl ReadModel for AccessTokenReadModel {
    type Event = OidcSessionEvent;
    const REQUIRES_CREATION: bool = true;

    fn query(&self) -> SearchQuery {
        SearchQuery::new(self.base.instance_id()).clause(
            FilterClause::aggregate(oidc_session::AGGREGATE_TYPE)
                .aggregate_id(self.base.aggregate_id())
                .event_types(oidc_session_events::ALL),
        )
    }

    fn base(&self) -> &ReadModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ReadModelBase {
        &mut self.base
    }

    fn apply(&mut self, meta: &EventMeta, event: OidcSessionEvent) -> Result<(), ReduceError> {
        match event {
            OidcSessionEvent::Added(added) => {
                self.session = Some(added);
            }
            OidcSessionEvent::AccessTokenAdded(added) => {
                let lifetime = chrono::Duration::from_std(added.lifetime).map_err(|_| {
                    ReduceError::Inconsistent(format!(
                        "access token lifetime out of range at {}",
                        meta.event_type
                    ))
                })?;
                let expiration = meta.created_at.checked_add_signed(lifetime).ok_or_else(|| {
                    ReduceError::Inconsistent("access token expiration overflows".to_string())
                })?;
                self.access_token = Some(CurrentAccessToken {
                    id: added.id,
                    scope: added.scope,
                    creation: meta.created_at,
                    expiration,
                    reason: added.reason,
                });
            }
            OidcSessionEvent::AccessTokenRevoked(_) | OidcSessionEvent::RefreshTokenRevoked(_) => {
                self.access_token = None;
            }
        }
        Ok(())
    }

    fn is_creation_event(event: &OidcSessionEvent) -> bool {
        matches!(event, OidcSessionEvent::Added(_))
    }
}
