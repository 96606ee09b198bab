//! Validated token state returned to callers.

use chrono::{DateTime, Utc};
use readmodel_core::Position;
use readmodel_events::oidc_session::TokenReason;
use serde::{Deserialize, Serialize};

/// Everything a caller needs to authorize a request made with a valid token.
///
/// Only produced by [`AccessTokenValidator`](crate::AccessTokenValidator)
/// after every check passed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    /// OIDC session (aggregate) id.
    pub oidc_session_id: String,

    /// Resource owner of the OIDC session.
    pub resource_owner: String,

    /// User the token was issued to.
    pub user_id: String,

    /// Resource owner of the user.
    pub user_resource_owner: String,

    /// Interactive login session the OIDC session was derived from.
    pub user_session_id: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Device fingerprint of the login, if known.
    pub user_agent_id: Option<String>,

    /// Access token id.
    pub access_token_id: String,

    /// Scopes of the access token.
    pub scope: Vec<String>,

    /// Token audience.
    pub audience: Vec<String>,

    /// Authentication methods used at login.
    pub auth_methods: Vec<String>,

    /// When the user authenticated.
    pub auth_time: DateTime<Utc>,

    /// Grant that issued the token.
    pub reason: TokenReason,

    /// When the token was issued.
    pub creation: DateTime<Utc>,

    /// When the token stops being valid.
    pub expiration: DateTime<Utc>,

    #[serde(skip)]
    pub(crate) position: Position,
}

impl TokenState {
    /// Check if the token is expired at `now`.
    ///
    /// A token is expired from its expiration instant on.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// Time left until expiry, or zero once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.expiration - now).max(chrono::Duration::zero())
    }
}
