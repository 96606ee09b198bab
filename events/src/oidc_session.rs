//! OIDC session events.
//!
//! An OIDC session is created when a client completes an authorization flow.
//! It holds at most one current access token; the token id handed to the
//! client is `"<oidc session id>.<access token id>"`.

use crate::payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregate type of OIDC sessions.
pub const AGGREGATE_TYPE: &str = "oidc_session";

/// OIDC session was created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Added {
    /// User the session was issued to.
    pub user_id: String,
    /// Resource owner of the user.
    pub user_resource_owner: String,
    /// Interactive login session this OIDC session was derived from.
    pub session_id: String,
    /// Client (application) the session was issued to.
    pub client_id: String,
    /// Token audience.
    pub audience: Vec<String>,
    /// Granted scopes.
    pub scope: Vec<String>,
    /// Authentication methods used, e.g. `"password"`, `"passkey"`.
    pub auth_methods: Vec<String>,
    /// When the user authenticated.
    pub auth_time: DateTime<Utc>,
    /// Device fingerprint (user agent id) of the login, if known.
    pub user_agent_id: Option<String>,
}
payload!(Added, AGGREGATE_TYPE, "oidc_session.added");

/// Why a token was issued.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenReason {
    /// Authorization code exchange.
    AuthRequest,
    /// Refresh token grant.
    Refresh,
    /// JWT profile or client credentials grant.
    JwtProfile,
    /// Token exchange grant.
    Exchange,
}

/// A new access token was issued; it replaces any previous one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenAdded {
    /// Access token id.
    pub id: String,
    /// Scopes of this token.
    pub scope: Vec<String>,
    /// Lifetime counted from the event's creation time.
    pub lifetime: Duration,
    /// Grant that issued the token.
    pub reason: TokenReason,
}
payload!(AccessTokenAdded, AGGREGATE_TYPE, "oidc_session.access_token.added");

/// The current access token was revoked.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenRevoked {}
payload!(AccessTokenRevoked, AGGREGATE_TYPE, "oidc_session.access_token.revoked");

/// The refresh token was revoked; this also ends the current access token.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshTokenRevoked {}
payload!(RefreshTokenRevoked, AGGREGATE_TYPE, "oidc_session.refresh_token.revoked");
