//! Token validation constants.
//!
//! Event type names the validator subscribes to, grouped by aggregate.

/// Separator between the OIDC session id and the access token id.
pub const TOKEN_DELIMITER: char = '.';

/// OIDC session lifecycle events folded into the access token read model.
pub mod oidc_session_events {
    /// Session created.
    pub const ADDED: &str = "oidc_session.added";

    /// Access token issued.
    pub const ACCESS_TOKEN_ADDED: &str = "oidc_session.access_token.added";

    /// Access token revoked.
    pub const ACCESS_TOKEN_REVOKED: &str = "oidc_session.access_token.revoked";

    /// Refresh token revoked.
    pub const REFRESH_TOKEN_REVOKED: &str = "oidc_session.refresh_token.revoked";

    /// All of the above.
    pub const ALL: [&str; 4] = [ADDED, ACCESS_TOKEN_ADDED, ACCESS_TOKEN_REVOKED, REFRESH_TOKEN_REVOKED];
}

/// Events that end every token derived from a login session or user.
pub mod termination_events {
    /// Login session terminated.
    pub const SESSION_TERMINATED: &str = "session.terminated";

    /// User deactivated.
    pub const USER_DEACTIVATED: &str = "user.deactivated";

    /// User locked.
    pub const USER_LOCKED: &str = "user.locked";

    /// User removed.
    pub const USER_REMOVED: &str = "user.removed";

    /// Legacy per-device sign-out; only counts for the token's device.
    pub const USER_SIGNED_OUT: &str = "user.human.signed.out";

    /// Termination events on the user aggregate.
    pub const USER: [&str; 4] = [USER_DEACTIVATED, USER_LOCKED, USER_REMOVED, USER_SIGNED_OUT];
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmodel_events::Payload;
    use readmodel_events::{oidc_session, session, user};

    #[test]
    fn test_names_match_payload_catalogue() {
        assert_eq!(oidc_session_events::ADDED, oidc_session::Added::EVENT_TYPE);
        assert_eq!(
            oidc_session_events::ACCESS_TOKEN_ADDED,
            oidc_session::AccessTokenAdded::EVENT_TYPE
        );
        assert_eq!(
            oidc_session_events::ACCESS_TOKEN_REVOKED,
            oidc_session::AccessTokenRevoked::EVENT_TYPE
        );
        assert_eq!(
            oidc_session_events::REFRESH_TOKEN_REVOKED,
            oidc_session::RefreshTokenRevoked::EVENT_TYPE
        );
        assert_eq!(termination_events::SESSION_TERMINATED, session::Terminated::EVENT_TYPE);
        assert_eq!(termination_events::USER_DEACTIVATED, user::Deactivated::EVENT_TYPE);
        assert_eq!(termination_events::USER_LOCKED, user::Locked::EVENT_TYPE);
        assert_eq!(termination_events::USER_REMOVED, user::Removed::EVENT_TYPE);
        assert_eq!(termination_events::USER_SIGNED_OUT, user::SignedOut::EVENT_TYPE);
    }
}
