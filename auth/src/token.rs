//! Access token wire format: `"<oidc session id>.<access token id>"`.

use crate::constants::TOKEN_DELIMITER;
use crate::error::TokenFormatError;
use std::fmt;
use std::str::FromStr;

/// A syntactically valid opaque access token.
///
/// `Debug` never prints the token id.
///
/// # Example
///
/// ```
/// use readmodel_auth::AccessToken;
///
/// let token = AccessToken::parse("V2_sess1.tok1").unwrap();
/// assert_eq!(token.oidc_session_id(), "V2_sess1");
/// assert_eq!(token.token_id(), "tok1");
///
/// assert!(AccessToken::parse("sess1").is_err());
/// assert!(AccessToken::parse("a.b.c").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    oidc_session_id: String,
    token_id: String,
}

impl AccessToken {
    /// Split `token` into its two segments.
    ///
    /// # Errors
    ///
    /// Returns [`TokenFormatError`] unless the input has exactly one
    /// delimiter with a non-empty segment on each side.
    pub fn parse(token: &str) -> Result<Self, TokenFormatError> {
        if token.is_empty() {
            return Err(TokenFormatError::Empty);
        }

        let mut segments = token.split(TOKEN_DELIMITER);
        match (segments.next(), segments.next(), segments.next()) {
            (Some(session), Some(id), None) => {
                if session.is_empty() || id.is_empty() {
                    return Err(TokenFormatError::EmptySegment);
                }
                Ok(Self {
                    oidc_session_id: session.to_string(),
                    token_id: id.to_string(),
                })
            }
            _ => Err(TokenFormatError::Delimiter),
        }
    }

    /// Aggregate id of the OIDC session holding the token.
    #[must_use]
    pub fn oidc_session_id(&self) -> &str {
        &self.oidc_session_id
    }

    /// Access token id within the session.
    #[must_use]
    pub fn token_id(&self) -> &str {
        &self.token_id
    }
}

impl FromStr for AccessToken {
    type Err = TokenFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{TOKEN_DELIMITER}{}", self.oidc_session_id, self.token_id)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("oidc_session_id", &self.oidc_session_id)
            .field("token_id", &"<redacted>")
            .finish()
    }
}
