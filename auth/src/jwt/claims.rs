use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Purpose of a signed token.
///
/// Serialized into the `type` claim so that an access token can never be
/// replayed where a refresh token is expected, and vice versa.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Identity a token is issued for.
///
/// Kept service-agnostic: callers convert their own user and role types
/// into strings before issuing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: String,
    pub username: String,
    pub role: String,
}

impl TokenSubject {
    pub fn new(user_id: impl ToString, username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: username.into(),
            role: role.into(),
        }
    }
}

/// Claim set carried by every access and refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    pub username: String,

    pub role: String,

    /// Server-side session the token is bound to
    pub sid: String,

    /// Token purpose
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Build claims for a subject bound to a session.
    ///
    /// # Arguments
    /// * `kind` - Access or refresh
    /// * `subject` - User the token speaks for
    /// * `session_id` - Opaque session identifier embedded as `sid`
    /// * `issued_at` - Issue instant
    /// * `ttl` - Lifetime added to `issued_at` to compute `exp`
    pub fn new(
        kind: TokenKind,
        subject: &TokenSubject,
        session_id: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: subject.user_id.clone(),
            username: subject.username.clone(),
            role: subject.role.clone(),
            sid: session_id.into(),
            kind,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// Check if token is expired.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }

    pub fn is_kind(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject::new(42, "alice", "user")
    }

    #[test]
    fn test_new_claims_sets_expiration_from_ttl() {
        let now = Utc::now();
        let claims = Claims::new(
            TokenKind::Access,
            &subject(),
            "session-1",
            now,
            Duration::minutes(15),
        );

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.sid, "session-1");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_kind_serializes_as_type_claim() {
        let claims = Claims::new(
            TokenKind::Refresh,
            &subject(),
            "session-1",
            Utc::now(),
            Duration::days(7),
        );

        let json = serde_json::to_value(&claims).expect("Failed to serialize claims");
        assert_eq!(json["type"], "refresh");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_is_expired() {
        let mut claims = Claims::new(
            TokenKind::Access,
            &subject(),
            "session-1",
            Utc::now(),
            Duration::minutes(15),
        );
        claims.exp = 1000;

        assert!(!claims.is_expired(999));
        assert!(!claims.is_expired(1000));
        assert!(claims.is_expired(1001));
    }
}
