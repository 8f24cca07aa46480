use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::domain::account::models::UserId;

/// Opaque server-side session identifier.
///
/// 32 bytes from the OS CSPRNG, base64url encoded. Only the short prefix is
/// ever logged.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    const LOG_PREFIX: usize = 8;

    /// Generate a fresh identifier.
    ///
    /// # Errors
    /// * `SessionTokenError` - The OS random source failed
    pub fn generate() -> Result<Self, auth::SessionTokenError> {
        auth::generate_session_token().map(Self)
    }

    /// Wrap an identifier received from a token claim or a path segment.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix safe to put in logs and audit entries.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(Self::LOG_PREFIX)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({}...)", self.short())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side record of one logged-in device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Not revoked and not past its expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

/// Values needed to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}
