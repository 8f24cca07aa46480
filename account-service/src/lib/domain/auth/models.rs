use chrono::Duration;

use crate::domain::account::models::Credential;
use crate::domain::account::models::Role;
use crate::domain::account::models::UserId;
use crate::domain::audit::models::ClientInfo;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;

/// Authenticated caller, attached to the request by the middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub session_id: SessionId,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Login attempt as received from the edge.
#[derive(Debug)]
pub struct LoginCommand {
    /// Username or email
    pub identifier: String,
    pub password: String,
    pub device_info: Option<String>,
    pub client: ClientInfo,
}

/// Successful login or registration: the new session and its token pair.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub credential: Credential,
    pub session: Session,
    pub tokens: auth::TokenPair,
}

/// Failed-attempt threshold and lock duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_duration: Duration::minutes(30),
        }
    }
}

/// Session lifetime and housekeeping settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub ttl: Duration,
    /// Minimum spacing between two last-activity writes for one session
    pub activity_debounce: std::time::Duration,
    /// How long revoked sessions are kept before garbage collection
    pub revoked_retention: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            activity_debounce: std::time::Duration::from_secs(5),
            revoked_retention: Duration::days(7),
        }
    }
}
