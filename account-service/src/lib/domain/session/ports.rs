use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::account::models::UserId;
use crate::domain::errors::StoreError;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;

/// Persistence operations for server-side sessions.
///
/// Revocation is a flag flip; only `delete_stale` removes rows.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Persist a new live session.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn create(&self, session: NewSession) -> Result<Session, StoreError>;

    /// Retrieve a session that is neither revoked nor expired.
    ///
    /// # Returns
    /// `None` when the id is unknown, revoked or expired
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Live sessions of a user, most recently active first.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError>;

    /// Set `last_activity_at` to now.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn touch(&self, id: &SessionId) -> Result<(), StoreError>;

    /// Revoke one session.
    ///
    /// # Returns
    /// `true` if a non-revoked row was flipped
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn revoke(&self, id: &SessionId) -> Result<bool, StoreError>;

    /// Revoke every live session of a user, optionally sparing one.
    ///
    /// # Arguments
    /// * `user_id` - Owner of the sessions
    /// * `except` - Session left untouched, if any
    ///
    /// # Returns
    /// Number of sessions revoked
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        except: Option<SessionId>,
    ) -> Result<u64, StoreError>;

    /// Delete expired sessions, and revoked sessions older than the retention.
    ///
    /// # Returns
    /// Number of rows deleted
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn delete_stale(
        &self,
        now: DateTime<Utc>,
        revoked_retention: Duration,
    ) -> Result<u64, StoreError>;
}
