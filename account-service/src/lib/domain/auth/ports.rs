use async_trait::async_trait;

use crate::domain::account::models::Credential;
use crate::domain::account::models::UserId;
use crate::domain::audit::models::ClientInfo;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::Identity;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::SessionGrant;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;

/// Port for login, session and token operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Verify credentials and open a session.
    ///
    /// Lock, ban and active checks run before the password is verified.
    ///
    /// # Arguments
    /// * `command` - Identifier (username or email), password and client origin
    ///
    /// # Returns
    /// Credential, new session and its token pair
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown identifier or wrong password
    /// * `AccountLocked` - Lockout in force
    /// * `AccountBanned` - Credential is banned
    /// * `AccountDeactivated` - Credential is inactive
    /// * `StoreUnavailable` - Storage operation failed
    async fn login(&self, command: LoginCommand) -> Result<SessionGrant, AuthError>;

    /// Open a session for an already verified credential and issue tokens.
    ///
    /// # Errors
    /// * `StoreUnavailable` - Session insert failed
    /// * `Internal` - Token signing or id generation failed
    async fn open_session(
        &self,
        credential: Credential,
        device_info: Option<String>,
        client: &ClientInfo,
    ) -> Result<SessionGrant, AuthError>;

    /// Resolve a bearer access token into an identity.
    ///
    /// The bound session is checked for liveness on every call.
    ///
    /// # Errors
    /// * `Unauthorized` - Token invalid, not an access token, or session not live
    /// * `StoreUnavailable` - Session lookup failed
    async fn authenticate(&self, access_token: &str) -> Result<Identity, AuthError>;

    /// Exchange a refresh token for a new pair bound to the same session.
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - Token invalid or not a refresh token
    /// * `SessionExpiredOrInvalid` - Bound session is revoked or expired
    /// * `AccountInactiveOrBanned` - Credential missing, banned or inactive
    /// * `StoreUnavailable` - Storage operation failed
    async fn refresh(&self, refresh_token: &str) -> Result<auth::TokenPair, AuthError>;

    /// Revoke one of the caller's sessions, or all of them.
    ///
    /// # Arguments
    /// * `identity` - Authenticated caller
    /// * `session_id` - Session to revoke; `None` revokes every live session
    /// * `client` - Request origin for the audit trail
    ///
    /// # Returns
    /// Number of sessions revoked
    ///
    /// # Errors
    /// * `SessionNotFound` - Explicit session is not a live session of the caller
    /// * `StoreUnavailable` - Storage operation failed
    async fn logout(
        &self,
        identity: &Identity,
        session_id: Option<SessionId>,
        client: &ClientInfo,
    ) -> Result<u64, AuthError>;

    /// Live sessions of a user.
    ///
    /// # Errors
    /// * `StoreUnavailable` - Storage operation failed
    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<Session>, AuthError>;

    /// Live sessions of any user, for administrators.
    ///
    /// # Errors
    /// * `StoreUnavailable` - Storage operation failed
    async fn admin_list_sessions(
        &self,
        admin: &Identity,
        user_id: UserId,
    ) -> Result<Vec<Session>, AuthError>;

    /// Revoke one session of a user on an administrator's behalf.
    ///
    /// # Errors
    /// * `SessionNotFound` - Session is not a live session of `user_id`
    /// * `StoreUnavailable` - Storage operation failed
    async fn admin_revoke_session(
        &self,
        admin: &Identity,
        user_id: UserId,
        session_id: SessionId,
        client: &ClientInfo,
    ) -> Result<(), AuthError>;

    /// Revoke every live session of a user on an administrator's behalf.
    ///
    /// # Returns
    /// Number of sessions revoked
    ///
    /// # Errors
    /// * `StoreUnavailable` - Storage operation failed
    async fn admin_revoke_all_sessions(
        &self,
        admin: &Identity,
        user_id: UserId,
        client: &ClientInfo,
    ) -> Result<u64, AuthError>;

    /// Delete expired sessions and revoked sessions past retention.
    ///
    /// # Returns
    /// Number of sessions deleted
    ///
    /// # Errors
    /// * `StoreUnavailable` - Storage operation failed
    async fn cleanup_sessions(&self) -> Result<u64, AuthError>;
}
