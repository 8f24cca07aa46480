use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::account::models::Credential;
use crate::domain::account::models::Role;
use crate::domain::account::models::UserId;
use crate::domain::account::ports::CredentialStore;
use crate::domain::audit::models::AuditAction;
use crate::domain::audit::models::AuditEntry;
use crate::domain::audit::models::ClientInfo;
use crate::domain::audit::ports::AuditLog;
use crate::domain::auth::activity::ActivityDebouncer;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::Identity;
use crate::domain::auth::models::LockoutPolicy;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::SessionGrant;
use crate::domain::auth::models::SessionPolicy;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::domain::session::ports::SessionStore;

/// Domain service implementation for login, sessions and tokens.
///
/// Holds no per-user state; the only in-process state is the activity
/// debouncer.
pub struct AuthService<CS, SS, AL>
where
    CS: CredentialStore,
    SS: SessionStore,
    AL: AuditLog,
{
    credentials: Arc<CS>,
    sessions: Arc<SS>,
    audit_log: Arc<AL>,
    authenticator: Arc<auth::Authenticator>,
    lockout: LockoutPolicy,
    session_policy: SessionPolicy,
    activity: Arc<ActivityDebouncer>,
}

impl<CS, SS, AL> AuthService<CS, SS, AL>
where
    CS: CredentialStore,
    SS: SessionStore,
    AL: AuditLog,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `credentials` - Credential persistence implementation
    /// * `sessions` - Session persistence implementation
    /// * `audit_log` - Audit sink
    /// * `authenticator` - Password verification and token issuance
    /// * `lockout` - Failed-attempt threshold and lock duration
    /// * `session_policy` - Session lifetime and activity debounce
    pub fn new(
        credentials: Arc<CS>,
        sessions: Arc<SS>,
        audit_log: Arc<AL>,
        authenticator: Arc<auth::Authenticator>,
        lockout: LockoutPolicy,
        session_policy: SessionPolicy,
    ) -> Self {
        Self {
            credentials,
            sessions,
            audit_log,
            authenticator,
            lockout,
            activity: Arc::new(ActivityDebouncer::new(session_policy.activity_debounce)),
            session_policy,
        }
    }

    /// Debouncer shared with other services that revoke sessions.
    pub fn activity(&self) -> Arc<ActivityDebouncer> {
        Arc::clone(&self.activity)
    }

    async fn verify_password(&self, password: String, stored_hash: String) -> Result<bool, AuthError> {
        let authenticator = Arc::clone(&self.authenticator);
        tokio::task::spawn_blocking(move || authenticator.verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(AuthError::from)
    }

    fn issue_tokens(&self, credential: &Credential, session_id: &SessionId) -> Result<auth::TokenPair, AuthError> {
        let subject = auth::TokenSubject::new(
            credential.id,
            credential.username.as_str(),
            credential.role.as_str(),
        );
        Ok(self.authenticator.issue_pair(&subject, session_id.as_str())?)
    }

    /// Write last activity unless the debouncer suppresses it. Never fails.
    async fn touch(&self, session_id: &SessionId, owner: UserId) {
        if !self.activity.should_touch(session_id, owner, Instant::now()) {
            return;
        }
        if let Err(e) = self.sessions.touch(session_id).await {
            tracing::warn!(session_id = %session_id.short(), error = %e, "Failed to update session activity");
        }
    }

    async fn audit(&self, entry: AuditEntry) {
        let action = entry.action;
        if let Err(e) = self.audit_log.record(entry).await {
            tracing::warn!(action = %action, error = %e, "Failed to write audit entry");
        }
    }

    /// Live session owned by `user_id`, else `SessionNotFound`.
    async fn owned_session(&self, user_id: UserId, session_id: &SessionId) -> Result<Session, AuthError> {
        match self.sessions.find_by_id(session_id).await? {
            Some(session) if session.user_id == user_id && session.is_live(Utc::now()) => Ok(session),
            _ => Err(AuthError::SessionNotFound),
        }
    }

    async fn revoke_one(
        &self,
        actor: UserId,
        owner: UserId,
        session_id: SessionId,
        client: &ClientInfo,
    ) -> Result<u64, AuthError> {
        self.owned_session(owner, &session_id).await?;

        let revoked = self.sessions.revoke(&session_id).await?;
        self.activity.forget(&session_id);

        if revoked {
            tracing::info!(user_id = %owner, actor = %actor, session_id = %session_id.short(), "Session revoked");
            self.audit(
                AuditEntry::new(AuditAction::SessionRevoked, "session")
                    .actor(actor)
                    .entity(session_id.short())
                    .client(client),
            )
            .await;
        }

        Ok(u64::from(revoked))
    }
}

#[async_trait]
impl<CS, SS, AL> AuthServicePort for AuthService<CS, SS, AL>
where
    CS: CredentialStore,
    SS: SessionStore,
    AL: AuditLog,
{
    async fn login(&self, command: LoginCommand) -> Result<SessionGrant, AuthError> {
        let Some(credential) = self
            .credentials
            .find_by_identifier(&command.identifier)
            .await?
        else {
            tracing::warn!("Login rejected: unknown identifier");
            return Err(AuthError::InvalidCredentials {
                attempts: None,
                locked: false,
            });
        };

        let now = Utc::now();
        if credential.is_locked(now) {
            tracing::warn!(user_id = %credential.id, "Login rejected: account locked");
            return Err(AuthError::AccountLocked {
                attempts: credential.login_attempts,
            });
        }
        if credential.is_banned {
            tracing::warn!(user_id = %credential.id, "Login rejected: account banned");
            return Err(AuthError::AccountBanned);
        }
        if !credential.is_active {
            tracing::warn!(user_id = %credential.id, "Login rejected: account deactivated");
            return Err(AuthError::AccountDeactivated);
        }

        let matches = self
            .verify_password(command.password, credential.password_hash.clone())
            .await?;

        if !matches {
            let outcome = self
                .credentials
                .record_failed_attempt(
                    credential.id,
                    self.lockout.max_attempts,
                    now + self.lockout.lock_duration,
                )
                .await?;
            let locked = outcome.is_locked(now);

            tracing::warn!(
                user_id = %credential.id,
                attempts = outcome.attempts,
                locked,
                "Login rejected: wrong password"
            );
            return Err(AuthError::InvalidCredentials {
                attempts: Some(outcome.attempts),
                locked,
            });
        }

        self.credentials.reset_attempts(credential.id).await?;
        self.credentials
            .update_last_login(credential.id, command.client.ip.clone())
            .await?;

        self.audit(
            AuditEntry::new(AuditAction::UserLogin, "user")
                .actor(credential.id)
                .entity(credential.id)
                .client(&command.client),
        )
        .await;

        let mut credential = credential;
        credential.login_attempts = 0;
        credential.locked_until = None;
        credential.last_login_at = Some(now);

        self.open_session(credential, command.device_info, &command.client)
            .await
    }

    async fn open_session(
        &self,
        credential: Credential,
        device_info: Option<String>,
        client: &ClientInfo,
    ) -> Result<SessionGrant, AuthError> {
        let session_id = SessionId::generate()?;

        let session = self
            .sessions
            .create(NewSession {
                id: session_id,
                user_id: credential.id,
                device_info,
                ip_address: client.ip.clone(),
                user_agent: client.user_agent.clone(),
                expires_at: Utc::now() + self.session_policy.ttl,
            })
            .await?;

        let tokens = self.issue_tokens(&credential, &session.id)?;

        tracing::info!(user_id = %credential.id, session_id = %session.id.short(), "Session opened");

        Ok(SessionGrant {
            credential,
            session,
            tokens,
        })
    }

    async fn authenticate(&self, access_token: &str) -> Result<Identity, AuthError> {
        let claims = self
            .authenticator
            .verify_access(access_token)
            .ok_or(AuthError::Unauthorized)?;

        let user_id = UserId::from_string(&claims.sub).map_err(|_| AuthError::Unauthorized)?;
        let role: Role = claims.role.parse().map_err(|_| AuthError::Unauthorized)?;
        let session_id = SessionId::from_string(claims.sid);

        match self.sessions.find_by_id(&session_id).await? {
            Some(session) if session.user_id == user_id && session.is_live(Utc::now()) => {}
            _ => {
                tracing::warn!(user_id = %user_id, session_id = %session_id.short(), "Rejected token for inactive session");
                return Err(AuthError::Unauthorized);
            }
        }

        self.touch(&session_id, user_id).await;

        Ok(Identity {
            user_id,
            username: claims.username,
            role,
            session_id,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<auth::TokenPair, AuthError> {
        let claims = self
            .authenticator
            .verify_refresh(refresh_token)
            .ok_or(AuthError::InvalidRefreshToken)?;
        let session_id = SessionId::from_string(claims.sid);

        let session = match self.sessions.find_by_id(&session_id).await? {
            Some(session) if session.is_live(Utc::now()) && session.user_id.to_string() == claims.sub => session,
            _ => return Err(AuthError::SessionExpiredOrInvalid),
        };

        let credential = match self.credentials.find_by_id(session.user_id).await? {
            Some(credential) if credential.can_authenticate() => credential,
            _ => {
                tracing::warn!(user_id = %session.user_id, "Refresh rejected: account inactive or banned");
                return Err(AuthError::AccountInactiveOrBanned);
            }
        };

        self.touch(&session.id, session.user_id).await;

        let tokens = self.issue_tokens(&credential, &session.id)?;
        tracing::debug!(user_id = %credential.id, session_id = %session.id.short(), "Tokens refreshed");

        Ok(tokens)
    }

    async fn logout(
        &self,
        identity: &Identity,
        session_id: Option<SessionId>,
        client: &ClientInfo,
    ) -> Result<u64, AuthError> {
        if let Some(session_id) = session_id {
            return self
                .revoke_one(identity.user_id, identity.user_id, session_id, client)
                .await;
        }

        let revoked = self
            .sessions
            .revoke_all_for_user(identity.user_id, None)
            .await?;
        self.activity.forget_user(identity.user_id);

        if revoked > 0 {
            tracing::info!(user_id = %identity.user_id, revoked, "All sessions revoked");
            self.audit(
                AuditEntry::new(AuditAction::AllSessionsRevoked, "user")
                    .actor(identity.user_id)
                    .entity(identity.user_id)
                    .client(client),
            )
            .await;
        }

        Ok(revoked)
    }

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<Session>, AuthError> {
        Ok(self.sessions.list_for_user(user_id).await?)
    }

    async fn admin_list_sessions(
        &self,
        admin: &Identity,
        user_id: UserId,
    ) -> Result<Vec<Session>, AuthError> {
        tracing::debug!(admin_id = %admin.user_id, user_id = %user_id, "Admin listing sessions");
        self.list_sessions(user_id).await
    }

    async fn admin_revoke_session(
        &self,
        admin: &Identity,
        user_id: UserId,
        session_id: SessionId,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        self.revoke_one(admin.user_id, user_id, session_id, client)
            .await
            .map(|_| ())
    }

    async fn admin_revoke_all_sessions(
        &self,
        admin: &Identity,
        user_id: UserId,
        client: &ClientInfo,
    ) -> Result<u64, AuthError> {
        let revoked = self.sessions.revoke_all_for_user(user_id, None).await?;
        self.activity.forget_user(user_id);

        tracing::info!(admin_id = %admin.user_id, user_id = %user_id, revoked, "Admin revoked all sessions");
        self.audit(
            AuditEntry::new(AuditAction::AllSessionsRevoked, "user")
                .actor(admin.user_id)
                .entity(user_id)
                .client(client),
        )
        .await;

        Ok(revoked)
    }

    async fn cleanup_sessions(&self) -> Result<u64, AuthError> {
        let deleted = self
            .sessions
            .delete_stale(Utc::now(), self.session_policy.revoked_retention)
            .await?;
        tracing::info!(deleted, "Stale sessions removed");
        Ok(deleted)
    }
}
