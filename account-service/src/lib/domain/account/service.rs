use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::account::errors::AccountError;
use crate::domain::account::models::ChangePasswordCommand;
use crate::domain::account::models::Credential;
use crate::domain::account::models::NewCredential;
use crate::domain::account::models::Password;
use crate::domain::account::models::RegisterCommand;
use crate::domain::account::models::Role;
use crate::domain::account::models::StatusChange;
use crate::domain::account::models::UserId;
use crate::domain::account::ports::AccountServicePort;
use crate::domain::account::ports::CredentialStore;
use crate::domain::audit::models::AuditAction;
use crate::domain::audit::models::AuditEntry;
use crate::domain::audit::models::ClientInfo;
use crate::domain::audit::ports::AuditLog;
use crate::domain::auth::activity::ActivityDebouncer;
use crate::domain::session::ports::SessionStore;

/// Domain service implementation for account lifecycle operations.
///
/// Concrete implementation of AccountServicePort with dependency injection.
pub struct AccountService<CS, SS, AL>
where
    CS: CredentialStore,
    SS: SessionStore,
    AL: AuditLog,
{
    credentials: Arc<CS>,
    sessions: Arc<SS>,
    audit_log: Arc<AL>,
    password_hasher: auth::PasswordHasher,
    activity: Arc<ActivityDebouncer>,
}

impl<CS, SS, AL> AccountService<CS, SS, AL>
where
    CS: CredentialStore,
    SS: SessionStore,
    AL: AuditLog,
{
    /// Create a new account service with injected dependencies.
    ///
    /// # Arguments
    /// * `credentials` - Credential persistence implementation
    /// * `sessions` - Session persistence, used to revoke on ban/deactivate
    /// * `audit_log` - Audit sink
    /// * `password_hasher` - Argon2id hasher with the configured cost
    /// * `activity` - Debouncer shared with the auth service
    pub fn new(
        credentials: Arc<CS>,
        sessions: Arc<SS>,
        audit_log: Arc<AL>,
        password_hasher: auth::PasswordHasher,
        activity: Arc<ActivityDebouncer>,
    ) -> Self {
        Self {
            credentials,
            sessions,
            audit_log,
            password_hasher,
            activity,
        }
    }

    async fn hash(&self, password: String) -> Result<String, AccountError> {
        let hasher = self.password_hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?
            .map_err(|e| AccountError::Hashing(e.to_string()))
    }

    async fn verify(&self, password: String, stored_hash: String) -> Result<bool, AccountError> {
        let hasher = self.password_hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?
            .map_err(|e| AccountError::Hashing(e.to_string()))
    }

    async fn audit(&self, entry: AuditEntry) {
        let action = entry.action;
        if let Err(e) = self.audit_log.record(entry).await {
            tracing::warn!(action = %action, error = %e, "Failed to write audit entry");
        }
    }
}

#[async_trait]
impl<CS, SS, AL> AccountServicePort for AccountService<CS, SS, AL>
where
    CS: CredentialStore,
    SS: SessionStore,
    AL: AuditLog,
{
    async fn register(
        &self,
        command: RegisterCommand,
        client: &ClientInfo,
    ) -> Result<Credential, AccountError> {
        if self
            .credentials
            .username_exists(command.username.as_str())
            .await?
        {
            return Err(AccountError::UsernameAlreadyExists(
                command.username.to_string(),
            ));
        }
        if self.credentials.email_exists(command.email.as_str()).await? {
            return Err(AccountError::EmailAlreadyExists(command.email.to_string()));
        }

        let password_hash = self.hash(command.password.expose().to_string()).await?;

        // Store constraints still catch a concurrent duplicate
        let credential = self
            .credentials
            .create(NewCredential {
                username: command.username,
                email: command.email,
                full_name: command.full_name,
                password_hash,
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = %credential.id, username = %credential.username, "Account registered");

        self.audit(
            AuditEntry::new(AuditAction::UserRegister, "user")
                .actor(credential.id)
                .entity(credential.id)
                .client(client),
        )
        .await;

        Ok(credential)
    }

    async fn get_account(&self, id: UserId) -> Result<Credential, AccountError> {
        self.credentials
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound(id.to_string()))
    }

    async fn is_username_available(&self, username: &str) -> Result<bool, AccountError> {
        Ok(!self.credentials.username_exists(username).await?)
    }

    async fn is_email_available(&self, email: &str) -> Result<bool, AccountError> {
        Ok(!self.credentials.email_exists(email).await?)
    }

    async fn change_password(
        &self,
        id: UserId,
        command: ChangePasswordCommand,
        client: &ClientInfo,
    ) -> Result<(), AccountError> {
        let credential = self.get_account(id).await?;

        if !self
            .verify(command.current_password, credential.password_hash)
            .await?
        {
            tracing::warn!(user_id = %id, "Password change rejected: current password mismatch");
            return Err(AccountError::IncorrectPassword);
        }

        let password_hash = self.hash(command.new_password.expose().to_string()).await?;
        self.credentials.update_password_hash(id, password_hash).await?;

        tracing::info!(user_id = %id, "Password changed");

        self.audit(
            AuditEntry::new(AuditAction::PasswordChange, "user")
                .actor(id)
                .entity(id)
                .client(client),
        )
        .await;

        Ok(())
    }

    async fn change_status(
        &self,
        admin_id: UserId,
        user_id: UserId,
        change: StatusChange,
        client: &ClientInfo,
    ) -> Result<Credential, AccountError> {
        let (exists, action) = match change {
            StatusChange::Ban => (
                self.credentials.set_banned(user_id, true).await?,
                AuditAction::UserBanned,
            ),
            StatusChange::Unban => (
                self.credentials.set_banned(user_id, false).await?,
                AuditAction::UserUnbanned,
            ),
            StatusChange::Deactivate => (
                self.credentials.set_active(user_id, false).await?,
                AuditAction::UserDeactivated,
            ),
            StatusChange::Reactivate => (
                self.credentials.set_active(user_id, true).await?,
                AuditAction::UserReactivated,
            ),
        };

        if !exists {
            return Err(AccountError::NotFound(user_id.to_string()));
        }

        if change.revokes_sessions() {
            let revoked = self.sessions.revoke_all_for_user(user_id, None).await?;
            self.activity.forget_user(user_id);
            tracing::info!(user_id = %user_id, revoked, "Sessions revoked after status change");
        }

        tracing::info!(admin_id = %admin_id, user_id = %user_id, action = %action, "Account status changed");

        self.audit(
            AuditEntry::new(action, "user")
                .actor(admin_id)
                .entity(user_id)
                .client(client),
        )
        .await;

        self.get_account(user_id).await
    }

    async fn admin_reset_password(
        &self,
        admin_id: UserId,
        user_id: UserId,
        new_password: Password,
        client: &ClientInfo,
    ) -> Result<(), AccountError> {
        self.get_account(user_id).await?;

        let password_hash = self.hash(new_password.expose().to_string()).await?;
        self.credentials
            .update_password_hash(user_id, password_hash)
            .await?;

        tracing::info!(admin_id = %admin_id, user_id = %user_id, "Password reset by admin");

        self.audit(
            AuditEntry::new(AuditAction::PasswordReset, "user")
                .actor(admin_id)
                .entity(user_id)
                .client(client),
        )
        .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use chrono::Duration;
    use chrono::Utc;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::account::models::AttemptOutcome;
    use crate::domain::account::models::EmailAddress;
    use crate::domain::account::models::Username;
    use crate::domain::audit::models::AuditFilter;
    use crate::domain::audit::models::AuditPage;
    use crate::domain::audit::models::Page;
    use crate::domain::errors::StoreError;
    use crate::domain::session::models::NewSession;
    use crate::domain::session::models::Session;
    use crate::domain::session::models::SessionId;

    mock! {
        pub TestCredentialStore {}

        #[async_trait]
        impl CredentialStore for TestCredentialStore {
            async fn create(&self, credential: NewCredential) -> Result<Credential, StoreError>;
            async fn find_by_id(&self, id: UserId) -> Result<Option<Credential>, StoreError>;
            async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, StoreError>;
            async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;
            async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;
            async fn record_failed_attempt(&self, id: UserId, lock_threshold: u32, lock_until: DateTime<Utc>) -> Result<AttemptOutcome, StoreError>;
            async fn reset_attempts(&self, id: UserId) -> Result<(), StoreError>;
            async fn update_last_login(&self, id: UserId, ip: Option<String>) -> Result<(), StoreError>;
            async fn update_password_hash(&self, id: UserId, password_hash: String) -> Result<(), StoreError>;
            async fn set_banned(&self, id: UserId, banned: bool) -> Result<bool, StoreError>;
            async fn set_active(&self, id: UserId, active: bool) -> Result<bool, StoreError>;
        }
    }

    mock! {
        pub TestSessionStore {}

        #[async_trait]
        impl SessionStore for TestSessionStore {
            async fn create(&self, session: NewSession) -> Result<Session, StoreError>;
            async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;
            async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError>;
            async fn touch(&self, id: &SessionId) -> Result<(), StoreError>;
            async fn revoke(&self, id: &SessionId) -> Result<bool, StoreError>;
            async fn revoke_all_for_user(&self, user_id: UserId, except: Option<SessionId>) -> Result<u64, StoreError>;
            async fn delete_stale(&self, now: DateTime<Utc>, revoked_retention: Duration) -> Result<u64, StoreError>;
        }
    }

    mock! {
        pub TestAuditLog {}

        #[async_trait]
        impl AuditLog for TestAuditLog {
            async fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;
            async fn list(&self, filter: &AuditFilter, page: Page) -> Result<AuditPage, StoreError>;
            async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
        }
    }

    fn fast_hasher() -> auth::PasswordHasher {
        auth::PasswordHasher::with_params(1024, 1, 1).unwrap()
    }

    fn debouncer() -> Arc<ActivityDebouncer> {
        Arc::new(ActivityDebouncer::new(std::time::Duration::from_secs(5)))
    }

    fn credential(id: i64, password_hash: String) -> Credential {
        Credential {
            id: UserId(id),
            username: Username::new("alice".to_string()).unwrap(),
            email: EmailAddress::new("alice@example.com".to_string()).unwrap(),
            full_name: "Alice".to_string(),
            password_hash,
            role: Role::User,
            is_active: true,
            is_banned: false,
            login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    fn register_command() -> RegisterCommand {
        RegisterCommand::new(
            Username::new("alice".to_string()).unwrap(),
            EmailAddress::new("alice@example.com".to_string()).unwrap(),
            "Alice".to_string(),
            Password::new("correctHorse1".to_string()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_register_hashes_and_forces_user_role() {
        let mut credentials = MockTestCredentialStore::new();
        let sessions = MockTestSessionStore::new();
        let mut audit_log = MockTestAuditLog::new();

        credentials
            .expect_username_exists()
            .times(1)
            .returning(|_| Ok(false));
        credentials
            .expect_email_exists()
            .times(1)
            .returning(|_| Ok(false));
        credentials
            .expect_create()
            .withf(|c| c.role == Role::User && c.password_hash.starts_with("$argon2id"))
            .times(1)
            .returning(|c| Ok(credential(1, c.password_hash)));
        audit_log
            .expect_record()
            .withf(|e| e.action == AuditAction::UserRegister && e.actor == Some(UserId(1)))
            .times(1)
            .returning(|_| Ok(()));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(sessions),
            Arc::new(audit_log),
            fast_hasher(),
            debouncer(),
        );

        let created = service
            .register(register_command(), &ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(created.id, UserId(1));
        assert_ne!(created.password_hash, "correctHorse1");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_skips_insert() {
        let mut credentials = MockTestCredentialStore::new();
        let mut audit_log = MockTestAuditLog::new();

        credentials
            .expect_username_exists()
            .withf(|username| username == "alice")
            .times(1)
            .returning(|_| Ok(true));
        credentials.expect_create().times(0);
        audit_log.expect_record().times(0);

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(MockTestSessionStore::new()),
            Arc::new(audit_log),
            fast_hasher(),
            debouncer(),
        );

        let result = service
            .register(register_command(), &ClientInfo::default())
            .await;
        assert!(matches!(result, Err(AccountError::UsernameAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_store_failure_is_unavailable() {
        let mut credentials = MockTestCredentialStore::new();
        credentials
            .expect_username_exists()
            .returning(|_| Err(StoreError::Unavailable("connection refused".to_string())));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(MockTestSessionStore::new()),
            Arc::new(MockTestAuditLog::new()),
            fast_hasher(),
            debouncer(),
        );

        let result = service
            .register(register_command(), &ClientInfo::default())
            .await;
        assert!(matches!(result, Err(AccountError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_register_survives_audit_failure() {
        let mut credentials = MockTestCredentialStore::new();
        let mut audit_log = MockTestAuditLog::new();

        credentials.expect_username_exists().returning(|_| Ok(false));
        credentials.expect_email_exists().returning(|_| Ok(false));
        credentials
            .expect_create()
            .returning(|c| Ok(credential(3, c.password_hash)));
        audit_log
            .expect_record()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("audit down".to_string())));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(MockTestSessionStore::new()),
            Arc::new(audit_log),
            fast_hasher(),
            debouncer(),
        );

        assert!(service
            .register(register_command(), &ClientInfo::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_change_password_rejects_wrong_current_password() {
        let hash = fast_hasher().hash("correctHorse1").unwrap();
        let mut credentials = MockTestCredentialStore::new();
        credentials
            .expect_find_by_id()
            .returning(move |id| Ok(Some(credential(id.0, hash.clone()))));
        credentials.expect_update_password_hash().times(0);

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(MockTestSessionStore::new()),
            Arc::new(MockTestAuditLog::new()),
            fast_hasher(),
            debouncer(),
        );

        let result = service
            .change_password(
                UserId(1),
                ChangePasswordCommand {
                    current_password: "wrong-password".to_string(),
                    new_password: Password::new("newPassword1".to_string()).unwrap(),
                },
                &ClientInfo::default(),
            )
            .await;
        assert!(matches!(result, Err(AccountError::IncorrectPassword)));
    }

    #[tokio::test]
    async fn test_change_password_rehashes() {
        let hash = fast_hasher().hash("correctHorse1").unwrap();
        let mut credentials = MockTestCredentialStore::new();
        let mut audit_log = MockTestAuditLog::new();

        credentials
            .expect_find_by_id()
            .returning(move |id| Ok(Some(credential(id.0, hash.clone()))));
        credentials
            .expect_update_password_hash()
            .withf(|id, hash| *id == UserId(1) && hash.starts_with("$argon2id"))
            .times(1)
            .returning(|_, _| Ok(()));
        audit_log
            .expect_record()
            .withf(|e| e.action == AuditAction::PasswordChange)
            .times(1)
            .returning(|_| Ok(()));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(MockTestSessionStore::new()),
            Arc::new(audit_log),
            fast_hasher(),
            debouncer(),
        );

        let result = service
            .change_password(
                UserId(1),
                ChangePasswordCommand {
                    current_password: "correctHorse1".to_string(),
                    new_password: Password::new("newPassword1".to_string()).unwrap(),
                },
                &ClientInfo::default(),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_ban_revokes_sessions_and_audits_admin() {
        let mut credentials = MockTestCredentialStore::new();
        let mut sessions = MockTestSessionStore::new();
        let mut audit_log = MockTestAuditLog::new();

        credentials
            .expect_set_banned()
            .with(eq(UserId(2)), eq(true))
            .times(1)
            .returning(|_, _| Ok(true));
        credentials.expect_find_by_id().returning(|id| {
            let mut c = credential(id.0, "$argon2id$stub".to_string());
            c.is_banned = true;
            Ok(Some(c))
        });
        sessions
            .expect_revoke_all_for_user()
            .with(eq(UserId(2)), eq(None))
            .times(1)
            .returning(|_, _| Ok(3));
        audit_log
            .expect_record()
            .withf(|e| {
                e.action == AuditAction::UserBanned
                    && e.actor == Some(UserId(9))
                    && e.entity_id.as_deref() == Some("2")
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(sessions),
            Arc::new(audit_log),
            fast_hasher(),
            debouncer(),
        );

        let updated = service
            .change_status(UserId(9), UserId(2), StatusChange::Ban, &ClientInfo::default())
            .await
            .unwrap();
        assert!(updated.is_banned);
    }

    #[tokio::test]
    async fn test_unban_leaves_sessions_alone() {
        let mut credentials = MockTestCredentialStore::new();
        let mut sessions = MockTestSessionStore::new();
        let mut audit_log = MockTestAuditLog::new();

        credentials
            .expect_set_banned()
            .returning(|_, _| Ok(true));
        credentials
            .expect_find_by_id()
            .returning(|id| Ok(Some(credential(id.0, "$argon2id$stub".to_string()))));
        sessions.expect_revoke_all_for_user().times(0);
        audit_log.expect_record().returning(|_| Ok(()));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(sessions),
            Arc::new(audit_log),
            fast_hasher(),
            debouncer(),
        );

        assert!(service
            .change_status(UserId(9), UserId(2), StatusChange::Unban, &ClientInfo::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_status_change_unknown_user() {
        let mut credentials = MockTestCredentialStore::new();
        credentials.expect_set_active().returning(|_, _| Ok(false));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(MockTestSessionStore::new()),
            Arc::new(MockTestAuditLog::new()),
            fast_hasher(),
            debouncer(),
        );

        let result = service
            .change_status(
                UserId(9),
                UserId(404),
                StatusChange::Deactivate,
                &ClientInfo::default(),
            )
            .await;
        assert!(matches!(result, Err(AccountError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_deactivate_forgets_debounced_sessions() {
        let mut credentials = MockTestCredentialStore::new();
        let mut sessions = MockTestSessionStore::new();
        let mut audit_log = MockTestAuditLog::new();

        credentials
            .expect_set_active()
            .with(eq(UserId(2)), eq(false))
            .returning(|_, _| Ok(true));
        credentials
            .expect_find_by_id()
            .returning(|id| Ok(Some(credential(id.0, "$argon2id$stub".to_string()))));
        sessions
            .expect_revoke_all_for_user()
            .times(1)
            .returning(|_, _| Ok(1));
        audit_log.expect_record().returning(|_| Ok(()));

        let activity = debouncer();
        let now = std::time::Instant::now();
        let target = SessionId::from_string("target-session");
        let bystander = SessionId::from_string("bystander-session");
        assert!(activity.should_touch(&target, UserId(2), now));
        assert!(activity.should_touch(&bystander, UserId(3), now));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(sessions),
            Arc::new(audit_log),
            fast_hasher(),
            Arc::clone(&activity),
        );

        service
            .change_status(
                UserId(9),
                UserId(2),
                StatusChange::Deactivate,
                &ClientInfo::default(),
            )
            .await
            .unwrap();

        // The target's entry is gone, the other user's is still debounced
        assert!(activity.should_touch(&target, UserId(2), now));
        assert!(!activity.should_touch(&bystander, UserId(3), now));
    }

    #[tokio::test]
    async fn test_admin_reset_password_rehashes_and_audits_admin() {
        let mut credentials = MockTestCredentialStore::new();
        let mut audit_log = MockTestAuditLog::new();

        credentials
            .expect_find_by_id()
            .returning(|id| Ok(Some(credential(id.0, "$argon2id$old".to_string()))));
        credentials
            .expect_update_password_hash()
            .withf(|id, hash| *id == UserId(2) && hash.starts_with("$argon2id") && hash != "$argon2id$old")
            .times(1)
            .returning(|_, _| Ok(()));
        audit_log
            .expect_record()
            .withf(|e| {
                e.action == AuditAction::PasswordReset
                    && e.actor == Some(UserId(9))
                    && e.entity_id.as_deref() == Some("2")
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(MockTestSessionStore::new()),
            Arc::new(audit_log),
            fast_hasher(),
            debouncer(),
        );

        let result = service
            .admin_reset_password(
                UserId(9),
                UserId(2),
                Password::new("freshPassword1".to_string()).unwrap(),
                &ClientInfo::default(),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_admin_reset_password_unknown_user() {
        let mut credentials = MockTestCredentialStore::new();
        credentials.expect_find_by_id().returning(|_| Ok(None));
        credentials.expect_update_password_hash().times(0);

        let service = AccountService::new(
            Arc::new(credentials),
            Arc::new(MockTestSessionStore::new()),
            Arc::new(MockTestAuditLog::new()),
            fast_hasher(),
            debouncer(),
        );

        let result = service
            .admin_reset_password(
                UserId(9),
                UserId(404),
                Password::new("freshPassword1".to_string()).unwrap(),
                &ClientInfo::default(),
            )
            .await;
        assert!(matches!(result, Err(AccountError::NotFound(_))));
    }
}
