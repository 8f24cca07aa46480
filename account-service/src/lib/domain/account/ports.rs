use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::account::errors::AccountError;
use crate::domain::account::models::AttemptOutcome;
use crate::domain::account::models::ChangePasswordCommand;
use crate::domain::account::models::Credential;
use crate::domain::account::models::NewCredential;
use crate::domain::account::models::Password;
use crate::domain::account::models::RegisterCommand;
use crate::domain::account::models::StatusChange;
use crate::domain::account::models::UserId;
use crate::domain::audit::models::ClientInfo;
use crate::domain::errors::StoreError;

/// Port for account lifecycle operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register a new account with role `user`.
    ///
    /// # Arguments
    /// * `command` - Validated username, email, full name and password
    /// * `client` - Request origin for the audit trail
    ///
    /// # Returns
    /// Created credential
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` - Username is already taken
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `StoreUnavailable` - Storage operation failed
    async fn register(
        &self,
        command: RegisterCommand,
        client: &ClientInfo,
    ) -> Result<Credential, AccountError>;

    /// Retrieve an account by id.
    ///
    /// # Errors
    /// * `NotFound` - Account does not exist
    /// * `StoreUnavailable` - Storage operation failed
    async fn get_account(&self, id: UserId) -> Result<Credential, AccountError>;

    async fn is_username_available(&self, username: &str) -> Result<bool, AccountError>;

    async fn is_email_available(&self, email: &str) -> Result<bool, AccountError>;

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    /// * `IncorrectPassword` - Current password does not match
    /// * `NotFound` - Account does not exist
    /// * `StoreUnavailable` - Storage operation failed
    async fn change_password(
        &self,
        id: UserId,
        command: ChangePasswordCommand,
        client: &ClientInfo,
    ) -> Result<(), AccountError>;

    /// Apply an administrative status change.
    ///
    /// Ban and deactivate also revoke every live session of the target.
    ///
    /// # Arguments
    /// * `admin_id` - Acting administrator
    /// * `user_id` - Target account
    /// * `change` - Transition to apply
    /// * `client` - Request origin for the audit trail
    ///
    /// # Returns
    /// Target credential after the change
    ///
    /// # Errors
    /// * `NotFound` - Target does not exist
    /// * `StoreUnavailable` - Storage operation failed
    async fn change_status(
        &self,
        admin_id: UserId,
        user_id: UserId,
        change: StatusChange,
        client: &ClientInfo,
    ) -> Result<Credential, AccountError>;

    /// Set a new password for another account without the current one.
    ///
    /// The audit entry is attributed to `admin_id`. Live sessions are kept.
    ///
    /// # Errors
    /// * `NotFound` - Target does not exist
    /// * `Hashing` - Password hashing failed
    /// * `StoreUnavailable` - Storage operation failed
    async fn admin_reset_password(
        &self,
        admin_id: UserId,
        user_id: UserId,
        new_password: Password,
        client: &ClientInfo,
    ) -> Result<(), AccountError>;
}

/// Persistence operations for credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Insert a credential.
    ///
    /// # Errors
    /// * `UsernameTaken` - Username is already taken
    /// * `EmailTaken` - Email is already registered
    /// * `Unavailable` - Storage operation failed
    async fn create(&self, credential: NewCredential) -> Result<Credential, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<Credential>, StoreError>;

    /// Retrieve a credential whose username or email equals `identifier`.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Atomically increment the failed-attempt counter.
    ///
    /// When the incremented counter reaches `lock_threshold`, `locked_until`
    /// is set to `lock_until` in the same write. Concurrent failures must
    /// each observe a distinct count.
    ///
    /// # Returns
    /// Counter and lock state after the increment
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn record_failed_attempt(
        &self,
        id: UserId,
        lock_threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StoreError>;

    /// Clear the failed-attempt counter and any lock.
    async fn reset_attempts(&self, id: UserId) -> Result<(), StoreError>;

    async fn update_last_login(&self, id: UserId, ip: Option<String>) -> Result<(), StoreError>;

    async fn update_password_hash(&self, id: UserId, password_hash: String) -> Result<(), StoreError>;

    /// # Returns
    /// `true` if the account exists
    async fn set_banned(&self, id: UserId, banned: bool) -> Result<bool, StoreError>;

    /// # Returns
    /// `true` if the account exists
    async fn set_active(&self, id: UserId, active: bool) -> Result<bool, StoreError>;
}
