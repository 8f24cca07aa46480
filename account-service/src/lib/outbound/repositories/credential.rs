use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use super::unavailable;
use crate::domain::account::models::AttemptOutcome;
use crate::domain::account::models::Credential;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::NewCredential;
use crate::domain::account::models::Role;
use crate::domain::account::models::UserId;
use crate::domain::account::models::Username;
use crate::domain::account::ports::CredentialStore;
use crate::domain::errors::StoreError;

const CREDENTIAL_COLUMNS: &str = "id, username, email, full_name, password_hash, role, \
     is_active, is_banned, login_attempts, locked_until, last_login_at, created_at";

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    role: String,
    is_active: bool,
    is_banned: bool,
    login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = StoreError;

    fn try_from(r: CredentialRow) -> Result<Self, Self::Error> {
        let id = r.id;
        let corrupt = |e: String| StoreError::CorruptRecord(format!("user {}: {}", id, e));

        Ok(Credential {
            id: UserId(id),
            username: Username::new(r.username).map_err(|e| corrupt(e.to_string()))?,
            email: EmailAddress::new(r.email).map_err(|e| corrupt(e.to_string()))?,
            full_name: r.full_name,
            password_hash: r.password_hash,
            role: r.role.parse::<Role>().map_err(|e| corrupt(e.to_string()))?,
            is_active: r.is_active,
            is_banned: r.is_banned,
            login_attempts: u32::try_from(r.login_attempts).unwrap_or(0),
            locked_until: r.locked_until,
            last_login_at: r.last_login_at,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
}

pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, column: &'static str, value: &str) -> Result<bool, StoreError> {
        let query = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {} = $1)", column);
        sqlx::query_scalar::<_, bool>(&query)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }

    async fn set_flag(&self, column: &'static str, id: UserId, value: bool) -> Result<bool, StoreError> {
        let query = format!(
            "UPDATE users SET {} = $2, updated_at = NOW() WHERE id = $1",
            column
        );
        let result = sqlx::query(&query)
            .bind(id.0)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn create(&self, credential: NewCredential) -> Result<Credential, StoreError> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, full_name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CREDENTIAL_COLUMNS
        );

        let row = sqlx::query_as::<_, CredentialRow>(&query)
            .bind(credential.username.as_str())
            .bind(credential.email.as_str())
            .bind(&credential.full_name)
            .bind(&credential.password_hash)
            .bind(credential.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        if db_err.constraint() == Some("users_username_key") {
                            return StoreError::UsernameTaken(credential.username.to_string());
                        }
                        if db_err.constraint() == Some("users_email_key") {
                            return StoreError::EmailTaken(credential.email.to_string());
                        }
                    }
                }
                unavailable(e)
            })?;

        row.try_into()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Credential>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", CREDENTIAL_COLUMNS);

        sqlx::query_as::<_, CredentialRow>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?
            .map(Credential::try_from)
            .transpose()
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, StoreError> {
        let query = format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1 LIMIT 1",
            CREDENTIAL_COLUMNS
        );

        sqlx::query_as::<_, CredentialRow>(&query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?
            .map(Credential::try_from)
            .transpose()
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        self.exists("username", username).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        self.exists("email", email).await
    }

    async fn record_failed_attempt(
        &self,
        id: UserId,
        lock_threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StoreError> {
        // SET expressions see the pre-update row, so increment and lock
        // decision come from the same value
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            UPDATE users
            SET login_attempts = login_attempts + 1,
                locked_until = CASE
                    WHEN login_attempts + 1 >= $2 THEN $3
                    ELSE locked_until
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING login_attempts, locked_until
            "#,
        )
        .bind(id.0)
        .bind(i32::try_from(lock_threshold).unwrap_or(i32::MAX))
        .bind(lock_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| StoreError::CorruptRecord(format!("user {} disappeared", id)))?;

        Ok(AttemptOutcome {
            attempts: u32::try_from(row.login_attempts).unwrap_or(0),
            locked_until: row.locked_until,
        })
    }

    async fn reset_attempts(&self, id: UserId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET login_attempts = 0, locked_until = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn update_last_login(&self, id: UserId, ip: Option<String>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW(), last_login_ip = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(ip)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn update_password_hash(&self, id: UserId, password_hash: String) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.0)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    async fn set_banned(&self, id: UserId, banned: bool) -> Result<bool, StoreError> {
        self.set_flag("is_banned", id, banned).await
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<bool, StoreError> {
        self.set_flag("is_active", id, active).await
    }
}
