use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use sqlx::PgPool;

use super::unavailable;
use crate::domain::account::models::UserId;
use crate::domain::errors::StoreError;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::domain::session::ports::SessionStore;

const SESSION_COLUMNS: &str = "id, user_id, device_info, ip_address, user_agent, is_revoked, \
     expires_at, last_activity_at, created_at";

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: i64,
    device_info: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    is_revoked: bool,
    expires_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(r: SessionRow) -> Self {
        Session {
            id: SessionId::from_string(r.id),
            user_id: UserId(r.user_id),
            device_info: r.device_info,
            ip_address: r.ip_address,
            user_agent: r.user_agent,
            is_revoked: r.is_revoked,
            expires_at: r.expires_at,
            last_activity_at: r.last_activity_at,
            created_at: r.created_at,
        }
    }
}

pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, session: NewSession) -> Result<Session, StoreError> {
        let query = format!(
            r#"
            INSERT INTO sessions (id, user_id, device_info, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(session.id.as_str())
            .bind(session.user_id.0)
            .bind(session.device_info)
            .bind(session.ip_address)
            .bind(session.user_agent)
            .bind(session.expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM sessions
            WHERE id = $1 AND is_revoked = FALSE AND expires_at > NOW()
            "#,
            SESSION_COLUMNS
        );

        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(row.map(Session::from))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM sessions
            WHERE user_id = $1 AND is_revoked = FALSE AND expires_at > NOW()
            ORDER BY last_activity_at DESC
            "#,
            SESSION_COLUMNS
        );

        let rows = sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(rows.into_iter().map(Session::from).collect())
    }

    async fn touch(&self, id: &SessionId) -> Result<(), StoreError> {
        sqlx::query("UPDATE sessions SET last_activity_at = NOW() WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    async fn revoke(&self, id: &SessionId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE sessions SET is_revoked = TRUE WHERE id = $1 AND is_revoked = FALSE",
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        except: Option<SessionId>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_revoked = TRUE
            WHERE user_id = $1
              AND is_revoked = FALSE
              AND expires_at > NOW()
              AND ($2::TEXT IS NULL OR id <> $2)
            "#,
        )
        .bind(user_id.0)
        .bind(except.as_ref().map(SessionId::as_str))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected())
    }

    async fn delete_stale(
        &self,
        now: DateTime<Utc>,
        revoked_retention: Duration,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < $1
               OR (is_revoked = TRUE AND last_activity_at < $2)
            "#,
        )
        .bind(now)
        .bind(now - revoked_retention)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected())
    }
}
