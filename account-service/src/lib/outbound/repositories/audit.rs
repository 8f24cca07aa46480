use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use super::unavailable;
use crate::domain::account::models::UserId;
use crate::domain::audit::models::AuditAction;
use crate::domain::audit::models::AuditEntry;
use crate::domain::audit::models::AuditFilter;
use crate::domain::audit::models::AuditPage;
use crate::domain::audit::models::AuditRecord;
use crate::domain::audit::models::Page;
use crate::domain::audit::ports::AuditLog;
use crate::domain::errors::StoreError;

// Every predicate is disabled by binding NULL, so one statement serves all filters.
const FILTER_CLAUSE: &str = r#"
    WHERE ($1::BIGINT IS NULL OR user_id = $1)
      AND ($2::TEXT IS NULL OR action = $2)
      AND ($3::TEXT IS NULL OR entity_type = $3)
      AND ($4::TEXT IS NULL OR entity_id = $4)
      AND ($5::TEXT IS NULL OR ip_address = $5)
      AND ($6::TIMESTAMPTZ IS NULL OR created_at >= $6)
      AND ($7::TIMESTAMPTZ IS NULL OR created_at <= $7)
"#;

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    user_id: Option<i64>,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = StoreError;

    fn try_from(r: AuditRow) -> Result<Self, Self::Error> {
        let action = r
            .action
            .parse::<AuditAction>()
            .map_err(|e| StoreError::CorruptRecord(format!("audit entry {}: {}", r.id, e)))?;

        Ok(AuditRecord {
            id: r.id,
            entry: AuditEntry {
                actor: r.user_id.map(UserId),
                action,
                entity_type: r.entity_type,
                entity_id: r.entity_id,
                ip_address: r.ip_address,
                user_agent: r.user_agent,
                created_at: r.created_at,
            },
        })
    }
}

pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, action, entity_type, entity_id, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.actor.map(|id| id.0))
        .bind(entry.action.as_str())
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.ip_address)
        .bind(entry.user_agent)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn list(&self, filter: &AuditFilter, page: Page) -> Result<AuditPage, StoreError> {
        let count_query = format!("SELECT COUNT(*) FROM audit_logs {}", FILTER_CLAUSE);
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(filter.actor.map(|id| id.0))
            .bind(filter.action.map(|action| action.as_str()))
            .bind(filter.entity_type.as_deref())
            .bind(filter.entity_id.as_deref())
            .bind(filter.ip_address.as_deref())
            .bind(filter.from)
            .bind(filter.until)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;

        let select_query = format!(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, ip_address, user_agent, created_at
            FROM audit_logs
            {}
            ORDER BY created_at DESC, id DESC
            LIMIT $8 OFFSET $9
            "#,
            FILTER_CLAUSE
        );
        let rows = sqlx::query_as::<_, AuditRow>(&select_query)
            .bind(filter.actor.map(|id| id.0))
            .bind(filter.action.map(|action| action.as_str()))
            .bind(filter.entity_type.as_deref())
            .bind(filter.entity_id.as_deref())
            .bind(filter.ip_address.as_deref())
            .bind(filter.from)
            .bind(filter.until)
            .bind(i64::from(page.limit()))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(AuditPage {
            records: rows
                .into_iter()
                .map(AuditRecord::try_from)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or(0),
            page,
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected())
    }
}
