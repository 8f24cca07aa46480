use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use super::unavailable;
use crate::domain::errors::StoreError;
use crate::domain::rate_limit::models::RateKey;
use crate::domain::rate_limit::models::RequestRecord;
use crate::domain::rate_limit::ports::RateLimitLog;

pub struct PostgresRateLimitLog {
    pool: PgPool,
}

impl PostgresRateLimitLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitLog for PostgresRateLimitLog {
    async fn count(&self, key: &RateKey, window_start: DateTime<Utc>) -> Result<u32, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM rate_limit_logs
            WHERE ip_address = $1
              AND endpoint = $2
              AND user_id IS NOT DISTINCT FROM $3
              AND created_at >= $4
            "#,
        )
        .bind(&key.ip_address)
        .bind(&key.endpoint)
        .bind(key.user_id.map(|id| id.0))
        .bind(window_start)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record(&self, record: RequestRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO rate_limit_logs (ip_address, user_id, endpoint, method, status_code, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.key.ip_address)
        .bind(record.key.user_id.map(|id| id.0))
        .bind(record.key.endpoint)
        .bind(record.method)
        .bind(i32::from(record.status_code))
        .bind(record.user_agent)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM rate_limit_logs WHERE created_at <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected())
    }
}
