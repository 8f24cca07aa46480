use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use chrono::Utc;

use crate::domain::errors::StoreError;
use crate::domain::rate_limit::models::RateDecision;
use crate::domain::rate_limit::models::RateKey;
use crate::domain::rate_limit::models::RatePolicy;
use crate::domain::rate_limit::models::RequestRecord;
use crate::domain::rate_limit::ports::RateGuardPort;
use crate::domain::rate_limit::ports::RateLimitLog;

/// Sliding-window request counter that fails open.
pub struct RateGuard<RL>
where
    RL: RateLimitLog,
{
    log: Arc<RL>,
}

impl<RL> RateGuard<RL>
where
    RL: RateLimitLog,
{
    pub fn new(log: Arc<RL>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl<RL> RateGuardPort for RateGuard<RL>
where
    RL: RateLimitLog,
{
    async fn check(&self, key: &RateKey, policy: RatePolicy) -> RateDecision {
        let now = Utc::now();
        let reset_at = now + policy.window;

        let count = match self.log.count(key, now - policy.window).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(endpoint = %key.endpoint, error = %e, "Rate limit check failed, allowing request");
                return RateDecision::Allowed {
                    limit: policy.max_requests,
                    remaining: policy.max_requests,
                    reset_at,
                };
            }
        };

        if count >= policy.max_requests {
            tracing::warn!(endpoint = %key.endpoint, count, "Rate limit exceeded");
            RateDecision::Limited {
                limit: policy.max_requests,
                retry_after_secs: policy.window.num_seconds(),
            }
        } else {
            RateDecision::Allowed {
                limit: policy.max_requests,
                remaining: policy.max_requests - count - 1,
                reset_at,
            }
        }
    }

    async fn record(&self, record: RequestRecord) {
        if let Err(e) = self.log.record(record).await {
            tracing::warn!(error = %e, "Failed to record rate limit entry");
        }
    }

    async fn prune(&self, retention: Duration) -> Result<u64, StoreError> {
        let deleted = self.log.delete_older_than(Utc::now() - retention).await?;
        tracing::info!(deleted, retention_days = retention.num_days(), "Old rate limit records removed");
        Ok(deleted)
    }
}
