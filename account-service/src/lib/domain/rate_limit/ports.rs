use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::errors::StoreError;
use crate::domain::rate_limit::models::RateDecision;
use crate::domain::rate_limit::models::RateKey;
use crate::domain::rate_limit::models::RatePolicy;
use crate::domain::rate_limit::models::RequestRecord;

/// Port for request admission.
#[async_trait]
pub trait RateGuardPort: Send + Sync + 'static {
    /// Decide whether a request under `key` may proceed. Never fails.
    async fn check(&self, key: &RateKey, policy: RatePolicy) -> RateDecision;

    /// Count a request. Failures are logged, never returned.
    async fn record(&self, record: RequestRecord);

    /// Delete counted requests older than `retention`.
    ///
    /// # Returns
    /// Number of records deleted
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn prune(&self, retention: Duration) -> Result<u64, StoreError>;
}

/// Persistence of counted requests.
#[async_trait]
pub trait RateLimitLog: Send + Sync + 'static {
    /// Requests recorded under `key` at or after `window_start`.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn count(&self, key: &RateKey, window_start: DateTime<Utc>) -> Result<u32, StoreError>;

    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn record(&self, record: RequestRecord) -> Result<(), StoreError>;

    /// Delete records created at or before `cutoff`.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
