use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::audit::models::AuditEntry;
use crate::domain::audit::models::AuditFilter;
use crate::domain::audit::models::AuditPage;
use crate::domain::audit::models::Page;
use crate::domain::errors::StoreError;

/// Port for reading and pruning the audit trail.
#[async_trait]
pub trait AuditServicePort: Send + Sync + 'static {
    /// Matching entries, newest first.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    /// * `CorruptRecord` - A stored row could not be decoded
    async fn list(&self, filter: AuditFilter, page: Page) -> Result<AuditPage, StoreError>;

    /// Delete entries older than `retention`.
    ///
    /// # Returns
    /// Number of entries deleted
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn prune(&self, retention: Duration) -> Result<u64, StoreError>;
}

/// Append-only sink for security events.
#[async_trait]
pub trait AuditLog: Send + Sync + 'static {
    /// Persist one audit entry.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Entries matching `filter`, newest first, sliced by `page`.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    /// * `CorruptRecord` - A stored row could not be decoded
    async fn list(&self, filter: &AuditFilter, page: Page) -> Result<AuditPage, StoreError>;

    /// Delete entries created at or before `cutoff`.
    ///
    /// # Errors
    /// * `Unavailable` - Storage operation failed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
