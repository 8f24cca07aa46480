use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use chrono::Utc;

use crate::domain::audit::models::AuditFilter;
use crate::domain::audit::models::AuditPage;
use crate::domain::audit::models::Page;
use crate::domain::audit::ports::AuditLog;
use crate::domain::audit::ports::AuditServicePort;
use crate::domain::errors::StoreError;

/// Read and retention side of the audit log.
pub struct AuditService<AL>
where
    AL: AuditLog,
{
    audit_log: Arc<AL>,
}

impl<AL> AuditService<AL>
where
    AL: AuditLog,
{
    pub fn new(audit_log: Arc<AL>) -> Self {
        Self { audit_log }
    }
}

#[async_trait]
impl<AL> AuditServicePort for AuditService<AL>
where
    AL: AuditLog,
{
    async fn list(&self, filter: AuditFilter, page: Page) -> Result<AuditPage, StoreError> {
        self.audit_log.list(&filter, page).await
    }

    async fn prune(&self, retention: Duration) -> Result<u64, StoreError> {
        let deleted = self
            .audit_log
            .delete_older_than(Utc::now() - retention)
            .await?;
        tracing::info!(deleted, retention_days = retention.num_days(), "Old audit entries removed");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use mockall::mock;

    use super::*;
    use crate::domain::account::models::UserId;
    use crate::domain::audit::models::AuditAction;
    use crate::domain::audit::models::AuditEntry;
    use crate::outbound::repositories::in_memory::InMemoryAuditLog;

    mock! {
        pub TestAuditLog {}

        #[async_trait]
        impl AuditLog for TestAuditLog {
            async fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;
            async fn list(&self, filter: &AuditFilter, page: Page) -> Result<AuditPage, StoreError>;
            async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
        }
    }

    #[tokio::test]
    async fn test_prune_cuts_at_retention() {
        let mut audit_log = MockTestAuditLog::new();
        let expected = Utc::now() - Duration::days(90);

        audit_log
            .expect_delete_older_than()
            .withf(move |cutoff| (*cutoff - expected).num_seconds().abs() < 5)
            .times(1)
            .returning(|_| Ok(4));

        let service = AuditService::new(Arc::new(audit_log));
        assert_eq!(service.prune(Duration::days(90)).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_prune_propagates_store_failure() {
        let mut audit_log = MockTestAuditLog::new();
        audit_log
            .expect_delete_older_than()
            .returning(|_| Err(StoreError::Unavailable("down".to_string())));

        let service = AuditService::new(Arc::new(audit_log));
        assert!(matches!(
            service.prune(Duration::days(90)).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_pages_newest_first() {
        let audit_log = Arc::new(InMemoryAuditLog::new());
        let start = Utc::now() - Duration::minutes(10);

        for minute in 0..5 {
            let mut entry = AuditEntry::new(AuditAction::UserLogin, "user").actor(UserId(1));
            entry.created_at = start + Duration::minutes(minute);
            audit_log.record(entry).await.unwrap();
        }
        audit_log
            .record(AuditEntry::new(AuditAction::UserLogin, "user").actor(UserId(2)))
            .await
            .unwrap();

        let service = AuditService::new(Arc::clone(&audit_log));
        let filter = AuditFilter {
            actor: Some(UserId(1)),
            ..AuditFilter::default()
        };

        let first = service.list(filter.clone(), Page::new(1, 2)).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages(), 3);
        assert_eq!(first.records.len(), 2);
        assert_eq!(first.records[0].entry.created_at, start + Duration::minutes(4));
        assert!(first.records[0].id > first.records[1].id);

        let last = service.list(filter, Page::new(3, 2)).await.unwrap();
        assert_eq!(last.records.len(), 1);
        assert_eq!(last.records[0].entry.created_at, start);
    }
}
