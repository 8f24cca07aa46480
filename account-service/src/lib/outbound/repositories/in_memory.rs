//! Process-local implementations of every store port.
//!
//! Used by the test suites and for running the service without Postgres.
//! Each store keeps its rows behind one `Mutex`, so every port operation is
//! atomic with respect to the others on the same store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::account::models::AttemptOutcome;
use crate::domain::account::models::Credential;
use crate::domain::account::models::NewCredential;
use crate::domain::account::models::UserId;
use crate::domain::account::ports::CredentialStore;
use crate::domain::audit::models::AuditEntry;
use crate::domain::audit::models::AuditFilter;
use crate::domain::audit::models::AuditPage;
use crate::domain::audit::models::AuditRecord;
use crate::domain::audit::models::Page;
use crate::domain::audit::ports::AuditLog;
use crate::domain::errors::StoreError;
use crate::domain::rate_limit::models::RateKey;
use crate::domain::rate_limit::models::RequestRecord;
use crate::domain::rate_limit::ports::RateLimitLog;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::domain::session::ports::SessionStore;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory store poisoned".to_string()))
}

#[derive(Default)]
struct CredentialTable {
    next_id: i64,
    rows: HashMap<UserId, Credential>,
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    table: Mutex<CredentialTable>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to a stored credential.
    ///
    /// # Returns
    /// `false` if no credential has this id
    pub fn modify(&self, id: UserId, f: impl FnOnce(&mut Credential)) -> bool {
        let Ok(mut table) = lock(&self.table) else {
            return false;
        };
        match table.rows.get_mut(&id) {
            Some(credential) => {
                f(credential);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(&self, credential: NewCredential) -> Result<Credential, StoreError> {
        let mut table = lock(&self.table)?;

        if table
            .rows
            .values()
            .any(|c| c.username == credential.username)
        {
            return Err(StoreError::UsernameTaken(credential.username.to_string()));
        }
        if table.rows.values().any(|c| c.email == credential.email) {
            return Err(StoreError::EmailTaken(credential.email.to_string()));
        }

        table.next_id += 1;
        let created = Credential {
            id: UserId(table.next_id),
            username: credential.username,
            email: credential.email,
            full_name: credential.full_name,
            password_hash: credential.password_hash,
            role: credential.role,
            is_active: true,
            is_banned: false,
            login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: Utc::now(),
        };
        table.rows.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Credential>, StoreError> {
        Ok(lock(&self.table)?.rows.get(&id).cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, StoreError> {
        Ok(lock(&self.table)?
            .rows
            .values()
            .find(|c| c.username.as_str() == identifier || c.email.as_str() == identifier)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.table)?
            .rows
            .values()
            .any(|c| c.username.as_str() == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.table)?
            .rows
            .values()
            .any(|c| c.email.as_str() == email))
    }

    async fn record_failed_attempt(
        &self,
        id: UserId,
        lock_threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StoreError> {
        let mut table = lock(&self.table)?;
        let credential = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::CorruptRecord(format!("user {} disappeared", id)))?;

        credential.login_attempts = credential.login_attempts.saturating_add(1);
        if credential.login_attempts >= lock_threshold {
            credential.locked_until = Some(lock_until);
        }

        Ok(AttemptOutcome {
            attempts: credential.login_attempts,
            locked_until: credential.locked_until,
        })
    }

    async fn reset_attempts(&self, id: UserId) -> Result<(), StoreError> {
        if let Some(credential) = lock(&self.table)?.rows.get_mut(&id) {
            credential.login_attempts = 0;
            credential.locked_until = None;
        }
        Ok(())
    }

    async fn update_last_login(&self, id: UserId, _ip: Option<String>) -> Result<(), StoreError> {
        if let Some(credential) = lock(&self.table)?.rows.get_mut(&id) {
            credential.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_password_hash(&self, id: UserId, password_hash: String) -> Result<(), StoreError> {
        if let Some(credential) = lock(&self.table)?.rows.get_mut(&id) {
            credential.password_hash = password_hash;
        }
        Ok(())
    }

    async fn set_banned(&self, id: UserId, banned: bool) -> Result<bool, StoreError> {
        Ok(self.modify(id, |c| c.is_banned = banned))
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<bool, StoreError> {
        Ok(self.modify(id, |c| c.is_active = active))
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    rows: Mutex<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored row regardless of liveness.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        lock(&self.rows).ok()?.get(id).cloned()
    }

    pub fn modify(&self, id: &SessionId, f: impl FnOnce(&mut Session)) -> bool {
        let Ok(mut rows) = lock(&self.rows) else {
            return false;
        };
        match rows.get_mut(id) {
            Some(session) => {
                f(session);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: NewSession) -> Result<Session, StoreError> {
        let now = Utc::now();
        let created = Session {
            id: session.id,
            user_id: session.user_id,
            device_info: session.device_info,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            is_revoked: false,
            expires_at: session.expires_at,
            last_activity_at: now,
            created_at: now,
        };
        lock(&self.rows)?.insert(created.id.clone(), created.clone());

        Ok(created)
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let now = Utc::now();
        Ok(lock(&self.rows)?
            .get(id)
            .filter(|s| s.is_live(now))
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = lock(&self.rows)?
            .values()
            .filter(|s| s.user_id == user_id && s.is_live(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));

        Ok(sessions)
    }

    async fn touch(&self, id: &SessionId) -> Result<(), StoreError> {
        if let Some(session) = lock(&self.rows)?.get_mut(id) {
            session.last_activity_at = Utc::now();
        }
        Ok(())
    }

    async fn revoke(&self, id: &SessionId) -> Result<bool, StoreError> {
        match lock(&self.rows)?.get_mut(id) {
            Some(session) if !session.is_revoked => {
                session.is_revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        except: Option<SessionId>,
    ) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut revoked = 0;

        for session in lock(&self.rows)?.values_mut() {
            if session.user_id == user_id
                && session.is_live(now)
                && except.as_ref() != Some(&session.id)
            {
                session.is_revoked = true;
                revoked += 1;
            }
        }

        Ok(revoked)
    }

    async fn delete_stale(
        &self,
        now: DateTime<Utc>,
        revoked_retention: Duration,
    ) -> Result<u64, StoreError> {
        let cutoff = now - revoked_retention;
        let mut rows = lock(&self.rows)?;
        let before = rows.len();

        rows.retain(|_, s| !(s.expires_at < now || (s.is_revoked && s.last_activity_at < cutoff)));

        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
struct AuditTable {
    next_id: i64,
    rows: Vec<AuditRecord>,
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    table: Mutex<AuditTable>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        lock(&self.table)
            .map(|t| t.rows.iter().map(|r| r.entry.clone()).collect())
            .unwrap_or_default()
    }

    /// Apply `f` to every stored entry.
    pub fn modify_all(&self, mut f: impl FnMut(&mut AuditEntry)) {
        if let Ok(mut table) = lock(&self.table) {
            table.rows.iter_mut().for_each(|r| f(&mut r.entry));
        }
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let mut table = lock(&self.table)?;
        table.next_id += 1;
        let id = table.next_id;
        table.rows.push(AuditRecord { id, entry });
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter, page: Page) -> Result<AuditPage, StoreError> {
        let mut matching: Vec<AuditRecord> = lock(&self.table)?
            .rows
            .iter()
            .filter(|r| filter.matches(&r.entry))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.entry
                .created_at
                .cmp(&a.entry.created_at)
                .then(b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let records = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .collect();

        Ok(AuditPage {
            records,
            total,
            page,
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut table = lock(&self.table)?;
        let before = table.rows.len();
        table.rows.retain(|r| r.entry.created_at > cutoff);
        Ok((before - table.rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryRateLimitLog {
    records: Mutex<Vec<RequestRecord>>,
}

impl InMemoryRateLimitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to every stored record.
    pub fn modify_all(&self, mut f: impl FnMut(&mut RequestRecord)) {
        if let Ok(mut records) = lock(&self.records) {
            records.iter_mut().for_each(|r| f(r));
        }
    }
}

#[async_trait]
impl RateLimitLog for InMemoryRateLimitLog {
    async fn count(&self, key: &RateKey, window_start: DateTime<Utc>) -> Result<u32, StoreError> {
        let count = lock(&self.records)?
            .iter()
            .filter(|r| r.key == *key && r.created_at >= window_start)
            .count();

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record(&self, record: RequestRecord) -> Result<(), StoreError> {
        lock(&self.records)?.push(record);
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = lock(&self.records)?;
        let before = records.len();
        records.retain(|r| r.created_at > cutoff);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::account::models::EmailAddress;
    use crate::domain::account::models::Role;
    use crate::domain::account::models::Username;
    use crate::domain::audit::models::AuditAction;

    fn new_credential(username: &str, email: &str) -> NewCredential {
        NewCredential {
            username: Username::new(username.to_string()).unwrap(),
            email: EmailAddress::new(email.to_string()).unwrap(),
            full_name: "Test User".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let store = InMemoryCredentialStore::new();
        store
            .create(new_credential("alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(
            store
                .create(new_credential("alice", "other@example.com"))
                .await
                .unwrap_err(),
            StoreError::UsernameTaken("alice".to_string())
        );
        assert_eq!(
            store
                .create(new_credential("bob", "alice@example.com"))
                .await
                .unwrap_err(),
            StoreError::EmailTaken("alice@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_failures_get_distinct_counts() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let id = store
            .create(new_credential("alice", "alice@example.com"))
            .await
            .unwrap()
            .id;
        let lock_until = Utc::now() + Duration::minutes(30);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.record_failed_attempt(id, 5, lock_until).await })
            })
            .collect();

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap().unwrap().attempts);
        }
        counts.sort_unstable();

        assert_eq!(counts, (1..=10).collect::<Vec<u32>>());
        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.locked_until, Some(lock_until));
    }

    #[tokio::test]
    async fn test_revoke_all_spares_excepted_session() {
        let store = InMemorySessionStore::new();
        let expires_at = Utc::now() + Duration::hours(1);
        let keep = SessionId::from_string("keep");

        for id in ["keep", "drop-1", "drop-2"] {
            store
                .create(NewSession {
                    id: SessionId::from_string(id),
                    user_id: UserId(1),
                    device_info: None,
                    ip_address: None,
                    user_agent: None,
                    expires_at,
                })
                .await
                .unwrap();
        }

        assert_eq!(
            store
                .revoke_all_for_user(UserId(1), Some(keep.clone()))
                .await
                .unwrap(),
            2
        );
        assert!(store.find_by_id(&keep).await.unwrap().is_some());
        assert!(!store.revoke(&SessionId::from_string("drop-1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_stale_honours_retention() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();

        for id in ["recently-revoked", "long-revoked", "live"] {
            store
                .create(NewSession {
                    id: SessionId::from_string(id),
                    user_id: UserId(1),
                    device_info: None,
                    ip_address: None,
                    user_agent: None,
                    expires_at: now + Duration::days(30),
                })
                .await
                .unwrap();
        }
        store.modify(&SessionId::from_string("recently-revoked"), |s| {
            s.is_revoked = true;
        });
        store.modify(&SessionId::from_string("long-revoked"), |s| {
            s.is_revoked = true;
            s.last_activity_at = now - Duration::days(8);
        });

        assert_eq!(store.delete_stale(now, Duration::days(7)).await.unwrap(), 1);
        assert!(store.get(&SessionId::from_string("long-revoked")).is_none());
        assert!(store.get(&SessionId::from_string("recently-revoked")).is_some());
    }

    #[tokio::test]
    async fn test_audit_delete_older_than_is_inclusive() {
        let log = InMemoryAuditLog::new();
        let cutoff = Utc::now() - Duration::days(90);

        for age in [Duration::days(91), Duration::days(90), Duration::days(1)] {
            let mut entry = AuditEntry::new(AuditAction::UserLogin, "user");
            entry.created_at = cutoff + Duration::days(90) - age;
            log.record(entry).await.unwrap();
        }

        assert_eq!(log.delete_older_than(cutoff).await.unwrap(), 2);
        assert_eq!(log.entries().len(), 1);
    }
}
