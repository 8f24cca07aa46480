use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;

use crate::domain::account::models::UserId;

/// Origin of a request, as seen by the HTTP edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }
}

/// Security-relevant actions recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    PasswordChange,
    SessionRevoked,
    AllSessionsRevoked,
    UserBanned,
    UserUnbanned,
    UserDeactivated,
    UserReactivated,
    PasswordReset,
}

impl AuditAction {
    pub const ALL: [AuditAction; 10] = [
        AuditAction::UserRegister,
        AuditAction::UserLogin,
        AuditAction::PasswordChange,
        AuditAction::SessionRevoked,
        AuditAction::AllSessionsRevoked,
        AuditAction::UserBanned,
        AuditAction::UserUnbanned,
        AuditAction::UserDeactivated,
        AuditAction::UserReactivated,
        AuditAction::PasswordReset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegister => "USER_REGISTER",
            AuditAction::UserLogin => "USER_LOGIN",
            AuditAction::PasswordChange => "PASSWORD_CHANGE",
            AuditAction::SessionRevoked => "SESSION_REVOKED",
            AuditAction::AllSessionsRevoked => "ALL_SESSIONS_REVOKED",
            AuditAction::UserBanned => "USER_BANNED",
            AuditAction::UserUnbanned => "USER_UNBANNED",
            AuditAction::UserDeactivated => "USER_DEACTIVATED",
            AuditAction::UserReactivated => "USER_REACTIVATED",
            AuditAction::PasswordReset => "PASSWORD_RESET",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown audit action: {0}")]
pub struct UnknownAuditAction(pub String);

impl FromStr for AuditAction {
    type Err = UnknownAuditAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAuditAction(s.to_string()))
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record.
///
/// Entries carry identifiers and request origin only. Secrets, password
/// hashes and full session tokens never reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub actor: Option<UserId>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, entity_type: impl Into<String>) -> Self {
        Self {
            actor: None,
            action,
            entity_type: entity_type.into(),
            entity_id: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    pub fn actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn entity(mut self, entity_id: impl ToString) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn client(mut self, client: &ClientInfo) -> Self {
        self.ip_address = client.ip.clone();
        self.user_agent = client.user_agent.clone();
        self
    }
}

/// Stored audit entry with its sequence id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub id: i64,
    pub entry: AuditEntry,
}

/// Conjunctive filter over audit entries. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub actor: Option<UserId>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub ip_address: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.actor.map_or(true, |actor| entry.actor == Some(actor))
            && self.action.map_or(true, |action| entry.action == action)
            && self
                .entity_type
                .as_ref()
                .map_or(true, |t| entry.entity_type == *t)
            && self
                .entity_id
                .as_ref()
                .map_or(true, |id| entry.entity_id.as_ref() == Some(id))
            && self
                .ip_address
                .as_ref()
                .map_or(true, |ip| entry.ip_address.as_ref() == Some(ip))
            && self.from.map_or(true, |from| entry.created_at >= from)
            && self.until.map_or(true, |until| entry.created_at <= until)
    }
}

/// One-based page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u32,
    limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 100;

    /// Out-of-range values are clamped: page to at least 1, limit to 1..=100.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_LIMIT)
    }
}

/// Newest-first slice of matching records plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPage {
    pub records: Vec<AuditRecord>,
    pub total: u64,
    pub page: Page,
}

impl AuditPage {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page.limit()))
    }
}
