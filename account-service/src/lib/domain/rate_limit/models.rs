use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::account::models::UserId;

/// Bucket a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub ip_address: String,
    pub user_id: Option<UserId>,
    pub endpoint: String,
}

/// Maximum requests per sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RatePolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn login() -> Self {
        Self::new(5, Duration::minutes(15))
    }

    pub fn register() -> Self {
        Self::new(10, Duration::minutes(60))
    }
}

/// One counted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub key: RateKey,
    pub method: String,
    pub status_code: u16,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    Limited {
        limit: u32,
        retry_after_secs: i64,
    },
}
