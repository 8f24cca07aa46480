use thiserror::Error;

/// Failure reported by any persistence adapter.
///
/// Domain services never retry on these; they propagate to the caller,
/// which owns retry and backoff policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    #[error("Email already exists: {0}")]
    EmailTaken(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}
