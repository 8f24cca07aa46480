pub mod audit;
pub mod credential;
pub mod in_memory;
pub mod rate_limit;
pub mod session;

use crate::domain::errors::StoreError;

pub use audit::PostgresAuditLog;
pub use credential::PostgresCredentialStore;
pub use rate_limit::PostgresRateLimitLog;
pub use session::PostgresSessionStore;

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}
