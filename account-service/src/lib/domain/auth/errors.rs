use thiserror::Error;

use crate::domain::errors::StoreError;

/// Outcome of a rejected authentication operation.
///
/// Every variant is an expected result; none of them indicates a bug.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identifier or wrong password.
    ///
    /// `attempts` is only present when a known credential's counter moved.
    #[error("Invalid credentials")]
    InvalidCredentials { attempts: Option<u32>, locked: bool },

    #[error("Account is temporarily locked")]
    AccountLocked { attempts: u32 },

    #[error("Account is banned")]
    AccountBanned,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Session expired or invalid")]
    SessionExpiredOrInvalid,

    #[error("Account is inactive or banned")]
    AccountInactiveOrBanned,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}

impl From<auth::JwtError> for AuthError {
    fn from(err: auth::JwtError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<auth::PasswordError> for AuthError {
    fn from(err: auth::PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<auth::SessionTokenError> for AuthError {
    fn from(err: auth::SessionTokenError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
