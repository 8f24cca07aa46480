use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::domain::account::errors::AccountError;
use crate::domain::account::errors::UserIdError;
use crate::domain::account::models::Credential;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::SessionGrant;
use crate::domain::errors::StoreError;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;

pub mod admin;
pub mod availability;
pub mod change_password;
pub mod login;
pub mod logout;
pub mod profile;
pub mod refresh;
pub mod register;
pub mod sessions;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    ServiceUnavailable(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound {
        message: String,
        code: &'static str,
    },
    Conflict(String),
    Unauthorized {
        message: String,
        code: &'static str,
        attempts: Option<u32>,
        locked: Option<bool>,
    },
    Forbidden(String),
    TooManyRequests {
        message: String,
        retry_after: i64,
    },
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>, code: &'static str) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
            code,
            attempts: None,
            locked: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
            code: "NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody::new("Internal server error", "INTERNAL_ERROR"),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(error = %msg, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ApiErrorBody::new("Service temporarily unavailable", "STORE_UNAVAILABLE"),
                )
            }
            ApiError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiErrorBody::new(msg, "VALIDATION_FAILED"),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiErrorBody::new(msg, "BAD_REQUEST")),
            ApiError::NotFound { message, code } => (StatusCode::NOT_FOUND, ApiErrorBody::new(message, code)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ApiErrorBody::new(msg, "CONFLICT")),
            ApiError::Unauthorized {
                message,
                code,
                attempts,
                locked,
            } => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    attempts,
                    locked,
                    ..ApiErrorBody::new(message, code)
                },
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiErrorBody::new(msg, "FORBIDDEN")),
            ApiError::TooManyRequests {
                message,
                retry_after,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                ApiErrorBody {
                    retry_after: Some(retry_after),
                    ..ApiErrorBody::new(message, "RATE_LIMITED")
                },
            ),
        };

        (status, Json(body.with_status(status))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials { attempts, locked } => ApiError::Unauthorized {
                message: err.to_string(),
                code: "INVALID_CREDENTIALS",
                attempts,
                locked: attempts.map(|_| locked),
            },
            AuthError::AccountLocked { attempts } => ApiError::Unauthorized {
                message: err.to_string(),
                code: "ACCOUNT_LOCKED",
                attempts: Some(attempts),
                locked: Some(true),
            },
            AuthError::AccountBanned => ApiError::unauthorized(err.to_string(), "ACCOUNT_BANNED"),
            AuthError::AccountDeactivated => {
                ApiError::unauthorized(err.to_string(), "ACCOUNT_DEACTIVATED")
            }
            AuthError::InvalidRefreshToken => {
                ApiError::unauthorized(err.to_string(), "INVALID_REFRESH_TOKEN")
            }
            AuthError::SessionExpiredOrInvalid => {
                ApiError::unauthorized(err.to_string(), "SESSION_INVALID")
            }
            AuthError::AccountInactiveOrBanned => {
                ApiError::unauthorized(err.to_string(), "ACCOUNT_INACTIVE_OR_BANNED")
            }
            AuthError::Unauthorized => ApiError::unauthorized(err.to_string(), "UNAUTHORIZED"),
            AuthError::SessionNotFound => ApiError::NotFound {
                message: err.to_string(),
                code: "SESSION_NOT_FOUND",
            },
            AuthError::StoreUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            AuthError::Internal(msg) => ApiError::InternalServerError(msg),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(_) => ApiError::not_found(err.to_string()),
            AccountError::UsernameAlreadyExists(_) | AccountError::EmailAlreadyExists(_) => {
                ApiError::Conflict(err.to_string())
            }
            AccountError::IncorrectPassword => ApiError::BadRequest(err.to_string()),
            AccountError::InvalidUsername(_)
            | AccountError::InvalidEmail(_)
            | AccountError::InvalidPassword(_)
            | AccountError::InvalidFullName(_) => ApiError::UnprocessableEntity(err.to_string()),
            AccountError::StoreUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            AccountError::Hashing(msg) => ApiError::InternalServerError(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
            other => ApiError::InternalServerError(other.to_string()),
        }
    }
}

impl From<UserIdError> for ApiError {
    fn from(err: UserIdError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    success: bool,
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            success: true,
            status_code: status_code.as_u16(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    success: bool,
    status_code: u16,
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<i64>,
}

impl ApiErrorBody {
    fn new(error: impl Into<String>, code: &'static str) -> Self {
        Self {
            success: false,
            status_code: 0,
            error: error.into(),
            code,
            attempts: None,
            locked: None,
            retry_after: None,
        }
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        self.status_code = status.as_u16();
        self
    }
}

/// Confirmation with no payload beyond a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub message: String,
}

impl MessageData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public view of a credential; never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&Credential> for UserData {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id.0,
            username: credential.username.as_str().to_string(),
            email: credential.email.as_str().to_string(),
            full_name: credential.full_name.clone(),
            role: credential.role.as_str().to_string(),
            created_at: credential.created_at,
            last_login_at: credential.last_login_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl From<auth::TokenPair> for TokenData {
    fn from(pair: auth::TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            expires_in: pair.expires_in,
        }
    }
}

/// Response for login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionGrantData {
    pub user: UserData,
    pub tokens: TokenData,
    pub session_id: String,
}

impl From<SessionGrant> for SessionGrantData {
    fn from(grant: SessionGrant) -> Self {
        Self {
            user: (&grant.credential).into(),
            session_id: grant.session.id.as_str().to_string(),
            tokens: grant.tokens.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub session_id: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_current: bool,
}

impl SessionData {
    pub fn new(session: Session, current: Option<&SessionId>) -> Self {
        Self {
            is_current: current == Some(&session.id),
            session_id: session.id.as_str().to_string(),
            device_info: session.device_info,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            created_at: session.created_at,
            last_activity_at: session.last_activity_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevokedData {
    pub revoked: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_login_maps_to_401_with_attempts() {
        let err: ApiError = AuthError::InvalidCredentials {
            attempts: Some(5),
            locked: true,
        }
        .into();

        assert_eq!(
            err,
            ApiError::Unauthorized {
                message: "Invalid credentials".to_string(),
                code: "INVALID_CREDENTIALS",
                attempts: Some(5),
                locked: Some(true),
            }
        );
    }

    #[test]
    fn test_unknown_identifier_omits_attempts() {
        let err: ApiError = AuthError::InvalidCredentials {
            attempts: None,
            locked: false,
        }
        .into();

        assert!(matches!(
            err,
            ApiError::Unauthorized {
                attempts: None,
                locked: None,
                ..
            }
        ));
    }

    #[test]
    fn test_store_failure_maps_to_503() {
        let response = ApiError::from(AuthError::StoreUnavailable("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = ApiError::from(AccountError::StoreUnavailable("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_session_not_found_maps_to_404() {
        assert_eq!(
            ApiError::from(AuthError::SessionNotFound),
            ApiError::NotFound {
                message: "Session not found".to_string(),
                code: "SESSION_NOT_FOUND",
            }
        );
    }

    #[test]
    fn test_error_body_shape() {
        let body = ApiErrorBody {
            attempts: Some(2),
            locked: Some(false),
            ..ApiErrorBody::new("Invalid credentials", "INVALID_CREDENTIALS")
        }
        .with_status(StatusCode::UNAUTHORIZED);

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "success": false,
                "status_code": 401,
                "error": "Invalid credentials",
                "code": "INVALID_CREDENTIALS",
                "attempts": 2,
                "locked": false,
            })
        );
    }
}
