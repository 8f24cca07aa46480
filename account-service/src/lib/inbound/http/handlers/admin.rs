use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use super::RevokedData;
use super::SessionData;
use super::UserData;
use crate::domain::account::errors::AccountError;
use crate::domain::account::models::Password;
use crate::domain::account::models::StatusChange;
use crate::domain::account::models::UserId;
use crate::domain::audit::models::AuditAction;
use crate::domain::audit::models::AuditFilter;
use crate::domain::audit::models::AuditPage;
use crate::domain::audit::models::AuditRecord;
use crate::domain::audit::models::Page;
use crate::domain::auth::models::Identity;
use crate::domain::session::models::SessionId;
use crate::inbound::http::client::ClientMeta;
use crate::inbound::http::router::AppState;

pub async fn list_user_sessions(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<Vec<SessionData>>, ApiError> {
    let user_id = UserId::from_string(&user_id)?;
    let sessions = state
        .auth_service
        .admin_list_sessions(&admin, user_id)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        sessions
            .into_iter()
            .map(|session| SessionData::new(session, None))
            .collect(),
    ))
}

pub async fn revoke_user_session(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    ClientMeta(client): ClientMeta,
    Path((user_id, session_id)): Path<(String, String)>,
) -> Result<ApiSuccess<RevokedData>, ApiError> {
    let user_id = UserId::from_string(&user_id)?;
    state
        .auth_service
        .admin_revoke_session(&admin, user_id, SessionId::from_string(session_id), &client)
        .await?;

    Ok(ApiSuccess::new(StatusCode::OK, RevokedData { revoked: 1 }))
}

pub async fn revoke_all_user_sessions(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    ClientMeta(client): ClientMeta,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<RevokedData>, ApiError> {
    let user_id = UserId::from_string(&user_id)?;
    state
        .auth_service
        .admin_revoke_all_sessions(&admin, user_id, &client)
        .await
        .map_err(ApiError::from)
        .map(|revoked| ApiSuccess::new(StatusCode::OK, RevokedData { revoked }))
}

async fn change_status(
    state: AppState,
    admin: Identity,
    client: ClientMeta,
    user_id: String,
    change: StatusChange,
) -> Result<ApiSuccess<UserData>, ApiError> {
    let user_id = UserId::from_string(&user_id)?;
    state
        .account_service
        .change_status(admin.user_id, user_id, change, &client.0)
        .await
        .map_err(ApiError::from)
        .map(|ref credential| ApiSuccess::new(StatusCode::OK, credential.into()))
}

pub async fn ban_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    client: ClientMeta,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    change_status(state, admin, client, user_id, StatusChange::Ban).await
}

pub async fn unban_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    client: ClientMeta,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    change_status(state, admin, client, user_id, StatusChange::Unban).await
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    client: ClientMeta,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    change_status(state, admin, client, user_id, StatusChange::Deactivate).await
}

pub async fn reactivate_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    client: ClientMeta,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    change_status(state, admin, client, user_id, StatusChange::Reactivate).await
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    ClientMeta(client): ClientMeta,
    Path(user_id): Path<String>,
    Json(body): Json<ResetPasswordRequestBody>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let user_id = UserId::from_string(&user_id)?;
    let new_password = Password::new(body.new_password).map_err(AccountError::from)?;

    state
        .account_service
        .admin_reset_password(admin.user_id, user_id, new_password, &client)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageData::new("Password reset successfully"),
    ))
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Query(query): Query<AuditLogQuery>,
) -> Result<ApiSuccess<AuditLogListData>, ApiError> {
    let (filter, page) = query.into_filter()?;
    tracing::debug!(admin_id = %admin.user_id, page = page.page(), "Admin listing audit entries");

    state
        .audit_service
        .list(filter, page)
        .await
        .map_err(ApiError::from)
        .map(|listing| ApiSuccess::new(StatusCode::OK, listing.into()))
}

pub async fn cleanup_sessions(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
) -> Result<ApiSuccess<CleanupData>, ApiError> {
    tracing::info!(admin_id = %admin.user_id, "Admin triggered session cleanup");
    state
        .auth_service
        .cleanup_sessions()
        .await
        .map_err(ApiError::from)
        .map(|deleted| ApiSuccess::new(StatusCode::OK, CleanupData { deleted }))
}

pub async fn cleanup_audit_logs(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Query(query): Query<CleanupQuery>,
) -> Result<ApiSuccess<CleanupData>, ApiError> {
    let retention = query.retention(state.retention.audit_log)?;
    tracing::info!(admin_id = %admin.user_id, retention_days = retention.num_days(), "Admin triggered audit log cleanup");

    state
        .audit_service
        .prune(retention)
        .await
        .map_err(ApiError::from)
        .map(|deleted| ApiSuccess::new(StatusCode::OK, CleanupData { deleted }))
}

pub async fn cleanup_rate_limit_logs(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Query(query): Query<CleanupQuery>,
) -> Result<ApiSuccess<CleanupData>, ApiError> {
    let retention = query.retention(state.retention.rate_limit_log)?;
    tracing::info!(admin_id = %admin.user_id, retention_days = retention.num_days(), "Admin triggered rate limit log cleanup");

    state
        .rate_guard
        .prune(retention)
        .await
        .map_err(ApiError::from)
        .map(|deleted| ApiSuccess::new(StatusCode::OK, CleanupData { deleted }))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordRequestBody {
    #[serde(alias = "newPassword")]
    new_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CleanupQuery {
    days: Option<i64>,
}

impl CleanupQuery {
    fn retention(&self, default: Duration) -> Result<Duration, ApiError> {
        match self.days {
            None => Ok(default),
            Some(days) if days >= 1 => Ok(Duration::days(days)),
            Some(_) => Err(ApiError::UnprocessableEntity(
                "days must be at least 1".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuditLogQuery {
    page: Option<u32>,
    limit: Option<u32>,
    #[serde(alias = "userId")]
    user_id: Option<i64>,
    action: Option<String>,
    #[serde(alias = "entityType")]
    entity_type: Option<String>,
    #[serde(alias = "entityId")]
    entity_id: Option<String>,
    #[serde(alias = "ipAddress")]
    ip_address: Option<String>,
    #[serde(alias = "startDate")]
    start_date: Option<DateTime<Utc>>,
    #[serde(alias = "endDate")]
    end_date: Option<DateTime<Utc>>,
}

impl AuditLogQuery {
    fn into_filter(self) -> Result<(AuditFilter, Page), ApiError> {
        let action = self
            .action
            .map(|action| action.parse::<AuditAction>())
            .transpose()
            .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

        let filter = AuditFilter {
            actor: self.user_id.map(UserId),
            action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            ip_address: self.ip_address,
            from: self.start_date,
            until: self.end_date,
        };
        let page = Page::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(Page::DEFAULT_LIMIT),
        );

        Ok((filter, page))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupData {
    pub deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLogData {
    id: i64,
    user_id: Option<i64>,
    action: &'static str,
    entity_type: String,
    entity_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AuditRecord> for AuditLogData {
    fn from(record: AuditRecord) -> Self {
        let entry = record.entry;
        Self {
            id: record.id,
            user_id: entry.actor.map(|id| id.0),
            action: entry.action.as_str(),
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationData {
    page: u32,
    limit: u32,
    total: u64,
    total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLogListData {
    logs: Vec<AuditLogData>,
    pagination: PaginationData,
}

impl From<AuditPage> for AuditLogListData {
    fn from(listing: AuditPage) -> Self {
        let pagination = PaginationData {
            page: listing.page.page(),
            limit: listing.page.limit(),
            total: listing.total,
            total_pages: listing.total_pages(),
        };
        Self {
            logs: listing.records.into_iter().map(AuditLogData::from).collect(),
            pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_query_builds_filter_and_page() {
        let query = AuditLogQuery {
            page: Some(2),
            limit: Some(500),
            user_id: Some(7),
            action: Some("PASSWORD_RESET".to_string()),
            ..AuditLogQuery::default()
        };

        let (filter, page) = query.into_filter().unwrap();
        assert_eq!(filter.actor, Some(UserId(7)));
        assert_eq!(filter.action, Some(AuditAction::PasswordReset));
        assert_eq!((page.page(), page.limit()), (2, Page::MAX_LIMIT));
    }

    #[test]
    fn test_audit_query_rejects_unknown_action() {
        let query = AuditLogQuery {
            action: Some("DROP_TABLES".to_string()),
            ..AuditLogQuery::default()
        };
        assert!(matches!(
            query.into_filter(),
            Err(ApiError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn test_cleanup_days_default_and_floor() {
        let default = Duration::days(90);
        assert_eq!(CleanupQuery::default().retention(default), Ok(default));
        assert_eq!(
            CleanupQuery { days: Some(7) }.retention(default),
            Ok(Duration::days(7))
        );
        assert!(CleanupQuery { days: Some(0) }.retention(default).is_err());
    }
}
