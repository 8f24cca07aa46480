use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::SessionData;
use crate::domain::auth::models::Identity;
use crate::inbound::http::router::AppState;

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<ApiSuccess<Vec<SessionData>>, ApiError> {
    let sessions = state.auth_service.list_sessions(identity.user_id).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        sessions
            .into_iter()
            .map(|session| SessionData::new(session, Some(&identity.session_id)))
            .collect(),
    ))
}
