use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::auth::models::Identity;
use crate::inbound::http::router::AppState;

pub async fn profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .account_service
        .get_account(identity.user_id)
        .await
        .map_err(ApiError::from)
        .map(|ref credential| ApiSuccess::new(StatusCode::OK, credential.into()))
}
