use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

pub async fn check_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<ApiSuccess<AvailabilityData>, ApiError> {
    let available = state
        .account_service
        .is_username_available(&username)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        AvailabilityData {
            value: username,
            available,
        },
    ))
}

pub async fn check_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<ApiSuccess<AvailabilityData>, ApiError> {
    let available = state.account_service.is_email_available(&email).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        AvailabilityData {
            value: email,
            available,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityData {
    pub value: String,
    pub available: bool,
}
