use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::SessionGrantData;
use crate::domain::auth::models::LoginCommand;
use crate::inbound::http::client::ClientMeta;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<SessionGrantData>, ApiError> {
    if body.identifier.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Identifier and password are required".to_string(),
        ));
    }

    state
        .auth_service
        .login(LoginCommand {
            identifier: body.identifier,
            password: body.password,
            device_info: body.device_info,
            client,
        })
        .await
        .map_err(ApiError::from)
        .map(|grant| ApiSuccess::new(StatusCode::OK, grant.into()))
}

/// `identifier` accepts a username or an email address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    #[serde(alias = "username", alias = "email")]
    identifier: String,
    password: String,
    #[serde(default, alias = "deviceInfo")]
    device_info: Option<String>,
}
