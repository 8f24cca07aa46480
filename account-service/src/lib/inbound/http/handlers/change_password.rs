use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::domain::account::errors::AccountError;
use crate::domain::account::models::ChangePasswordCommand;
use crate::domain::account::models::Password;
use crate::domain::auth::models::Identity;
use crate::inbound::http::client::ClientMeta;
use crate::inbound::http::router::AppState;

pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ClientMeta(client): ClientMeta,
    Json(body): Json<ChangePasswordRequestBody>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let command = ChangePasswordCommand {
        current_password: body.current_password,
        new_password: Password::new(body.new_password).map_err(AccountError::from)?,
    };

    state
        .account_service
        .change_password(identity.user_id, command, &client)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageData::new("Password changed successfully"),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangePasswordRequestBody {
    #[serde(alias = "currentPassword")]
    current_password: String,
    #[serde(alias = "newPassword")]
    new_password: String,
}
