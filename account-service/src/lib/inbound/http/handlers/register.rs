use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::SessionGrantData;
use crate::domain::account::errors::AccountError;
use crate::domain::account::models::validate_full_name;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::Password;
use crate::domain::account::models::RegisterCommand;
use crate::domain::account::models::Username;
use crate::inbound::http::client::ClientMeta;
use crate::inbound::http::router::AppState;

/// Register an account and open its first session.
pub async fn register(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    Json(body): Json<RegisterRequestBody>,
) -> Result<ApiSuccess<SessionGrantData>, ApiError> {
    let device_info = body.device_info.clone();
    let credential = state
        .account_service
        .register(body.try_into_command()?, &client)
        .await?;

    let grant = state
        .auth_service
        .open_session(credential, device_info, &client)
        .await?;

    Ok(ApiSuccess::new(StatusCode::CREATED, grant.into()))
}

/// HTTP request body for registration (raw JSON)
///
/// Any `role` field sent by the client is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequestBody {
    username: String,
    email: String,
    password: String,
    #[serde(alias = "fullName")]
    full_name: String,
    #[serde(default, alias = "deviceInfo")]
    device_info: Option<String>,
}

impl RegisterRequestBody {
    fn try_into_command(self) -> Result<RegisterCommand, AccountError> {
        let username = Username::new(self.username)?;
        let email = EmailAddress::new(self.email)?;
        let full_name = validate_full_name(&self.full_name)?;
        let password = Password::new(self.password)?;
        Ok(RegisterCommand::new(username, email, full_name, password))
    }
}
