use axum::extract::Request;
use axum::extract::State;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::domain::auth::models::Identity;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Middleware that resolves the bearer token into an `Identity` extension.
///
/// The token's session is checked for liveness on every request, so a
/// revoked session is rejected even while its token is unexpired.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token_from_header(&req)?;

    let identity = state
        .auth_service
        .authenticate(token)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Middleware that admits only `admin` and `superadmin` identities.
///
/// Must run after `authenticate`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, Response> {
    match req.extensions().get::<Identity>() {
        Some(identity) if identity.is_admin() => Ok(next.run(req).await),
        Some(identity) => {
            tracing::warn!(user_id = %identity.user_id, "Admin route denied");
            Err(ApiError::Forbidden("Admin privileges required".to_string()).into_response())
        }
        None => Err(ApiError::unauthorized("Authentication required", "UNAUTHORIZED").into_response()),
    }
}

fn extract_token_from_header(req: &Request) -> Result<&str, Response> {
    let unauthorized =
        |message: &str| ApiError::unauthorized(message, "UNAUTHORIZED").into_response();

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(unauthorized(
            "Invalid Authorization header format. Expected: Bearer <token>",
        )),
    }
}
