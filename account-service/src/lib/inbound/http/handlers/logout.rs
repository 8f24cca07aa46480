use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::RevokedData;
use crate::domain::auth::models::Identity;
use crate::domain::session::models::SessionId;
use crate::inbound::http::client::ClientMeta;
use crate::inbound::http::router::AppState;

/// Revoke the session named in the body, or every session of the caller.
///
/// Only an empty body, or one without `session_id`, selects every session.
/// A body that does not parse is rejected rather than widened.
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ClientMeta(client): ClientMeta,
    body: Bytes,
) -> Result<ApiSuccess<RevokedData>, ApiError> {
    let session_id = parse_logout_body(&body)?;

    state
        .auth_service
        .logout(&identity, session_id, &client)
        .await
        .map_err(ApiError::from)
        .map(|revoked| ApiSuccess::new(StatusCode::OK, RevokedData { revoked }))
}

pub async fn revoke_session(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ClientMeta(client): ClientMeta,
    Path(session_id): Path<String>,
) -> Result<ApiSuccess<RevokedData>, ApiError> {
    state
        .auth_service
        .logout(&identity, Some(SessionId::from_string(session_id)), &client)
        .await
        .map_err(ApiError::from)
        .map(|revoked| ApiSuccess::new(StatusCode::OK, RevokedData { revoked }))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogoutRequestBody {
    #[serde(default, alias = "sessionId")]
    session_id: Option<String>,
}

fn parse_logout_body(body: &[u8]) -> Result<Option<SessionId>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let Json(body) = Json::<LogoutRequestBody>::from_bytes(body)
        .map_err(|rejection| ApiError::UnprocessableEntity(rejection.body_text()))?;

    match body.session_id {
        Some(id) if id.is_empty() => Err(ApiError::UnprocessableEntity(
            "session_id must not be empty".to_string(),
        )),
        other => Ok(other.map(SessionId::from_string)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_selects_every_session() {
        assert_eq!(parse_logout_body(b"").unwrap(), None);
        assert_eq!(parse_logout_body(b"  \n").unwrap(), None);
        assert_eq!(parse_logout_body(b"{}").unwrap(), None);
    }

    #[test]
    fn test_named_session_in_either_casing() {
        assert_eq!(
            parse_logout_body(br#"{"session_id":"abc"}"#).unwrap(),
            Some(SessionId::from_string("abc"))
        );
        assert_eq!(
            parse_logout_body(br#"{"sessionId":"abc"}"#).unwrap(),
            Some(SessionId::from_string("abc"))
        );
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        for body in [
            &br#"{"sessionId":12345}"#[..],
            &br#"{"sessionId":"#[..],
            &b"not json"[..],
            &br#"{"sessionId":""}"#[..],
        ] {
            assert!(matches!(
                parse_logout_body(body),
                Err(ApiError::UnprocessableEntity(_))
            ));
        }
    }
}
