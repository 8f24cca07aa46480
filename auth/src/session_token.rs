use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Bytes of entropy in a session token.
pub const SESSION_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Error)]
#[error("Failed to generate session token: {0}")]
pub struct SessionTokenError(String);

/// Generate an opaque, unguessable session identifier.
///
/// 32 bytes from the OS RNG, base64url encoded without padding (43 chars).
pub fn generate_session_token() -> Result<String, SessionTokenError> {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| SessionTokenError(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
