use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::TokenCodec;
use crate::jwt::TokenKind;
use crate::jwt::TokenSubject;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Coordinates password verification and session-bound token issuance.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    codec: TokenCodec,
}

/// Access and refresh token minted for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl Authenticator {
    /// Create an authenticator with default hashing cost and token lifetimes.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for token signing
    pub fn new(jwt_secret: &[u8]) -> Self {
        Self::from_parts(PasswordHasher::new(), TokenCodec::new(jwt_secret))
    }

    pub fn from_parts(password_hasher: PasswordHasher, codec: TokenCodec) -> Self {
        Self {
            password_hasher,
            codec,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// # Errors
    /// * `PasswordError` - Stored hash is malformed
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Issue an access and a refresh token carrying the same session id.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_pair(
        &self,
        subject: &TokenSubject,
        session_id: &str,
    ) -> Result<TokenPair, JwtError> {
        let access_token = self.codec.issue(TokenKind::Access, subject, session_id)?;
        let refresh_token = self.codec.issue(TokenKind::Refresh, subject, session_id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.codec.lifetimes().access.num_seconds(),
        })
    }

    /// Verified claims of an access token, `None` otherwise.
    pub fn verify_access(&self, token: &str) -> Option<Claims> {
        self.codec.verify_kind(token, TokenKind::Access)
    }

    /// Verified claims of a refresh token, `None` otherwise.
    pub fn verify_refresh(&self, token: &str) -> Option<Claims> {
        self.codec.verify_kind(token, TokenKind::Refresh)
    }
}
