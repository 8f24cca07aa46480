//! Authentication utilities library
//!
//! Provides the reusable pieces of session-bound authentication:
//! - Password hashing (Argon2id)
//! - Signed access/refresh tokens bound to a server-side session id
//! - Opaque session token generation
//! - An `Authenticator` that pairs hashing with token issuance
//!
//! Services own their session storage and lockout policy; this crate only
//! handles the cryptographic parts.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Session-bound tokens
//! ```
//! use auth::{generate_session_token, Authenticator, TokenSubject};
//!
//! let auth = Authenticator::new(b"secret_key_at_least_32_bytes_long!");
//! let session_id = generate_session_token().unwrap();
//! let subject = TokenSubject::new(42, "alice", "user");
//!
//! let pair = auth.issue_pair(&subject, &session_id).unwrap();
//! let access = auth.verify_access(&pair.access_token).unwrap();
//! let refresh = auth.verify_refresh(&pair.refresh_token).unwrap();
//! assert_eq!(access.sid, refresh.sid);
//! assert!(auth.verify_access(&pair.refresh_token).is_none());
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod session_token;

pub use authenticator::Authenticator;
pub use authenticator::TokenPair;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::TokenCodec;
pub use jwt::TokenKind;
pub use jwt::TokenLifetimes;
pub use jwt::TokenSubject;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use session_token::generate_session_token;
pub use session_token::SessionTokenError;
