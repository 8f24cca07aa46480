pub mod claims;
pub mod codec;
pub mod errors;

pub use claims::Claims;
pub use claims::TokenKind;
pub use claims::TokenSubject;
pub use codec::TokenCodec;
pub use codec::TokenLifetimes;
pub use errors::JwtError;
