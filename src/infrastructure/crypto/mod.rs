//! Cryptographic primitives: password hashing and session tokens.

pub mod jwt;
pub mod password;

pub use jwt::{IssuedToken, JwtConfig, SharedSecret, TokenClaims, TokenError, TokenIssuer, TokenVerifier};
pub use password::PasswordHasher;
