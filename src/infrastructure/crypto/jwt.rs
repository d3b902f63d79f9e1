//! JWT session token handling
//!
//! Tokens are HS256-signed with a process-wide [`SharedSecret`] and carry
//! the account id as `sub`. Nothing about a token is stored server-side.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{AccountId, Role};
use crate::shared::SigningError;

/// Fixed lifetime of a session token.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// Longest token lifetime the service will sign (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

pub const DEFAULT_ISSUER: &str = "authgate";

/// Symmetric key material used to sign and verify tokens.
///
/// Immutable once built; cloning shares the same bytes.
#[derive(Clone)]
pub struct SharedSecret(Arc<[u8]>);

impl SharedSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: SharedSecret,
    /// Token expiration time in hours
    pub expiration_hours: i64,
    /// Issuer claim
    pub issuer: String,
    /// Allowed clock skew between services, in seconds
    pub leeway_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: SharedSecret) -> Self {
        Self {
            secret,
            expiration_hours: DEFAULT_TOKEN_TTL_HOURS,
            issuer: DEFAULT_ISSUER.to_string(),
            leeway_secs: 0,
        }
    }

    /// `None` when `expiration_hours` does not fit a `Duration`.
    pub fn ttl(&self) -> Option<Duration> {
        Duration::try_hours(self.expiration_hours)
    }
}

/// JWT claims as issued by this service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (account ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Elevated role flag
    #[serde(default)]
    pub adm: bool,
}

impl TokenClaims {
    pub fn new(
        account_id: &AccountId,
        role: Role,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        issuer: &str,
    ) -> Self {
        Self {
            sub: account_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: issuer.to_string(),
            adm: role.is_admin(),
        }
    }
}

/// A freshly signed token together with its validity window.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Remaining lifetime in whole seconds at issuance.
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

/// Signs session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    config: JwtConfig,
}

impl TokenIssuer {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(config.secret.as_bytes()),
            config,
        }
    }

    pub fn issue(&self, account_id: &AccountId, role: Role) -> Result<IssuedToken, SigningError> {
        self.issue_at(account_id, role, Utc::now())
    }

    /// Issues a token as if it had been created at `issued_at`.
    pub fn issue_at(
        &self,
        account_id: &AccountId,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, SigningError> {
        let expires_at = self
            .config
            .ttl()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or(SigningError::ExpiryOutOfRange(self.config.expiration_hours))?;

        let claims = TokenClaims::new(account_id, role, issued_at, expires_at, &self.config.issuer);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }
}

/// Why a token failed cryptographic or temporal verification.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, wrong algorithm or issuer, or unparseable token
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    /// `exp` missing or not an integer
    #[error("token has no usable exp claim")]
    MissingExpiry,
    /// `exp` is in the past
    #[error("token has expired")]
    Expired,
}

/// Checks signature, algorithm, issuer and expiry of a token.
///
/// The claim set comes back untyped; extracting the subject is the
/// caller's concern.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    leeway_secs: i64,
}

impl TokenVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        // Expiry is checked against an explicit `now` in `verify_at`.
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            leeway_secs: i64::try_from(config.leeway_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Map<String, Value>, TokenError> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map_err(TokenError::Invalid)?;

        let exp = data
            .claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(TokenError::MissingExpiry)?;

        if now.timestamp() >= exp.saturating_add(self.leeway_secs) {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new(SharedSecret::new("test-secret"))
    }

    #[test]
    fn test_create_and_verify_token() {
        let config = config();
        let id = AccountId::generate();
        let issued = TokenIssuer::new(config.clone()).issue(&id, Role::Admin).unwrap();

        let claims = TokenVerifier::new(&config)
            .verify_at(&issued.token, Utc::now())
            .unwrap();
        assert_eq!(claims["sub"], Value::String(id.to_string()));
        assert_eq!(claims["iss"], Value::String(DEFAULT_ISSUER.to_string()));
        assert_eq!(claims["adm"], Value::Bool(true));
        assert_eq!(issued.expires_in(), 24 * 3600);
    }

    #[test]
    fn test_invalid_token() {
        let result = TokenVerifier::new(&config()).verify_at("invalid-token", Utc::now());
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        let issued = TokenIssuer::new(config.clone())
            .issue_at(&AccountId::generate(), Role::Member, Utc::now() - Duration::hours(25))
            .unwrap();

        let result = TokenVerifier::new(&config).verify_at(&issued.token, Utc::now());
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn token_is_rejected_exactly_at_expiry() {
        let config = config();
        let issued = TokenIssuer::new(config.clone())
            .issue(&AccountId::generate(), Role::Member)
            .unwrap();
        let verifier = TokenVerifier::new(&config);

        let just_before = issued.expires_at - Duration::seconds(1);
        assert!(verifier.verify_at(&issued.token, just_before).is_ok());
        assert!(matches!(
            verifier.verify_at(&issued.token, issued.expires_at),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn other_secret_is_rejected() {
        let issued = TokenIssuer::new(config())
            .issue(&AccountId::generate(), Role::Member)
            .unwrap();
        let other = JwtConfig::new(SharedSecret::new("another-secret"));

        let result = TokenVerifier::new(&other).verify_at(&issued.token, Utc::now());
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn other_issuer_is_rejected() {
        let mut foreign = config();
        foreign.issuer = "someone-else".to_string();
        let issued = TokenIssuer::new(foreign)
            .issue(&AccountId::generate(), Role::Member)
            .unwrap();

        let result = TokenVerifier::new(&config()).verify_at(&issued.token, Utc::now());
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let config = config();
        let now = Utc::now();
        let claims = TokenClaims::new(
            &AccountId::generate(),
            Role::Member,
            now,
            now + Duration::hours(1),
            &config.issuer,
        );
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let result = TokenVerifier::new(&config).verify_at(&token, Utc::now());
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn leeway_extends_acceptance_window() {
        let mut config = config();
        config.leeway_secs = 120;
        let issued = TokenIssuer::new(config.clone())
            .issue(&AccountId::generate(), Role::Member)
            .unwrap();

        let slightly_late = issued.expires_at + Duration::seconds(60);
        assert!(TokenVerifier::new(&config)
            .verify_at(&issued.token, slightly_late)
            .is_ok());
    }

    #[test]
    fn unrepresentable_lifetime_is_a_signing_error() {
        let mut config = config();
        config.expiration_hours = i64::MAX;
        let result = TokenIssuer::new(config).issue(&AccountId::generate(), Role::Member);
        assert!(matches!(result, Err(SigningError::ExpiryOutOfRange(_))));
    }

    #[test]
    fn expiry_past_the_calendar_is_a_signing_error() {
        let mut config = config();
        config.expiration_hours = MAX_TOKEN_TTL_HOURS;
        let result = TokenIssuer::new(config).issue_at(
            &AccountId::generate(),
            Role::Member,
            DateTime::<Utc>::MAX_UTC - Duration::hours(1),
        );
        assert!(matches!(result, Err(SigningError::ExpiryOutOfRange(_))));
    }

    #[test]
    fn invalid_error_exposes_its_source() {
        use std::error::Error as _;

        let err = TokenVerifier::new(&config())
            .verify_at("invalid-token", Utc::now())
            .unwrap_err();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("invalid token: "));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("test-secret"));
    }
}
