//! Authorization gate
//!
//! Turns the raw value of an `Authorization` header into an [`Identity`]
//! or a [`Rejection`]. Pure with respect to the header, the clock and the
//! shared secret: no storage is consulted, so an account removed after
//! issuance stays authorized until its token expires.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use crate::domain::{AccountId, Role};
use crate::infrastructure::crypto::jwt::{JwtConfig, TokenError, TokenVerifier};
use crate::shared::Rejection;

const BEARER_PREFIX: &str = "Bearer ";

/// Verified identity of the caller, valid for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: AccountId,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Clone)]
pub struct AuthorizationGate {
    verifier: TokenVerifier,
}

impl AuthorizationGate {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            verifier: TokenVerifier::new(config),
        }
    }

    pub fn authorize(&self, header: Option<&str>) -> Result<Identity, Rejection> {
        self.authorize_at(header, Utc::now())
    }

    /// Same as [`authorize`](Self::authorize) for a header that may not be
    /// valid UTF-8; such a header counts as malformed.
    pub fn authorize_raw(&self, header: Option<&[u8]>) -> Result<Identity, Rejection> {
        match header.map(std::str::from_utf8) {
            Some(Err(_)) => self.finish(Err(Rejection::MalformedCredential)),
            Some(Ok(value)) => self.authorize(Some(value)),
            None => self.authorize(None),
        }
    }

    pub fn authorize_at(&self, header: Option<&str>, now: DateTime<Utc>) -> Result<Identity, Rejection> {
        self.finish(self.evaluate(header, now))
    }

    fn evaluate(&self, header: Option<&str>, now: DateTime<Utc>) -> Result<Identity, Rejection> {
        // A blank header carries no credential at all.
        let header = header
            .filter(|value| !value.trim().is_empty())
            .ok_or(Rejection::MissingCredential)?;
        let token = bearer_token(header)?;

        let claims = self.verifier.verify_at(token, now).map_err(|e| {
            match &e {
                TokenError::Invalid(inner) => debug!(kind = ?inner.kind(), "token verification failed"),
                other => debug!("token verification failed: {}", other),
            }
            Rejection::InvalidCredential
        })?;

        let account_id = claims
            .get("sub")
            .and_then(Value::as_str)
            .and_then(|sub| sub.parse::<AccountId>().ok())
            .ok_or(Rejection::MalformedClaims)?;

        let role = match claims.get("adm") {
            None => Role::Member,
            Some(Value::Bool(adm)) => Role::from(*adm),
            Some(_) => return Err(Rejection::MalformedClaims),
        };

        // `exp` was already checked to be an integer by the verifier.
        let expires_at = claims
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
            .ok_or(Rejection::InvalidCredential)?;

        Ok(Identity {
            account_id,
            role,
            expires_at,
        })
    }

    fn finish(&self, result: Result<Identity, Rejection>) -> Result<Identity, Rejection> {
        match &result {
            Ok(identity) => {
                metrics::counter!("auth_authorize_total", "outcome" => "authorized").increment(1);
                debug!(account_id = %identity.account_id, "request authorized");
            }
            Err(rejection) => {
                metrics::counter!("auth_authorize_total", "outcome" => rejection.as_str()).increment(1);
                debug!(reason = rejection.as_str(), "request rejected");
            }
        }
        result
    }
}

/// Accepts exactly `Bearer <token>`, with a non-empty token free of
/// whitespace.
fn bearer_token(header: &str) -> Result<&str, Rejection> {
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(Rejection::MalformedCredential)?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(Rejection::MalformedCredential);
    }
    Ok(token)
}
