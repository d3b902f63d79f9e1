use thiserror::Error;

/// Failures of the registration / login workflow.
///
/// `InvalidInput`, `Conflict` and `InvalidCredentials` are expected outcomes
/// reported back to the caller. Everything else is infrastructure trouble:
/// it is logged with full detail and surfaced only as an opaque failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation: {0}")]
    InvalidInput(String),

    #[error("Username or email already exists")]
    Conflict,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),
}

impl AuthError {
    /// Whether the caller caused this error (as opposed to the service).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidInput(_) | AuthError::Conflict | AuthError::InvalidCredentials
        )
    }
}

/// Why the authorization gate refused a presented credential.
///
/// All variants mean "unauthorized" to the outside world; the distinction
/// exists for logs, metrics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("missing credential")]
    MissingCredential,

    #[error("malformed credential")]
    MalformedCredential,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("malformed claims")]
    MalformedClaims,
}

impl Rejection {
    /// Stable label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::MissingCredential => "missing_credential",
            Rejection::MalformedCredential => "malformed_credential",
            Rejection::InvalidCredential => "invalid_credential",
            Rejection::MalformedClaims => "malformed_claims",
        }
    }
}

/// Credential store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint on username or email rejected the write.
    #[error("Username or email already exists")]
    Conflict,

    #[error("Database error: {0}")]
    Backend(#[from] sea_orm::DbErr),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::Conflict,
            StoreError::Backend(e) => AuthError::Storage(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct HashError(String);

impl HashError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<bcrypt::BcryptError> for HashError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self(err.to_string())
    }
}

impl From<HashError> for AuthError {
    fn from(err: HashError) -> Self {
        AuthError::Hashing(err.0)
    }
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Token signing failed: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    #[error("Token lifetime of {0}h puts expiry out of range")]
    ExpiryOutOfRange(i64),
}

impl From<SigningError> for AuthError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::Encode(e) => AuthError::Signing(e.to_string()),
            other => AuthError::Signing(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
