//! Registration / login workflow, application-layer orchestration
//!
//! HTTP handlers are thin wrappers that delegate to [`AuthService`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::domain::{AccountId, AccountStore, HashedSecret, NewAccount, Role};
use crate::infrastructure::crypto::jwt::{IssuedToken, TokenIssuer};
use crate::infrastructure::crypto::password::PasswordHasher;
use crate::shared::{AuthError, HashError};

pub const MIN_PASSWORD_CHARS: usize = 8;

/// bcrypt ignores input past 72 bytes; longer passwords are refused
/// instead of being silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Input to [`AuthService::register`].
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Role requested by the client, if any
    pub role: Option<Role>,
}

impl Registration {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: AccountId,
    pub token: IssuedToken,
}

/// Orchestrates the credential store, password hasher and token issuer.
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    deadline: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn AccountStore>, hasher: PasswordHasher, issuer: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            issuer,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Overall time budget for a single register or login call.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new, non-privileged account.
    ///
    /// Requesting the elevated role here is refused; it can only be granted
    /// through [`provision`](Self::provision).
    pub async fn register(&self, registration: Registration) -> Result<AccountId, AuthError> {
        if registration.role.is_some_and(|r| r.is_admin()) {
            record("auth_register_total", "invalid_input");
            return Err(AuthError::InvalidInput(
                "Elevated role cannot be self-assigned".into(),
            ));
        }

        let result = self
            .within_deadline(self.create(registration, Role::Member))
            .await;
        record("auth_register_total", outcome(&result));
        result
    }

    /// Administrative grant path: create an account with an explicit role.
    pub async fn provision(&self, registration: Registration, role: Role) -> Result<AccountId, AuthError> {
        let result = self.within_deadline(self.create(registration, role)).await;
        record("auth_register_total", outcome(&result));
        result
    }

    async fn create(&self, registration: Registration, role: Role) -> Result<AccountId, AuthError> {
        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_string();
        validate(&username, &email, &registration.password)?;

        // Advisory only. The UNIQUE constraints decide races.
        if self.store.is_taken(&username, &email).await? {
            info!(username = %username, "Registration refused: username or email taken");
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hash(registration.password).await?;

        let id = self
            .store
            .create_account(NewAccount {
                username: username.clone(),
                email,
                password_hash,
                role,
            })
            .await
            .map_err(AuthError::from)
            .inspect_err(|e| {
                if matches!(e, AuthError::Conflict) {
                    info!(username = %username, "Registration lost a uniqueness race");
                }
            })?;

        info!(account_id = %id, username = %username, role = role.as_str(), "New account registered");
        Ok(id)
    }

    // ── Authentication ──────────────────────────────────────────

    /// Verify username + password and issue a session token.
    ///
    /// Unknown usernames and wrong passwords fail identically, and both
    /// cost one bcrypt verification.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let result = self.within_deadline(self.authenticate(username, password)).await;
        record("auth_login_total", outcome(&result));
        result
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let account = self.store.find_by_username(username.trim()).await?;

        let Some(account) = account else {
            self.verify(password.to_string(), None).await?;
            return Err(AuthError::InvalidCredentials);
        };

        let valid = self
            .verify(password.to_string(), Some(account.password_hash.clone()))
            .await?;
        if !valid {
            warn!(account_id = %account.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issuer.issue(&account.id, account.role)?;
        info!(account_id = %account.id, "Login succeeded");

        Ok(Session {
            account_id: account.id,
            token,
        })
    }

    // ── Helpers ─────────────────────────────────────────────────

    /// bcrypt runs on the blocking pool so it never stalls the async workers.
    async fn hash(&self, password: String) -> Result<HashedSecret, AuthError> {
        let hasher = self.hasher.clone();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| HashError::new(e.to_string()))??;
        Ok(hashed)
    }

    /// Verifies against `stored`, or against the decoy hash when `None`.
    async fn verify(&self, password: String, stored: Option<HashedSecret>) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let valid = tokio::task::spawn_blocking(move || match stored {
            Some(hash) => hasher.verify(&password, &hash),
            None => hasher.verify_decoy(&password),
        })
        .await
        .map_err(|e| HashError::new(e.to_string()))?;
        Ok(valid)
    }

    async fn within_deadline<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        let result = tokio::time::timeout(self.deadline, fut)
            .await
            .unwrap_or(Err(AuthError::DeadlineExceeded(self.deadline)));

        if let Err(e) = &result {
            if !e.is_client_error() {
                error!("Auth workflow failed: {}", e);
            }
        }
        result
    }
}

/// The password minimum counts characters; the maximum counts bytes, which
/// is what bcrypt truncates on.
fn validate(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    if username.is_empty() || email.is_empty() {
        return Err(AuthError::InvalidInput(
            "Username and email are required".into(),
        ));
    }
    Ok(())
}

fn outcome<T>(result: &Result<T, AuthError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AuthError::InvalidInput(_)) => "invalid_input",
        Err(AuthError::Conflict) => "conflict",
        Err(AuthError::InvalidCredentials) => "invalid_credentials",
        Err(AuthError::DeadlineExceeded(_)) => "deadline_exceeded",
        Err(_) => "internal_error",
    }
}

fn record(name: &'static str, outcome: &'static str) {
    metrics::counter!(name, "outcome" => outcome).increment(1);
}
