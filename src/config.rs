//! Configuration module
//!
//! Settings come from a TOML file (default `~/.config/authgate/config.toml`),
//! then environment overrides. Every service that must accept the same
//! tokens needs the same `security.jwt_secret` and `security.issuer`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::infrastructure::crypto::jwt::{
    JwtConfig, SharedSecret, DEFAULT_ISSUER, DEFAULT_TOKEN_TTL_HOURS, MAX_TOKEN_TTL_HOURS,
};
use crate::infrastructure::crypto::password::{MAX_COST, MIN_COST};
use crate::infrastructure::database::DatabaseConfig;
use crate::shared::ConfigError;

/// Environment variable pointing at the config file
pub const CONFIG_ENV: &str = "AUTHGATE_CONFIG";
/// Environment override for `security.jwt_secret`
pub const JWT_SECRET_ENV: &str = "AUTHGATE_JWT_SECRET";
/// Environment override for `database.url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("authgate")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub security: SecuritySection,
    pub logging: LoggingSection,
    /// Bootstrap administrator, provisioned when the store is empty
    pub admin: Option<AdminSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds allowed for in-flight requests to drain on shutdown
    pub shutdown_timeout: u64,
    /// Seconds allowed for a single register or login call
    pub request_timeout: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
            shutdown_timeout: 30,
            request_timeout: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: defaults.url,
            max_connections: defaults.max_connections,
        }
    }
}

impl DatabaseSection {
    pub fn connection_url(&self) -> String {
        self.url.clone()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub issuer: String,
    /// Clock skew tolerated when checking token expiry, in seconds
    pub token_leeway_secs: u64,
    pub bcrypt_cost: u32,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            issuer: DEFAULT_ISSUER.to_string(),
            token_leeway_secs: 0,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl std::fmt::Debug for SecuritySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecuritySection")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("issuer", &self.issuer)
            .field("token_leeway_secs", &self.token_leeway_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// trace, debug, info, warn, error (RUST_LOG wins when set)
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AdminSection {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSection")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AppConfig {
    /// Read the TOML file at `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            self.security.jwt_secret = secret;
        }
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            self.database.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "security.jwt_secret must be set (or {})",
                JWT_SECRET_ENV
            )));
        }
        if self.security.jwt_secret.len() < 32 {
            warn!("security.jwt_secret is shorter than 32 bytes");
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.security.token_ttl_hours) {
            return Err(ConfigError::Invalid(format!(
                "security.token_ttl_hours must be within 1..={}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if !(MIN_COST..=MAX_COST).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "security.bcrypt_cost must be within {}..={}",
                MIN_COST,
                MAX_COST
            )));
        }
        if self.security.issuer.is_empty() {
            return Err(ConfigError::Invalid("security.issuer must not be empty".into()));
        }
        if self.server.request_timeout == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: SharedSecret::new(self.security.jwt_secret.as_bytes()),
            expiration_hours: self.security.token_ttl_hours,
            issuer: self.security.issuer.clone(),
            leeway_secs: self.security.token_leeway_secs,
        }
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.connection_url(),
            max_connections: self.database.max_connections,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout)
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.server.api_host, self.server.api_port)
    }
}
