//! # authgate
//!
//! Credential registration, password login and bearer-token authorization.
//!
//! ## Architecture
//!
//! - **domain**: accounts, roles and the credential store port
//! - **application**: registration/login workflow and the authorization gate
//! - **infrastructure**: bcrypt hashing, JWT signing, SeaORM storage
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: error taxonomy and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use application::{AuthService, AuthorizationGate, Identity, Registration, Session};
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmAccountStore};
pub use interfaces::create_api_router;
pub use shared::{AuthError, Rejection};
