//! Identity module: registration, login and request authorization
//!
//! [`AuthService`] orchestrates the register/login use-cases;
//! [`AuthorizationGate`] validates bearer tokens for protected operations.

pub mod gate;
pub mod service;

pub use gate::{AuthorizationGate, Identity};
pub use service::{AuthService, Registration, Session};
