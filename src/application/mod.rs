pub mod identity;

pub use identity::{AuthService, AuthorizationGate, Identity, Registration, Session};
