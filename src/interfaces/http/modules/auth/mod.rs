//! Authentication module: register, login, current account

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
