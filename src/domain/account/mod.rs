//! Account aggregate
//!
//! Contains the Account entity, its creation DTO, and the credential store
//! interface.

pub mod model;
pub mod repository;

mod dto_create;

pub use dto_create::NewAccount;
pub use model::{Account, AccountId, HashedSecret, Role};
pub use repository::AccountStore;
