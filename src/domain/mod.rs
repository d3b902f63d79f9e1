pub mod account;

pub use account::{Account, AccountId, AccountStore, HashedSecret, NewAccount, Role};
