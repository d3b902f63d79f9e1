use super::{HashedSecret, Role};

/// Everything the store needs to persist a new account.
///
/// The password is already hashed by the time it reaches the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: HashedSecret,
    pub role: Role,
}
