use async_trait::async_trait;

use super::{Account, AccountId, NewAccount};
use crate::shared::StoreError;

/// Credential store.
///
/// Uniqueness of username and email is enforced by the backing storage
/// itself: `create_account` must report a uniqueness violation as
/// [`StoreError::Conflict`] even when a concurrent writer slipped in after
/// an advisory [`AccountStore::is_taken`] check.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_account(&self, account: NewAccount) -> Result<AccountId, StoreError>;

    /// Exact-match lookup. `Ok(None)` is a normal outcome.
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Advisory pre-insert check for an existing username or email.
    async fn is_taken(&self, username: &str, email: &str) -> Result<bool, StoreError>;
}
