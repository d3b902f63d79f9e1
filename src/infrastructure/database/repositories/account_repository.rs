use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};

use crate::domain::{Account, AccountId, AccountStore, HashedSecret, NewAccount, Role};
use crate::infrastructure::database::entities::account;
use crate::shared::StoreError;

/// SeaORM-backed credential store.
///
/// The `accounts` table carries UNIQUE constraints on `username` and
/// `email`; those constraints, not the advisory [`AccountStore::is_taken`]
/// check, are what keep concurrent registrations from duplicating rows,
/// across processes as well as tasks.
#[derive(Clone)]
pub struct SeaOrmAccountStore {
    db: DatabaseConnection,
}

impl SeaOrmAccountStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn account_model_to_domain(model: account::Model) -> Account {
    Account {
        id: AccountId::from(model.id),
        username: model.username,
        email: model.email,
        password_hash: HashedSecret::from_stored(model.password_hash),
        role: Role::from(model.is_admin),
        created_at: model.created_at,
    }
}

fn insert_err(e: DbErr) -> StoreError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Conflict,
        _ => StoreError::Backend(e),
    }
}

// ── Store implementation ────────────────────────────────────────

#[async_trait]
impl AccountStore for SeaOrmAccountStore {
    async fn create_account(&self, new_account: NewAccount) -> Result<AccountId, StoreError> {
        let id = AccountId::generate();

        let row = account::ActiveModel {
            id: Set(*id.as_uuid()),
            username: Set(new_account.username),
            email: Set(new_account.email),
            password_hash: Set(new_account.password_hash.into_inner()),
            is_admin: Set(new_account.role.is_admin()),
            created_at: Set(Utc::now()),
        };

        // A single INSERT: either the whole row lands or nothing does.
        account::Entity::insert(row)
            .exec_without_returning(&self.db)
            .await
            .map_err(insert_err)?;

        Ok(id)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let model = account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await?;

        Ok(model.map(account_model_to_domain))
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        let model = account::Entity::find_by_id(*id.as_uuid())
            .one(&self.db)
            .await?;

        Ok(model.map(account_model_to_domain))
    }

    async fn is_taken(&self, username: &str, email: &str) -> Result<bool, StoreError> {
        let count = account::Entity::find()
            .filter(
                account::Column::Username
                    .eq(username)
                    .or(account::Column::Email.eq(email)),
            )
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}
