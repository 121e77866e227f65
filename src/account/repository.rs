//! Account store port.

use async_trait::async_trait;

use crate::account::Account;

/// Failures of an account store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("login id `{0}` is already registered")]
    Conflict(String),
    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("corrupted account record: {0}")]
    Corrupted(String),
}

/// Port for account persistence.
///
/// Accounts are never physically deleted through this port.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by its login identifier, withdrawn ones included.
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Account>, StoreError>;

    /// Find an account by its opaque identifier.
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a new account.
    ///
    /// Fails with [`StoreError::Conflict`] if the login id is taken.
    async fn create(&self, account: &Account) -> Result<(), StoreError>;

    /// Compare-and-swap update.
    ///
    /// Writes `account` only if the stored version still equals
    /// `account.version`, then bumps the stored version. Returns `false`
    /// when another writer got there first.
    async fn update(&self, account: &Account) -> Result<bool, StoreError>;
}
