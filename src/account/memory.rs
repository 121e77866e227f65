//! In-memory account store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::account::{Account, AccountRepository, StoreError};

/// Account store keeping every record in process memory.
///
/// Used when no PostgreSQL instance is configured, and by tests.
#[derive(Clone, Default)]
pub struct MemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl MemoryAccountRepository {
    /// Create a new, empty [`MemoryAccountRepository`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts, withdrawn ones included.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.login_id.as_str() == login_id)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;

        if accounts
            .values()
            .any(|stored| stored.login_id == account.login_id)
        {
            return Err(StoreError::Conflict(account.login_id.to_string()));
        }

        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;

        match accounts.get_mut(&account.id) {
            Some(stored) if stored.version == account.version => {
                *stored = Account {
                    version: account.version + 1,
                    ..account.clone()
                };
                Ok(true)
            },
            _ => Ok(false),
        }
    }
}
