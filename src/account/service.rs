//! Account lifecycle.
//!
//! ```text
//! [none] --signup--> ACTIVE --withdraw--> WITHDRAWN
//! ```
//!
//! Every mutation is a single compare-and-swap on the account record. When
//! another writer wins the race, the whole operation is replayed against the
//! fresh record, so checks always run on the state that gets overwritten.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::spawn_blocking;
use zeroize::Zeroizing;

use crate::account::{
    Account, AccountError, AccountRepository, Clock, LoginId, PasswordHash, Result, Status,
    StoreError,
};
use crate::crypto::{self, Crypto, CryptoError};
use crate::token::TokenManager;

pub const TOKEN_TYPE: &str = "Bearer";
const MAX_ATTEMPTS: usize = 3;

/// Signup input.
#[derive(Clone, Default)]
pub struct NewAccount {
    pub login_id: String,
    pub password: String,
    pub display_name: String,
    pub email: String,
    pub comment: Option<String>,
}

/// Partial profile update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub comment: Option<String>,
}

/// Tokens handed out on successful authentication.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub account_id: String,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Account lifecycle engine.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    crypto: Arc<Crypto>,
    token: TokenManager,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(
        repo: Arc<dyn AccountRepository>,
        crypto: Arc<Crypto>,
        token: TokenManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            crypto,
            token,
            clock,
        }
    }

    /// Register a new active account.
    pub async fn signup(&self, new: NewAccount) -> Result<Account> {
        let result = self.try_signup(new).await;
        observe("signup", &result);
        result
    }

    /// Check credentials and open a session.
    pub async fn authenticate(&self, login_id: &str, password: &str) -> Result<Session> {
        let result = self.try_authenticate(login_id, password).await;
        observe("authenticate", &result);
        result
    }

    /// Rotate the password of `account_id`.
    pub async fn change_password(
        &self,
        account_id: &str,
        before_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let result = self
            .try_change_password(account_id, before_password, new_password)
            .await;
        observe("change_password", &result);
        result
    }

    /// Withdraw an account. There is no way back.
    pub async fn withdraw(&self, login_id: &str, password: &str) -> Result<()> {
        let result = self.try_withdraw(login_id, password).await;
        observe("withdraw", &result);
        result
    }

    /// Apply the provided profile fields.
    pub async fn update_profile(&self, account_id: &str, update: ProfileUpdate) -> Result<Account> {
        let result = self.try_update_profile(account_id, update).await;
        observe("update_profile", &result);
        result
    }

    /// Read an active account.
    pub async fn profile(&self, account_id: &str) -> Result<Account> {
        let result = self.active_by_id(account_id).await;
        observe("profile", &result);
        result
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh(&self, account_id: &str, refresh_token: &str) -> Result<Session> {
        let result = self.try_refresh(account_id, refresh_token).await;
        observe("refresh", &result);
        result
    }

    async fn try_signup(&self, new: NewAccount) -> Result<Account> {
        let login_id = LoginId::parse(&new.login_id)?;

        if self
            .repo
            .find_by_login_id(login_id.as_str())
            .await?
            .is_some()
        {
            return Err(AccountError::DuplicateAccount);
        }

        let password = self.hash_password(&new.password).await?;
        let account = Account::builder()
            .login_id(login_id)
            .password(password)
            .display_name(new.display_name)
            .email(new.email)
            .comment(new.comment)
            .build(self.clock.now());

        match self.repo.create(&account).await {
            Ok(()) => {
                tracing::info!(account_id = %account.id, login_id = %account.login_id, "account created");
                Ok(account)
            },
            // Lost a race against another signup with the same login id.
            Err(StoreError::Conflict(_)) => Err(AccountError::DuplicateAccount),
            Err(err) => Err(err.into()),
        }
    }

    async fn try_authenticate(&self, login_id: &str, password: &str) -> Result<Session> {
        for _ in 0..MAX_ATTEMPTS {
            let mut account = self.active_by_login_id(login_id).await?;

            if !self.verify_password(password, &account.password).await? {
                return Err(AccountError::CredentialMismatch);
            }

            let refresh_token = crypto::generate_token();
            account.refresh_token = Some(self.crypto.hasher.digest(&refresh_token));

            if self.repo.update(&account).await? {
                tracing::info!(account_id = %account.id, "authentication successful");
                return self.open_session(&account, refresh_token);
            }
            conflict(&account);
        }

        Err(self.contention(login_id))
    }

    async fn try_change_password(
        &self,
        account_id: &str,
        before_password: &str,
        new_password: &str,
    ) -> Result<()> {
        for _ in 0..MAX_ATTEMPTS {
            let mut account = self.active_by_id(account_id).await?;

            if !self
                .verify_password(before_password, &account.password)
                .await?
            {
                return Err(AccountError::InvalidPassword);
            }

            account.password = self.hash_password(new_password).await?;
            account.modified_at = self.clock.now();

            if self.repo.update(&account).await? {
                tracing::info!(account_id = %account.id, "password changed");
                return Ok(());
            }
            conflict(&account);
        }

        Err(self.contention(account_id))
    }

    async fn try_withdraw(&self, login_id: &str, password: &str) -> Result<()> {
        for _ in 0..MAX_ATTEMPTS {
            let mut account = self.active_by_login_id(login_id).await?;

            if !self.verify_password(password, &account.password).await? {
                return Err(AccountError::CredentialMismatch);
            }

            let now = self.clock.now();
            account.status = Status::Withdrawn;
            account.status_changed_at = now;
            account.modified_at = now;
            account.refresh_token = None;

            if self.repo.update(&account).await? {
                tracing::info!(account_id = %account.id, "account withdrawn");
                return Ok(());
            }
            conflict(&account);
        }

        Err(self.contention(login_id))
    }

    async fn try_update_profile(&self, account_id: &str, update: ProfileUpdate) -> Result<Account> {
        for _ in 0..MAX_ATTEMPTS {
            let mut account = self.active_by_id(account_id).await?;
            let mut changed = false;

            if let Some(name) = &update.display_name {
                if *name != account.display_name {
                    account.display_name = name.clone();
                    changed = true;
                }
            }

            if let Some(comment) = &update.comment {
                if account.comment.as_ref() != Some(comment) {
                    account.comment = Some(comment.clone());
                    changed = true;
                }
            }

            if !changed {
                return Ok(account);
            }

            account.modified_at = self.clock.now();

            if self.repo.update(&account).await? {
                tracing::info!(account_id = %account.id, "profile updated");
                account.version += 1;
                return Ok(account);
            }
            conflict(&account);
        }

        Err(self.contention(account_id))
    }

    async fn try_refresh(&self, account_id: &str, refresh_token: &str) -> Result<Session> {
        let presented = self.crypto.hasher.digest(refresh_token);

        for _ in 0..MAX_ATTEMPTS {
            let mut account = self.active_by_id(account_id).await?;

            if account.refresh_token.as_deref() != Some(presented.as_str()) {
                return Err(AccountError::InvalidRefreshToken);
            }

            let refresh_token = crypto::generate_token();
            account.refresh_token = Some(self.crypto.hasher.digest(&refresh_token));

            if self.repo.update(&account).await? {
                tracing::info!(account_id = %account.id, "session refreshed");
                return self.open_session(&account, refresh_token);
            }
            conflict(&account);
        }

        Err(self.contention(account_id))
    }

    /// Not-found is checked before the withdrawn gate.
    async fn active_by_login_id(&self, login_id: &str) -> Result<Account> {
        let account = self
            .repo
            .find_by_login_id(login_id.trim())
            .await?
            .ok_or(AccountError::AccountNotFound)?;
        account.ensure_active()?;
        Ok(account)
    }

    async fn active_by_id(&self, account_id: &str) -> Result<Account> {
        let account = self
            .repo
            .find_by_id(account_id)
            .await?
            .ok_or(AccountError::AccountNotFound)?;
        account.ensure_active()?;
        Ok(account)
    }

    /// Argon2 runs on the blocking pool so it never stalls a runtime worker.
    async fn hash_password(&self, password: &str) -> Result<PasswordHash> {
        let crypto = Arc::clone(&self.crypto);
        let password = Zeroizing::new(password.to_owned());

        let hash = spawn_blocking(move || crypto.pwd.hash_password(password.as_bytes()))
            .await
            .map_err(CryptoError::from)??;
        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: &PasswordHash) -> Result<bool> {
        let crypto = Arc::clone(&self.crypto);
        let password = Zeroizing::new(password.to_owned());
        let hash = hash.clone();

        let matched = spawn_blocking(move || crypto.pwd.verify_password(password.as_bytes(), &hash))
            .await
            .map_err(CryptoError::from)?;
        Ok(matched)
    }

    fn open_session(&self, account: &Account, refresh_token: String) -> Result<Session> {
        Ok(Session {
            account_id: account.id.clone(),
            token_type: TOKEN_TYPE.to_owned(),
            access_token: self.token.issue(&account.id, account.role)?,
            refresh_token,
            expires_in: self.token.expires_in(),
        })
    }

    fn contention(&self, id: &str) -> AccountError {
        tracing::error!(%id, attempts = MAX_ATTEMPTS, "gave up on a contended account");
        AccountError::Contention {
            id: id.to_owned(),
            attempts: MAX_ATTEMPTS,
        }
    }
}

fn conflict(account: &Account) {
    tracing::debug!(account_id = %account.id, version = account.version, "concurrent update, replaying");
}

fn observe<T>(operation: &'static str, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => {
            let kind = err.kind();
            if kind.is_client_error() {
                tracing::info!(operation, code = kind.code(), "account operation refused");
            } else {
                tracing::error!(operation, error = %err, "account operation failed");
            }
            kind.code()
        },
    };

    metrics::counter!("account_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}
