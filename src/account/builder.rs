//! Typed builder for Account.

use chrono::{DateTime, Utc};

use crate::account::{Account, LoginId, PasswordHash, Role, Status};

/// Value is missing on [`AccountBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`AccountBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

/// [`Account`] builder tracking presence of login id and password hash.
#[derive(Debug, Clone)]
pub struct AccountBuilder<Id, Pwd> {
    login_id: Id,
    password: Pwd,
    display_name: String,
    email: String,
    comment: Option<String>,
}

impl AccountBuilder<Missing, Missing> {
    /// Create a new [`AccountBuilder`].
    pub fn new() -> Self {
        Self {
            login_id: Missing,
            password: Missing,
            display_name: String::default(),
            email: String::default(),
            comment: None,
        }
    }
}

impl Default for AccountBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Pwd> AccountBuilder<Missing, Pwd> {
    /// Set the validated login identifier.
    pub fn login_id(self, login_id: LoginId) -> AccountBuilder<Present<LoginId>, Pwd> {
        AccountBuilder {
            login_id: Present(login_id),
            password: self.password,
            display_name: self.display_name,
            email: self.email,
            comment: self.comment,
        }
    }
}

impl<Id> AccountBuilder<Id, Missing> {
    /// Set the hashed password.
    pub fn password(
        self,
        password: PasswordHash,
    ) -> AccountBuilder<Id, Present<PasswordHash>> {
        AccountBuilder {
            login_id: self.login_id,
            password: Present(password),
            display_name: self.display_name,
            email: self.email,
            comment: self.comment,
        }
    }
}

impl<Id, Pwd> AccountBuilder<Id, Pwd> {
    /// Update `display_name` field on [`AccountBuilder`].
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Update `email` field on [`AccountBuilder`].
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Update `comment` field on [`AccountBuilder`].
    pub fn comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }
}

impl AccountBuilder<Present<LoginId>, Present<PasswordHash>> {
    /// Build an active [`Account`] created at `now`.
    ///
    /// New accounts are always plain users. Admins are promoted in the store.
    pub fn build(self, now: DateTime<Utc>) -> Account {
        let AccountBuilder {
            login_id: Present(login_id),
            password: Present(password),
            display_name,
            email,
            comment,
        } = self;

        Account {
            id: uuid::Uuid::new_v4().to_string(),
            login_id,
            password,
            display_name,
            email,
            comment,
            refresh_token: None,
            role: Role::User,
            status: Status::Active,
            status_changed_at: now,
            created_at: now,
            modified_at: now,
            version: 0,
        }
    }
}
