//! Account identity and lifecycle.

mod builder;
mod clock;
mod error;
mod memory;
mod postgres;
mod repository;
mod service;

pub use builder::*;
pub use clock::*;
pub use error::*;
pub use memory::*;
pub use postgres::*;
pub use repository::*;
pub use service::*;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static PHC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\$([a-z0-9-]{1,32})(?:\$v=(\d+))?(?:\$([^$]+))?\$([^$]+)\$([^$]+)$",
    )
    .unwrap()
});

/// Lifecycle status of an [`Account`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Active,
    /// Terminal. No transition leaves this state.
    Withdrawn,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Withdrawn => "WITHDRAWN",
        }
    }
}

impl FromStr for Status {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Status::Active),
            "WITHDRAWN" => Ok(Status::Withdrawn),
            other => Err(StoreError::Corrupted(format!("unknown status `{other}`"))),
        }
    }
}

/// Role claim carried by access tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(StoreError::Corrupted(format!("unknown role `{other}`"))),
        }
    }
}

/// Value object of a valid login identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoginId(String);

impl LoginId {
    /// Minimum login identifier length.
    pub const MIN_LENGTH: usize = 2;
    /// Maximum login identifier length.
    pub const MAX_LENGTH: usize = 64;

    /// Converts a string into a valid [`LoginId`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the trimmed value is not between 2 and 64 characters
    /// or contains anything else than ASCII alphanumerics and `_`.
    pub fn parse(id: impl AsRef<str>) -> Result<Self> {
        let trimmed = id.as_ref().trim();

        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&trimmed.len()) {
            return Err(AccountError::validation(
                "userId",
                format!(
                    "login id must be between {} and {} characters",
                    Self::MIN_LENGTH,
                    Self::MAX_LENGTH
                ),
            ));
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AccountError::validation(
                "userId",
                "login id must be alphanumeric",
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A hashed password in PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Converts a string into a [`PasswordHash`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the string is not in PHC format. A raw password is
    /// never accepted here.
    pub fn parse(phc_string: impl Into<String>) -> Result<Self> {
        let phc = phc_string.into();
        if !PHC_RE.is_match(&phc) {
            return Err(AccountError::validation(
                "password",
                "password hash must be a PHC string",
            ));
        }

        Ok(Self(phc))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("phc_string", &"[REDACTED]")
            .finish()
    }
}

/// Account as owned by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: String,
    pub login_id: LoginId,
    pub password: PasswordHash,
    pub display_name: String,
    pub email: String,
    pub comment: Option<String>,
    /// Digest of the refresh token handed out on last authentication.
    pub refresh_token: Option<String>,
    pub role: Role,
    pub status: Status,
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Store revision, checked on every update.
    pub version: i64,
}

impl Account {
    /// Create a new [`AccountBuilder`].
    pub fn builder() -> AccountBuilder<Missing, Missing> {
        AccountBuilder::new()
    }

    #[inline]
    pub fn is_withdrawn(&self) -> bool {
        self.status == Status::Withdrawn
    }

    /// Gate every operation on an active account.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_withdrawn() {
            return Err(AccountError::AlreadyWithdrawn);
        }
        Ok(())
    }

    /// Public snapshot, without credentials.
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id.clone(),
            user_id: self.login_id.to_string(),
            name: self.display_name.clone(),
            email: self.email.clone(),
            comment: self.comment.clone(),
            role: self.role,
            status: self.status,
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

/// Account data safe to expose to the account owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub comment: Option<String>,
    pub role: Role,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}
