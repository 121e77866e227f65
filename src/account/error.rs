//! Account failures and their stable kinds.

use crate::account::StoreError;
use crate::crypto::CryptoError;
use crate::token::TokenError;

pub type Result<T> = std::result::Result<T, AccountError>;

/// Failures surfaced by account operations.
///
/// The first group is expected and recoverable by the caller. `Store`,
/// `Crypto`, `Token` and `Contention` are infrastructure faults.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("duplicate user exists")]
    DuplicateAccount,
    #[error("user not found")]
    AccountNotFound,
    #[error("login id and password do not match")]
    CredentialMismatch,
    #[error("user already withdrawn")]
    AlreadyWithdrawn,
    #[error("passwords do not match")]
    InvalidPassword,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("account {id} changed concurrently {attempts} times in a row")]
    Contention { id: String, attempts: usize },
}

impl AccountError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable kind of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::DuplicateAccount => ErrorKind::DuplicateAccount,
            AccountError::AccountNotFound => ErrorKind::AccountNotFound,
            AccountError::CredentialMismatch => ErrorKind::CredentialMismatch,
            AccountError::AlreadyWithdrawn => ErrorKind::AlreadyWithdrawn,
            AccountError::InvalidPassword => ErrorKind::InvalidPassword,
            AccountError::InvalidRefreshToken => ErrorKind::InvalidRefreshToken,
            AccountError::Validation { .. } => ErrorKind::Validation,
            AccountError::Store(_)
            | AccountError::Crypto(_)
            | AccountError::Token(_)
            | AccountError::Contention { .. } => ErrorKind::Internal,
        }
    }
}

/// Machine readable class of an [`AccountError`].
///
/// Codes and classes must not change between releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    DuplicateAccount,
    AccountNotFound,
    CredentialMismatch,
    AlreadyWithdrawn,
    InvalidPassword,
    InvalidRefreshToken,
    Validation,
    Internal,
}

impl ErrorKind {
    /// Stable identifier, used in logs and metrics labels.
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateAccount => "DUPLICATE_ACCOUNT",
            ErrorKind::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorKind::CredentialMismatch => "CREDENTIAL_MISMATCH",
            ErrorKind::AlreadyWithdrawn => "ALREADY_WITHDRAWN",
            ErrorKind::InvalidPassword => "INVALID_PASSWORD",
            ErrorKind::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// `errorCode` value of the response body.
    ///
    /// A duplicate account still reports "400" even though it is answered
    /// with an unprocessable status.
    pub const fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::AccountNotFound => "404",
            ErrorKind::InvalidRefreshToken => "401",
            ErrorKind::Internal => "500",
            ErrorKind::DuplicateAccount
            | ErrorKind::CredentialMismatch
            | ErrorKind::AlreadyWithdrawn
            | ErrorKind::InvalidPassword
            | ErrorKind::Validation => "400",
        }
    }

    /// Whether the caller is at fault.
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, ErrorKind::Internal)
    }
}
