//! Cryptogragic logics.

use argon2::password_hash::{
    PasswordHash as Phc, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::account::PasswordHash;
use crate::config::Argon2 as ArgonConfig;

/// Refresh tokens are 32 random bytes, hex encoded.
pub const TOKEN_BYTES: usize = 32;
/// Length of a hex encoded refresh token.
pub const TOKEN_LENGTH: usize = TOKEN_BYTES * 2;
/// [`TOKEN_LENGTH`] as expected by `validator` length rules.
pub const TOKEN_LENGTH_RULE: u64 = TOKEN_LENGTH as u64;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("argon2 produced a malformed hash")]
    MalformedHash,
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Cryptographic manager.
pub struct Crypto {
    pub pwd: PasswordManager,
    pub hasher: Hasher,
}

impl Crypto {
    /// Create a new [`Crypto`].
    pub fn new(config: Option<ArgonConfig>, pepper: impl AsRef<[u8]>) -> Result<Self> {
        Ok(Self {
            pwd: PasswordManager::new(config)?,
            hasher: Hasher::new(pepper),
        })
    }
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash password using Argon2id with a fresh random salt.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<PasswordHash> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        PasswordHash::parse(hash.to_string()).map_err(|_| CryptoError::MalformedHash)
    }

    /// Verify password against a PHC.
    ///
    /// A stored hash that cannot be parsed never verifies.
    pub fn verify_password(&self, password: impl AsRef<[u8]>, hash: &PasswordHash) -> bool {
        let Ok(parsed) = Phc::new(hash.as_str()) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };

        self.argon2()
            .verify_password(password.as_ref(), &parsed)
            .is_ok()
    }
}

/// Keyed SHA-256, used to store refresh tokens.
pub struct Hasher(Zeroizing<Vec<u8>>);

impl Hasher {
    /// Create a new [`Hasher`].
    pub fn new(pepper: impl AsRef<[u8]>) -> Self {
        Self(Zeroizing::new(pepper.as_ref().to_vec()))
    }

    /// Digest data into SHA256.
    pub fn digest(&self, data: impl AsRef<[u8]>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.0);
        hasher.update(&data);
        let hash = hasher.finalize();

        hex::encode(hash)
    }
}

/// Generate an opaque session token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
pub(crate) fn fast_config() -> ArgonConfig {
    ArgonConfig {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted() {
        let pwd = PasswordManager::new(Some(fast_config())).unwrap();

        let first = pwd.hash_password("Secr3t!").unwrap();
        let second = pwd.hash_password("Secr3t!").unwrap();

        assert_ne!(first.as_str(), "Secr3t!");
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("$argon2id$v=19$"));
    }

    #[test]
    fn test_verify() {
        let pwd = PasswordManager::new(Some(fast_config())).unwrap();
        let hash = pwd.hash_password("Secr3t!").unwrap();

        assert!(pwd.verify_password("Secr3t!", &hash));
        assert!(!pwd.verify_password("wrong", &hash));
        assert!(!pwd.verify_password("", &hash));
    }

    #[test]
    fn test_verify_with_other_params() {
        // Parameters are read back from the PHC string.
        let strong = PasswordManager::new(Some(ArgonConfig {
            memory_cost: 2048,
            iterations: 2,
            ..fast_config()
        }))
        .unwrap();
        let hash = strong.hash_password("NewPass1").unwrap();

        let weak = PasswordManager::new(Some(fast_config())).unwrap();
        assert!(weak.verify_password("NewPass1", &hash));
    }

    #[test]
    fn test_invalid_params() {
        let config = ArgonConfig {
            parallelism: 0,
            ..fast_config()
        };
        assert!(matches!(
            PasswordManager::new(Some(config)),
            Err(CryptoError::Argon2(_))
        ));
    }

    #[test]
    fn test_sha2() {
        let salt = [0x42; 16];
        let hasher = Hasher::new(salt);

        let plaintext = b"super_secret_data";
        let excepted =
            "ec0797340f6163ddc7398d7eafba6e05a8cb041a3935bbdaef99088917cc8933";

        let hash = hasher.digest(plaintext);
        assert_eq!(hash, excepted)
    }

    #[test]
    fn test_generate_token() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
