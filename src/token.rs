//! Manage json web tokens.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::account::Role;

const DEFAULT_AUDIENCE: &str = "newsfeed";
/// 60 minutes.
pub const DEFAULT_TTL_SECONDS: i64 = 60 * 60;
/// One year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Tampered, malformed, expired or foreign token.
    #[error("invalid token")]
    Invalid,
    #[error("token signing secret must not be empty")]
    EmptySecret,
    #[error("token lifetime must be between 1 and {MAX_TTL_MINUTES} minutes, got {0}")]
    Lifetime(i64),
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID.
    pub sub: String,
    pub role: Role,
    /// Identifies the time at which the JWT was issued.
    pub iat: i64,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: i64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Recipients that the JWT is intended for.
    pub aud: String,
}

/// Issue and verify access tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    ttl: i64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] signing with HMAC-SHA256.
    pub fn new(issuer: &str, secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_owned(),
            audience: DEFAULT_AUDIENCE.to_owned(),
            ttl: DEFAULT_TTL_SECONDS,
        })
    }

    /// Set `audience` field on JWT.
    pub fn audience(mut self, audience: &str) -> Self {
        self.audience = audience.to_owned();
        self
    }

    /// Set token lifetime, in seconds.
    pub fn ttl(mut self, seconds: i64) -> Self {
        self.ttl = seconds;
        self
    }

    /// Set token lifetime from configuration, in minutes.
    pub fn ttl_minutes(self, minutes: i64) -> Result<Self, TokenError> {
        if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
            return Err(TokenError::Lifetime(minutes));
        }

        Ok(self.ttl(minutes * 60))
    }

    /// Token lifetime, in seconds.
    pub fn expires_in(&self) -> i64 {
        self.ttl
    }

    /// Create a new signed token for `account_id`.
    pub fn issue(&self, account_id: &str, role: Role) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id.to_owned(),
            role,
            iat: now,
            exp: now + self.ttl,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Decode and check a token.
    ///
    /// Every failure collapses into [`TokenError::Invalid`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected access token");
                TokenError::Invalid
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f2b6c0e4d9a1f3b7c5e2a9d0b4f6e1c";

    fn manager() -> TokenManager {
        TokenManager::new("https://feed.example.com/", SECRET).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = manager();
        let token = tokens.issue("account-1", Role::Admin).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "account-1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, DEFAULT_TTL_SECONDS);
        assert_eq!(claims.iss, "https://feed.example.com/");
    }

    #[test]
    fn test_tampered_token() {
        let tokens = manager();
        let token = tokens.issue("account-1", Role::User).unwrap();

        let other = tokens.issue("account-2", Role::Admin).unwrap();
        let (header, rest) = token.split_once('.').unwrap();
        let (_, signature) = rest.split_once('.').unwrap();
        let other_payload = other.split('.').nth(1).unwrap();

        // Signature covers the payload.
        let forged = format!("{header}.{other_payload}.{signature}");
        assert!(matches!(tokens.verify(&forged), Err(TokenError::Invalid)));

        assert!(matches!(tokens.verify("not.a.jwt"), Err(TokenError::Invalid)));
        assert!(matches!(tokens.verify(""), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_foreign_secret() {
        let token = TokenManager::new("https://feed.example.com/", "another secret")
            .unwrap()
            .issue("account-1", Role::User)
            .unwrap();

        assert!(matches!(manager().verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_wrong_audience() {
        let token = manager()
            .audience("other-service")
            .issue("account-1", Role::User)
            .unwrap();

        assert!(matches!(manager().verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_expired_token() {
        let tokens = manager().ttl(-120);
        let token = tokens.issue("account-1", Role::User).unwrap();

        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_empty_secret() {
        assert!(matches!(
            TokenManager::new("https://feed.example.com/", ""),
            Err(TokenError::EmptySecret)
        ));
    }

    #[test]
    fn test_ttl_minutes() {
        let tokens = manager().ttl_minutes(15).unwrap();
        assert_eq!(tokens.expires_in(), 15 * 60);

        for minutes in [0, -5, MAX_TTL_MINUTES + 1, i64::MAX] {
            assert!(matches!(
                manager().ttl_minutes(minutes),
                Err(TokenError::Lifetime(m)) if m == minutes
            ));
        }
    }
}
