//! Configuration manager for Newsfeed.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance.
    pub url: String,
    /// Listening port.
    #[serde(skip_serializing)]
    pub port: Option<u16>,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing, in KiB.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Json Web Token configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// HMAC secret. `TOKEN_SECRET` environment variable takes precedence.
    pub secret: Option<String>,
    /// Access token lifetime.
    /// Default is 60 minutes.
    pub ttl_minutes: Option<i64>,
    /// Update token audience.
    /// Default is `newsfeed`.
    pub audience: Option<String>,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Port the server listens on.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path, the
    /// `CONFIG_PATH` environment variable or the default location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            PathBuf::from(path)
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(&file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(Arc::new(self.error(err)));
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();
                config.path = file_path;

                if !config.url.is_empty() {
                    config.url = self.normalize_url(&config.url)?;
                }

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "newsfeed-{name}-{}.yaml",
            uuid::Uuid::new_v4()
        ));
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_config() {
        let path = write_config(
            "full",
            r#"
name: Newsfeed
url: feed.example.com
port: 9000
token:
  ttl_minutes: 15
  audience: mobile
postgres:
  address: localhost:5432
  pool_size: 4
argon2:
  memory_cost: 1024
  iterations: 1
  parallelism: 1
  hash_length: 32
"#,
        );

        let config = Configuration::default().path(path.clone()).read().unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(config.name, "Newsfeed");
        assert_eq!(config.url, "https://feed.example.com/");
        assert_eq!(config.port(), 9000);
        assert_eq!(config.version, VERSION);

        let token = config.token.clone().unwrap();
        assert_eq!(token.ttl_minutes, Some(15));
        assert_eq!(token.audience.as_deref(), Some("mobile"));
        assert!(token.secret.is_none());

        let postgres = config.postgres.clone().unwrap();
        assert_eq!(postgres.address, "localhost:5432");
        assert_eq!(postgres.pool_size, Some(4));
        assert_eq!(config.argon2.clone().unwrap().memory_cost, 1024);
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let path = write_config("invalid", "name: [unterminated");

        let config = Configuration::default().path(path.clone()).read().unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(config.name, "");
        assert_eq!(config.port(), DEFAULT_PORT);
        assert!(config.postgres.is_none());
        assert_eq!(config.version, VERSION);
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let config = Configuration {
            name: "Newsfeed".into(),
            token: Some(Token {
                secret: Some("hunter2".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("Newsfeed"));
    }
}
