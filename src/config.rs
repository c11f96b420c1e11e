//! Configuration manager for vibecheck.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const SECRET_KEY_VAR: &str = "SECRET_KEY";
const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing `{SECRET_KEY_VAR}` environnement variable")]
    MissingSecret,
    #[error(
        "`{SECRET_KEY_VAR}` must be at least {MIN_SECRET_LENGTH} bytes outside development mode"
    )]
    WeakSecret,
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Public base URL of current instance.
    pub url: String,
    /// Relaxes the signing-secret policy. Never enable in production.
    #[serde(default)]
    pub development: bool,
    /// Directory served under `/static` and used for avatar uploads.
    pub static_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) version: String,
    #[serde(skip)]
    pub(crate) path: PathBuf,
    /// Related to bearer token configuration.
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
    /// Memory used while hashing.
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

/// Bearer token configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Token lifetime in seconds.
    /// Default is 7 days.
    pub ttl_seconds: Option<u64>,
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

    /// Token-signing secret, sourced from the environment.
    ///
    /// There is no compiled-in default: startup must fail when the secret is
    /// absent, and a short secret is only tolerated in development mode.
    pub fn signing_secret(&self) -> Result<String, ConfigError> {
        let secret = std::env::var(SECRET_KEY_VAR)
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        if !self.development && secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::WeakSecret);
        }

        Ok(secret)
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

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, ConfigError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
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

                // normalize public URL.
                config.url = self.normalize_url(&config.url)?;

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_config(development: bool) -> Configuration {
        Configuration {
            development,
            ..Default::default()
        }
    }

    #[test]
    fn test_secret_is_mandatory() {
        // Serialized env access: both cases in one test.
        unsafe { std::env::remove_var(SECRET_KEY_VAR) };
        assert!(matches!(
            dev_config(false).signing_secret(),
            Err(ConfigError::MissingSecret)
        ));
        assert!(matches!(
            dev_config(true).signing_secret(),
            Err(ConfigError::MissingSecret)
        ));

        unsafe { std::env::set_var(SECRET_KEY_VAR, "short") };
        assert!(matches!(
            dev_config(false).signing_secret(),
            Err(ConfigError::WeakSecret)
        ));
        // Development mode tolerates a short secret.
        assert_eq!(dev_config(true).signing_secret().unwrap(), "short");

        unsafe {
            std::env::set_var(SECRET_KEY_VAR, "0123456789abcdef0123456789abcdef")
        };
        assert!(dev_config(false).signing_secret().is_ok());

        unsafe { std::env::remove_var(SECRET_KEY_VAR) };
    }

    #[test]
    fn test_normalize_url() {
        let config = Configuration::default();
        assert_eq!(
            config.normalize_url("vibecheck.example.org").unwrap(),
            "https://vibecheck.example.org/"
        );
        assert_eq!(
            config.normalize_url("http://localhost:8000").unwrap(),
            "http://localhost:8000/"
        );
    }
}
