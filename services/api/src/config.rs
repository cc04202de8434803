//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Directory holding the JSON collections (`users.json`, `quizzes.json`,
    /// `attempts_<userId>.json`).
    pub data_path: PathBuf,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub tutor_model: String,
    /// Upper bound on the wait for each streamed increment. `None` disables
    /// the bound and a stalled provider is waited on indefinitely.
    pub reply_timeout: Option<Duration>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let data_path = std::env::var("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        let tutor_model =
            std::env::var("TUTOR_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let reply_timeout_str =
            std::env::var("REPLY_TIMEOUT_SECS").unwrap_or_else(|_| "120".to_string());
        let reply_timeout_secs = reply_timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "REPLY_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a number of seconds", reply_timeout_str),
            )
        })?;
        let reply_timeout = if reply_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(reply_timeout_secs))
        };

        Ok(Self {
            bind_address,
            data_path,
            log_level,
            openai_api_key,
            tutor_model,
            reply_timeout,
        })
    }
}
