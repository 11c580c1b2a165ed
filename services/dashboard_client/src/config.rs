//! services/dashboard_client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_IDENTITY_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
const DEFAULT_SESSION_FILE: &str = "./.dashboard/session.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

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
    pub api_url: reqwest::Url,
    pub identity_token_url: reqwest::Url,
    pub identity_api_key: Option<String>,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
    pub log_level: Level,
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
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        // --- Endpoints ---
        let api_url = parse_url(
            "DASHBOARD_API_URL",
            var("DASHBOARD_API_URL").as_deref().unwrap_or(DEFAULT_API_URL),
        )?;
        let identity_token_url = parse_url(
            "IDENTITY_TOKEN_URL",
            var("IDENTITY_TOKEN_URL")
                .as_deref()
                .unwrap_or(DEFAULT_IDENTITY_TOKEN_URL),
        )?;
        let identity_api_key = var("IDENTITY_API_KEY");

        // --- Local Storage and Transport ---
        let session_file = var("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));

        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "REQUEST_TIMEOUT_SECS".to_string(),
                        format!("'{raw}' is not a whole number of seconds"),
                    )
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue(
                        "REQUEST_TIMEOUT_SECS".to_string(),
                        "must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
        };

        // --- Logging ---
        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_url,
            identity_token_url,
            identity_api_key,
            session_file,
            request_timeout,
            log_level,
        })
    }

    /// The identity-provider API key, required for anything that refreshes tokens.
    pub fn require_identity_api_key(&self) -> Result<&str, ConfigError> {
        self.identity_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("IDENTITY_API_KEY".to_string()))
    }
}

fn parse_url(name: &str, raw: &str) -> Result<reqwest::Url, ConfigError> {
    reqwest::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
