//! services/dashboard_client/src/error.rs
//!
//! Defines the primary error type for the dashboard client service.

use crate::config::ConfigError;
use task_dashboard_core::ports::PortError;
use task_dashboard_core::request::ApiError;

/// The primary error type for the `dashboard_client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A backend call failed after the request client exhausted its options.
    #[error("API Error: {0}")]
    Api(#[from] ApiError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., writing to stdout).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input given on the command line.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
