//! crates/task_dashboard_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture: the request
//! client and the session layer only ever talk to storage, the identity
//! provider and the network through them.

use async_trait::async_trait;
use std::fmt;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., file system, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// The request never produced a response (connect, TLS, timeout, body read).
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Wire-level Request and Response
//=========================================================================================

/// HTTP methods the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Read-only methods never carry a request body.
    pub fn is_read_only(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully prepared request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    /// Path relative to the configured base URL, e.g. `/projects`.
    pub path: String,
    pub bearer: String,
    /// Serialized JSON body. `Some` implies a JSON content type.
    pub body: Option<String>,
}

/// The status and raw text body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable string key/value storage whose lifetime spans the client session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortResult<()>;
    fn remove(&self, key: &str) -> PortResult<()>;
    /// Removes every key.
    fn clear(&self) -> PortResult<()>;
}

/// Holds the current bearer token.
pub trait CredentialStore: Send + Sync {
    fn get_token(&self) -> PortResult<Option<String>>;
    fn set_token(&self, token: &str) -> PortResult<()>;
    fn clear_token(&self) -> PortResult<()>;
}

/// Wraps the external identity provider.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The cached token, possibly stale. Cheap.
    async fn current_token(&self) -> PortResult<Option<String>>;

    /// Asks the identity provider for a fresh token and persists it.
    /// Returns `Ok(None)` when no session exists at the provider.
    async fn refresh_token(&self, force_refresh: bool) -> PortResult<Option<String>>;
}

/// Executes a single HTTP exchange against the backend.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// An `Err` means no response was received at all.
    async fn execute(&self, request: &OutboundRequest) -> PortResult<HttpResponse>;
}

/// Receives the "clear session and return to the entry surface" signal.
pub trait SignOutHandler: Send + Sync {
    fn on_forced_sign_out(&self, reason: &str);
}
