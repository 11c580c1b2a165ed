//! crates/task_dashboard_core/src/request.rs
//!
//! The authenticated request client.
//!
//! Every call attaches the current bearer token. A 401/403 on the first attempt
//! triggers exactly one forced credential refresh followed by exactly one retry.
//! When no credential can be obtained the session is cleared and the injected
//! `SignOutHandler` is told to return the user to the entry surface. Callers only
//! ever see an `ApiResult`.

use crate::ports::{
    CredentialProvider, CredentialStore, HttpMethod, HttpResponse, HttpTransport,
    OutboundRequest, SignOutHandler,
};
use crate::session::SessionContext;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

//=========================================================================================
// Request Descriptor
//=========================================================================================

/// What the caller wants to send. Built per call, consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub endpoint: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, endpoint).with_body(body)
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, endpoint).with_body(body)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The body that actually goes on the wire. Read-only methods never send one.
    fn wire_body(&self) -> Option<String> {
        if self.method.is_read_only() {
            return None;
        }
        self.body.as_ref().map(Value::to_string)
    }
}

//=========================================================================================
// Result Contract
//=========================================================================================

/// The flat error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    Unauthenticated,
    Forbidden,
    ServiceError,
    MalformedResponse,
    NetworkError,
}

/// Why a call failed. The request client never fails in any other way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No usable credential; the session has been cleared and sign-out signalled.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),
    /// The credential is valid but lacks permission. The session is kept.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },
    /// The body was not the JSON the caller expected. `raw` holds the text received.
    #[error("Malformed response: {detail}")]
    MalformedResponse { raw: String, detail: String },
    #[error("Network error: {0}")]
    Network(String),
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Unauthenticated(_) => ApiErrorKind::Unauthenticated,
            ApiError::Forbidden(_) => ApiErrorKind::Forbidden,
            ApiError::Service { .. } => ApiErrorKind::ServiceError,
            ApiError::MalformedResponse { .. } => ApiErrorKind::MalformedResponse,
            ApiError::Network(_) => ApiErrorKind::NetworkError,
        }
    }
}

/// `Ok(None)` is a success with an empty body.
pub type ApiResult = Result<Option<Value>, ApiError>;

//=========================================================================================
// State Machine
//=========================================================================================

/// The states a single `send` moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Sending,
    AuthRejected,
    Refreshing,
    Retrying,
    Success,
    Fatal,
}

/// Which attempt a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry,
}

/// What to do with a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The call is finished with this result.
    Complete(ApiResult),
    /// The credential was rejected; refresh and retry.
    AuthRejected,
    /// The refreshed credential was rejected too; sign out.
    CredentialExpired,
}

/// Classifies a response. Pure; the whole retry policy lives here.
pub fn classify(attempt: Attempt, response: &HttpResponse) -> Classification {
    match (response.status, attempt) {
        (401 | 403, Attempt::First) => Classification::AuthRejected,
        (401, Attempt::Retry) => Classification::CredentialExpired,
        (403, Attempt::Retry) => Classification::Complete(Err(ApiError::Forbidden(
            extract_error_message(response.status, &response.body),
        ))),
        (status, _) if status >= 400 => Classification::Complete(Err(ApiError::Service {
            status,
            message: extract_error_message(status, &response.body),
        })),
        _ => Classification::Complete(parse_success_body(&response.body)),
    }
}

fn parse_success_body(body: &str) -> ApiResult {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Value>(body)
        .map(Some)
        .map_err(|e| ApiError::MalformedResponse {
            raw: body.to_string(),
            detail: e.to_string(),
        })
}

/// Pulls a human readable message out of an error body: JSON `message`, then
/// JSON `error`, then the raw text, then the status line.
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(Value::String(message)) = fields.get(key) {
                if !message.trim().is_empty() {
                    return message.clone();
                }
            }
        }
    }
    let text = body.trim();
    if text.is_empty() {
        format!("HTTP {status}")
    } else {
        text.to_string()
    }
}

//=========================================================================================
// The Client
//=========================================================================================

/// Sends authenticated requests. Calls are independent: two calls rejected at the
/// same time each run their own refresh.
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialProvider>,
    session: SessionContext,
    sign_out: Arc<dyn SignOutHandler>,
}

impl RequestClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialProvider>,
        session: SessionContext,
        sign_out: Arc<dyn SignOutHandler>,
    ) -> Self {
        Self {
            transport,
            credentials,
            session,
            sign_out,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Sends one logical call and returns its parsed JSON payload.
    #[tracing::instrument(skip_all, fields(method = %request.method, endpoint = %request.endpoint))]
    pub async fn send(&self, request: &RequestDescriptor) -> ApiResult {
        let mut state = RequestState::Idle;

        let token = match self.credentials.current_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                enter(&mut state, RequestState::Fatal);
                return Err(self.force_sign_out("no credential available"));
            }
            Err(e) => {
                enter(&mut state, RequestState::Fatal);
                return Err(ApiError::Network(format!("credential lookup failed: {e}")));
            }
        };

        enter(&mut state, RequestState::Sending);
        let first = self.execute(request, token).await.inspect_err(|_| {
            enter(&mut state, RequestState::Fatal);
        })?;

        match classify(Attempt::First, &first) {
            Classification::Complete(result) => {
                enter(&mut state, settled(&result));
                return result;
            }
            Classification::AuthRejected | Classification::CredentialExpired => {
                enter(&mut state, RequestState::AuthRejected);
            }
        }

        enter(&mut state, RequestState::Refreshing);
        info!(status = first.status, "credential rejected, refreshing");
        let fresh = match self.credentials.refresh_token(true).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                enter(&mut state, RequestState::Fatal);
                return Err(self.force_sign_out("no authenticated session at the identity provider"));
            }
            Err(e) => {
                enter(&mut state, RequestState::Fatal);
                return Err(ApiError::Network(format!("credential refresh failed: {e}")));
            }
        };
        if let Err(e) = self.session.set_token(&fresh) {
            warn!("failed to persist refreshed credential: {e}");
        }

        enter(&mut state, RequestState::Retrying);
        let retry = self.execute(request, fresh).await.inspect_err(|_| {
            enter(&mut state, RequestState::Fatal);
        })?;

        match classify(Attempt::Retry, &retry) {
            Classification::Complete(result) => {
                enter(&mut state, settled(&result));
                result
            }
            Classification::CredentialExpired | Classification::AuthRejected => {
                enter(&mut state, RequestState::Fatal);
                Err(self.force_sign_out("refreshed credential was rejected"))
            }
        }
    }

    /// Like `send`, deserializing the payload into `T`. An empty body is
    /// offered to `T` as JSON `null`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> Result<T, ApiError> {
        let payload = self.send(request).await?.unwrap_or(Value::Null);
        decode(payload)
    }

    /// Sends one call with a credential the caller already holds, such as the
    /// identity-provider token presented at login. The session token is not
    /// consulted and nothing is refreshed, retried or signed out: a 401 is
    /// `Unauthenticated` and a 403 is `Forbidden`.
    #[tracing::instrument(skip_all, fields(method = %request.method, endpoint = %request.endpoint))]
    pub async fn send_with_credential(
        &self,
        request: &RequestDescriptor,
        credential: &str,
    ) -> ApiResult {
        let response = self.execute(request, credential.to_string()).await?;
        // Classified like a retry, since there is no second chance.
        match classify(Attempt::Retry, &response) {
            Classification::Complete(result) => result,
            Classification::AuthRejected | Classification::CredentialExpired => Err(
                ApiError::Unauthenticated(extract_error_message(response.status, &response.body)),
            ),
        }
    }

    /// `send_with_credential` followed by the same decoding as `send_json`.
    pub async fn send_json_with_credential<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
        credential: &str,
    ) -> Result<T, ApiError> {
        let payload = self
            .send_with_credential(request, credential)
            .await?
            .unwrap_or(Value::Null);
        decode(payload)
    }

    /// Like `send_json` for list endpoints; an empty body is an empty list.
    pub async fn send_list<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Vec<T>, ApiError> {
        match self.send(request).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(payload) => decode(payload),
        }
    }

    async fn execute(
        &self,
        request: &RequestDescriptor,
        bearer: String,
    ) -> Result<HttpResponse, ApiError> {
        let outbound = OutboundRequest {
            method: request.method,
            path: request.endpoint.clone(),
            bearer,
            body: request.wire_body(),
        };
        let response = self
            .transport
            .execute(&outbound)
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        debug!(status = response.status, "response received");
        Ok(response)
    }

    fn force_sign_out(&self, reason: &str) -> ApiError {
        warn!(reason, "forcing sign-out");
        if let Err(e) = self.session.clear() {
            warn!("failed to clear session during sign-out: {e}");
        }
        self.sign_out.on_forced_sign_out(reason);
        ApiError::Unauthenticated(reason.to_string())
    }
}

fn enter(state: &mut RequestState, next: RequestState) {
    debug!(from = ?*state, to = ?next, "request state");
    *state = next;
}

fn settled(result: &ApiResult) -> RequestState {
    if result.is_ok() {
        RequestState::Success
    } else {
        RequestState::Fatal
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    T::deserialize(&payload).map_err(|e| ApiError::MalformedResponse {
        raw: payload.to_string(),
        detail: e.to_string(),
    })
}
