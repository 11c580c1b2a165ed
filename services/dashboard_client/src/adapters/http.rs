//! services/dashboard_client/src/adapters/http.rs
//!
//! This module contains the adapter that talks HTTP to the dashboard backend.
//! It implements the `HttpTransport` port from the `core` crate on top of `reqwest`.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use std::time::Duration;
use task_dashboard_core::ports::{
    HttpMethod, HttpResponse, HttpTransport, OutboundRequest, PortError, PortResult,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `HttpTransport` port with a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Builds a transport with its own client and the given per-request timeout.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Joins the base URL and an endpoint path, keeping any path prefix
    /// the base URL already carries (e.g. `/api`).
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

//=========================================================================================
// `HttpTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[tracing::instrument(skip_all, fields(method = %request.method, path = %request.path))]
    async fn execute(&self, request: &OutboundRequest) -> PortResult<HttpResponse> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), self.endpoint(&request.path))
            .bearer_auth(&request.bearer);

        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PortError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Transport(format!("Failed to read response body: {}", e)))?;

        tracing::debug!(status, "backend responded");
        Ok(HttpResponse::new(status, body))
    }
}
