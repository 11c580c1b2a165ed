//! services/dashboard_client/src/adapters/identity.rs
//!
//! This module contains the adapter for the identity provider's secure-token
//! endpoint. It implements the `CredentialProvider` port: the current ID token
//! is read from the session, and a refresh exchanges the stored refresh token
//! for a new ID token (`grant_type=refresh_token`).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::sync::Mutex;
use task_dashboard_core::ports::{CredentialProvider, CredentialStore, PortError, PortResult};
use task_dashboard_core::session::SessionContext;

/// A cached token is reused by a non-forced refresh only while it has more
/// than this many seconds left.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Token endpoint response. `expires_in` arrives as a string of seconds.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
    #[serde(default)]
    user_id: Option<String>,
}

fn expires_in_secs(value: Option<&serde_json::Value>) -> Option<i64> {
    match value? {
        serde_json::Value::String(raw) => raw.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CredentialProvider` against a secure-token endpoint.
pub struct SecureTokenProvider {
    client: Client,
    token_url: Url,
    api_key: Option<String>,
    session: SessionContext,
    expires_at: Mutex<Option<DateTime<Utc>>>,
}

impl SecureTokenProvider {
    pub fn new(
        client: Client,
        token_url: Url,
        api_key: Option<String>,
        session: SessionContext,
    ) -> Self {
        Self {
            client,
            token_url,
            api_key,
            session,
            expires_at: Mutex::new(None),
        }
    }

    /// Starts a session from a refresh token obtained out of band and returns
    /// the first ID token. `Ok(None)` means the provider rejected it.
    pub async fn sign_in_with_refresh_token(
        &self,
        refresh_token: &str,
    ) -> PortResult<Option<String>> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Ok(None);
        }
        self.session.set_refresh_token(refresh_token)?;
        self.refresh_token(true).await
    }

    /// Ends the provider session and drops everything stored with it.
    pub fn sign_out(&self) -> PortResult<()> {
        self.set_expiry(None);
        self.session.clear()
    }

    fn set_expiry(&self, at: Option<DateTime<Utc>>) {
        if let Ok(mut slot) = self.expires_at.lock() {
            *slot = at;
        }
    }

    /// The cached token, if it is known to stay valid past the buffer.
    fn fresh_cached_token(&self) -> PortResult<Option<String>> {
        let expires_at = self.expires_at.lock().ok().and_then(|slot| *slot);
        match expires_at {
            Some(at) if Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) < at => {
                self.session.access_token()
            }
            _ => Ok(None),
        }
    }

    #[tracing::instrument(skip_all)]
    async fn exchange(&self, refresh_token: &str) -> PortResult<Option<String>> {
        let mut request = self.client.post(self.token_url.clone()).form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Transport(e.to_string()))?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            // The provider no longer recognises this session.
            tracing::warn!(status = status.as_u16(), "identity provider rejected the refresh token");
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "identity provider returned {}: {}",
                status.as_u16(),
                text
            )));
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid token response: {}", e)))?;

        self.session.set_token(&data.id_token)?;
        self.session.set_refresh_token(&data.refresh_token)?;
        self.set_expiry(
            expires_in_secs(data.expires_in.as_ref())
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        );

        tracing::info!(user = data.user_id.as_deref().unwrap_or("unknown"), "identity token refreshed");
        Ok(Some(data.id_token))
    }
}

//=========================================================================================
// `CredentialProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialProvider for SecureTokenProvider {
    async fn current_token(&self) -> PortResult<Option<String>> {
        self.session.access_token()
    }

    async fn refresh_token(&self, force_refresh: bool) -> PortResult<Option<String>> {
        if !force_refresh {
            if let Some(token) = self.fresh_cached_token()? {
                return Ok(Some(token));
            }
        }

        let Some(refresh_token) = self.session.refresh_token()? else {
            tracing::debug!("no identity session to refresh");
            return Ok(None);
        };
        self.exchange(&refresh_token).await
    }
}
