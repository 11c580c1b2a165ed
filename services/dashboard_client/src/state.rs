//! services/dashboard_client/src/state.rs
//!
//! Defines the application state: every adapter wired to the core ports,
//! created once at startup and shared by the commands.

use crate::adapters::{FileSessionStore, NoticeSignOut, ReqwestTransport, SecureTokenProvider};
use crate::api::DashboardApi;
use crate::config::Config;
use crate::error::ClientError;
use std::sync::Arc;
use task_dashboard_core::request::RequestClient;
use task_dashboard_core::session::SessionContext;

//=========================================================================================
// AppState
//=========================================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionContext,
    pub identity: Arc<SecureTokenProvider>,
    pub sign_out: Arc<NoticeSignOut>,
    pub api: DashboardApi,
}

impl AppState {
    /// Wires the file-backed session, the identity provider and the HTTP
    /// transport into a `DashboardApi`.
    pub fn from_config(config: Arc<Config>) -> Result<Self, ClientError> {
        let store = FileSessionStore::open(config.session_file.clone());
        Self::with_session(config, SessionContext::new(Arc::new(store)))
    }

    /// Same wiring over an existing session, e.g. an in-memory one in tests.
    pub fn with_session(config: Arc<Config>, session: SessionContext) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let transport = Arc::new(ReqwestTransport::with_client(
            http.clone(),
            config.api_url.clone(),
        ));
        let identity = Arc::new(SecureTokenProvider::new(
            http,
            config.identity_token_url.clone(),
            config.identity_api_key.clone(),
            session.clone(),
        ));
        let sign_out = Arc::new(NoticeSignOut::new());

        let client = RequestClient::new(
            transport,
            identity.clone(),
            session.clone(),
            sign_out.clone(),
        );

        Ok(Self {
            config,
            session,
            identity,
            sign_out,
            api: DashboardApi::new(client),
        })
    }
}
