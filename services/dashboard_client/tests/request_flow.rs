//! services/dashboard_client/tests/request_flow.rs
//!
//! End-to-end request behavior over real HTTP: the backend and the identity
//! provider are both served by one `wiremock` server.

use chrono::NaiveDate;
use dashboard_client_lib::{config::Config, error::ClientError, state::AppState};
use std::collections::HashMap;
use std::sync::Arc;
use task_dashboard_core::domain::{Role, TaskStatus, UserProfile};
use task_dashboard_core::ports::CredentialStore;
use task_dashboard_core::request::ApiError;
use task_dashboard_core::session::SessionContext;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

//=========================================================================================
// Harness
//=========================================================================================

fn state_for(server: &MockServer, session: SessionContext) -> AppState {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DASHBOARD_API_URL", format!("{}/api", server.uri())),
        ("IDENTITY_TOKEN_URL", format!("{}/v1/token", server.uri())),
        ("IDENTITY_API_KEY", "test-key".to_string()),
        ("REQUEST_TIMEOUT_SECS", "5".to_string()),
    ]);
    let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
    AppState::with_session(Arc::new(config), session).unwrap()
}

/// A session holding a (possibly stale) access token and a refresh token.
fn signed_in_session(access_token: &str) -> SessionContext {
    let session = SessionContext::in_memory();
    session.set_token(access_token).unwrap();
    session.set_refresh_token("refresh-1").unwrap();
    session
}

async fn mount_token_endpoint(server: &MockServer, status: u16, times: u64) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id_token": "fresh-token",
            "refresh_token": "refresh-2",
            "expires_in": "3600",
            "user_id": "u-1"
        }))
    } else {
        ResponseTemplate::new(status).set_body_string("token endpoint says no")
    };
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(template)
        .expect(times)
        .mount(server)
        .await;
}

//=========================================================================================
// Refresh and Retry
//=========================================================================================

#[tokio::test]
async fn rejected_token_is_refreshed_once_and_the_call_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": Uuid::new_v4(), "name": "Website", "status": "ACTIVE"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 200, 1).await;

    let session = signed_in_session("stale-token");
    let state = state_for(&server, session.clone());

    let projects = state.api.projects().await.unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Website");
    assert_eq!(session.access_token().unwrap().as_deref(), Some("fresh-token"));
    assert_eq!(session.refresh_token().unwrap().as_deref(), Some("refresh-2"));
    assert!(!state.sign_out.was_signed_out());
}

#[tokio::test]
async fn forbidden_twice_is_forbidden_and_keeps_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/projects/00000000-0000-0000-0000-000000000000"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(serde_json::json!({"message": "Only admins can delete projects"})),
        )
        .expect(2)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 200, 1).await;

    let session = signed_in_session("member-token");
    let state = state_for(&server, session.clone());

    let err = state.api.delete_project(Uuid::nil()).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Api(ApiError::Forbidden(ref message)) if message == "Only admins can delete projects"
    ));
    assert_eq!(state.sign_out.sign_out_count(), 0);
    assert!(session.is_signed_in().unwrap());
}

#[tokio::test]
async fn unauthorized_after_refresh_signs_out_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/my"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 200, 1).await;

    let session = signed_in_session("stale-token");
    let state = state_for(&server, session.clone());

    let err = state.api.my_tasks().await.unwrap_err();

    assert!(matches!(err, ClientError::Api(ApiError::Unauthenticated(_))));
    assert_eq!(state.sign_out.sign_out_count(), 1);
    assert!(!session.is_signed_in().unwrap());
    assert_eq!(session.refresh_token().unwrap(), None);
}

#[tokio::test]
async fn rejected_refresh_token_signs_out_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 400, 1).await;

    let session = signed_in_session("stale-token");
    let state = state_for(&server, session.clone());

    let err = state.api.projects().await.unwrap_err();

    assert!(matches!(err, ClientError::Api(ApiError::Unauthenticated(_))));
    assert_eq!(state.sign_out.sign_out_count(), 1);
    assert!(!session.is_signed_in().unwrap());
}

#[tokio::test]
async fn identity_outage_is_a_network_error_and_keeps_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 503, 1).await;

    let session = signed_in_session("stale-token");
    let state = state_for(&server, session.clone());

    let err = state.api.projects().await.unwrap_err();

    assert!(matches!(err, ClientError::Api(ApiError::Network(_))));
    assert!(!state.sign_out.was_signed_out());
    assert!(session.is_signed_in().unwrap());
}

#[tokio::test]
async fn missing_session_signs_out_without_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 200, 0).await;

    let state = state_for(&server, SessionContext::in_memory());

    let err = state.api.projects().await.unwrap_err();

    assert!(matches!(err, ClientError::Api(ApiError::Unauthenticated(_))));
    assert_eq!(state.sign_out.sign_out_count(), 1);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error_and_keeps_the_session() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let vars: HashMap<&str, String> = HashMap::from([
        ("DASHBOARD_API_URL", format!("http://127.0.0.1:{port}/api")),
        ("REQUEST_TIMEOUT_SECS", "2".to_string()),
    ]);
    let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
    let session = signed_in_session("good-token");
    let state = AppState::with_session(Arc::new(config), session.clone()).unwrap();

    let err = state.api.projects().await.unwrap_err();

    assert!(matches!(err, ClientError::Api(ApiError::Network(_))));
    assert!(!state.sign_out.was_signed_out());
    assert!(session.is_signed_in().unwrap());
}

#[tokio::test]
async fn service_errors_do_not_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/tasks/{}/status", Uuid::nil())))
        .and(body_json(serde_json::json!({"status": "DONE"})))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "boom"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 200, 0).await;

    let state = state_for(&server, signed_in_session("good-token"));

    let err = state
        .api
        .update_task_status(Uuid::nil(), &TaskStatus::parse("done"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Api(ApiError::Service { status: 500, ref message }) if message == "boom"
    ));
}

//=========================================================================================
// Login and Dashboard Assembly
//=========================================================================================

#[tokio::test]
async fn login_stores_the_backend_profile() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(header("authorization", "Bearer fresh-token"))
        .and(body_json(serde_json::json!({"idToken": "fresh-token"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": user_id,
            "email": "lee@example.com",
            "displayName": "Lee",
            "role": "LEADER"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 200, 1).await;

    let session = SessionContext::in_memory();
    let state = state_for(&server, session.clone());

    let id_token = state
        .identity
        .sign_in_with_refresh_token("refresh-1")
        .await
        .unwrap()
        .unwrap();
    let profile = state.api.login(&id_token).await.unwrap();

    assert_eq!(profile.role, Role::Leader);
    assert_eq!(session.role().unwrap(), Some(Role::Leader));
    assert_eq!(session.user_id().unwrap(), Some(user_id));
    assert_eq!(session.display_name().unwrap().as_deref(), Some("Lee"));
}

#[tokio::test]
async fn login_on_an_empty_session_uses_the_given_token() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(header("authorization", "Bearer provider-id-token"))
        .and(body_json(serde_json::json!({"idToken": "provider-id-token"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": user_id,
            "email": "mo@example.com",
            "displayName": "Mo",
            "role": "MEMBER"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 200, 0).await;

    let session = SessionContext::in_memory();
    let state = state_for(&server, session.clone());

    let profile = state.api.login("provider-id-token").await.unwrap();

    assert_eq!(profile.id, user_id);
    assert_eq!(state.sign_out.sign_out_count(), 0);
    assert_eq!(session.access_token().unwrap().as_deref(), Some("provider-id-token"));
    assert_eq!(session.role().unwrap(), Some(Role::Member));
}

#[tokio::test]
async fn rejected_login_keeps_the_session_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "Invalid token"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, 200, 0).await;

    let session = SessionContext::in_memory();
    session.set_refresh_token("refresh-1").unwrap();
    let state = state_for(&server, session.clone());

    let err = state.api.login("bad-token").await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Api(ApiError::Unauthenticated(ref message)) if message == "Invalid token"
    ));
    assert_eq!(state.sign_out.sign_out_count(), 0);
    assert_eq!(session.refresh_token().unwrap().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn admin_dashboard_flags_disagreeing_server_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalProjects": 3,
            "activeProjects": 2,
            "overdueProjects": 1,
            "upcomingProjects": 0,
            "totalMembers": 5,
            "totalTasks": 10,
            "completedTasks": 4,
            "topContributors": [
                {"displayName": "Ana", "completedTasks": 1, "overdueTasks": 0},
                {"displayName": "Bo", "completedTasks": 3, "overdueTasks": 1}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": Uuid::new_v4(), "name": "Running", "startDate": "2024-06-01", "endDate": "2024-07-01"},
            {"id": Uuid::new_v4(), "name": "Late", "startDate": "2024-01-01", "endDate": "2024-06-01"},
            {"id": Uuid::new_v4(), "name": "Later", "startDate": "2024-08-01"},
            {"id": Uuid::new_v4(), "name": "Not shown", "startDate": "2024-06-10"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionContext::in_memory();
    let admin = UserProfile {
        id: Uuid::new_v4(),
        email: "admin@example.com".to_string(),
        display_name: "Admin".to_string(),
        photo_url: None,
        role: Role::Admin,
    };
    session.store_profile(&admin, "admin-token").unwrap();
    let state = state_for(&server, session);

    let now = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let view = state.api.load_dashboard(now).await.unwrap();

    assert_eq!(view.role, Role::Admin);
    assert_eq!(view.progress_percent, 40);
    let names: Vec<_> = view.recent_items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["Running", "Late", "Later"]);
    assert_eq!(view.performances[0].display_name, "Bo");

    // Locally: 4 total, 2 active, 1 overdue, 1 upcoming.
    let fields: Vec<_> = view.project_mismatches.iter().map(|m| m.field).collect();
    assert_eq!(fields, ["totalProjects", "upcomingProjects"]);
}

#[tokio::test]
async fn leader_without_a_project_gets_the_member_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/member"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalAssigned": 4,
            "completedTasks": 1,
            "inProgressTasks": 1,
            "todoTasks": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionContext::in_memory();
    let leader = UserProfile {
        id: Uuid::new_v4(),
        email: "lee@example.com".to_string(),
        display_name: "Lee".to_string(),
        photo_url: None,
        role: Role::Leader,
    };
    session.store_profile(&leader, "leader-token").unwrap();
    let state = state_for(&server, session);

    let view = state
        .api
        .load_dashboard(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        .await
        .unwrap();

    assert_eq!(view.role, Role::Member);
    assert_eq!(view.progress_percent, 25);
    assert!(view.recent_items.is_empty());
    assert!(view.project_mismatches.is_empty());
}
