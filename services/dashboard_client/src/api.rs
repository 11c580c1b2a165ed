//! services/dashboard_client/src/api.rs
//!
//! The typed dashboard API. Each method is one backend endpoint sent through
//! the core `RequestClient`, so every call gets the same credential refresh
//! and sign-out behavior. Wire records are converted to core domain types here
//! and nowhere else.

use crate::error::ClientError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use task_dashboard_core::domain::{
    AdminStats, ContributorStats, DashboardSnapshot, DashboardStats, LeaderStats, MemberStats,
    NewProject, NewTask, Project, ProjectMember, ProjectStatus, RecentItem, Role, Task,
    TaskPriority, TaskStatus, UserProfile, UserSummary,
};
use task_dashboard_core::request::{RequestClient, RequestDescriptor};
use task_dashboard_core::session::SessionContext;
use task_dashboard_core::view_model::{aggregate_counts, build_dashboard_view, DashboardView};
use uuid::Uuid;

/// How many entries the "recent" widget shows.
const RECENT_ITEM_LIMIT: usize = 3;

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    id: Uuid,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    role: Option<String>,
}

impl UserRecord {
    fn name(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_default()
    }

    fn parsed_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|raw| match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!("ignoring user role from backend: {e}");
                None
            }
        })
    }

    fn to_profile(self) -> UserProfile {
        let display_name = self.name();
        let role = self.parsed_role().unwrap_or(Role::Member);
        UserProfile {
            id: self.id,
            email: self.email.unwrap_or_default(),
            display_name,
            photo_url: self.photo_url,
            role,
        }
    }

    fn to_summary(self) -> UserSummary {
        let display_name = self.name();
        let role = self.parsed_role();
        UserSummary {
            id: self.id,
            display_name,
            email: self.email,
            role,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectMemberRecord {
    #[serde(alias = "id")]
    user_id: Option<Uuid>,
    #[serde(alias = "displayName")]
    name: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: Option<String>,
    leader: Option<UserRecord>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    #[serde(default)]
    members: Vec<ProjectMemberRecord>,
    #[serde(default)]
    member_count: u64,
    #[serde(default)]
    task_count: u64,
}

impl ProjectRecord {
    fn to_domain(self) -> Project {
        Project {
            id: self.id,
            name: self.name,
            description: self.description,
            status: self
                .status
                .as_deref()
                .map(ProjectStatus::parse)
                .unwrap_or(ProjectStatus::Active),
            leader: self.leader.map(UserRecord::to_summary),
            start_date: self.start_date,
            end_date: self.end_date,
            members: self
                .members
                .into_iter()
                .map(|m| ProjectMember {
                    user_id: m.user_id,
                    name: m.name.unwrap_or_default(),
                    role: m.role,
                })
                .collect(),
            member_count: self.member_count,
            task_count: self.task_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    deadline: Option<NaiveDate>,
    project_id: Option<Uuid>,
    #[serde(default)]
    assignees: Vec<UserRecord>,
}

impl TaskRecord {
    fn to_domain(self) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            priority: self
                .priority
                .as_deref()
                .map(TaskPriority::parse)
                .unwrap_or(TaskPriority::Medium),
            status: self
                .status
                .as_deref()
                .map(TaskStatus::parse)
                .unwrap_or(TaskStatus::Todo),
            deadline: self.deadline,
            project_id: self.project_id,
            assignees: self
                .assignees
                .into_iter()
                .map(UserRecord::to_summary)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContributorRecord {
    user_id: Option<Uuid>,
    display_name: Option<String>,
    role: Option<String>,
    completed_tasks: u64,
    overdue_tasks: u64,
    completion_rate: f64,
}

impl ContributorRecord {
    fn to_domain(self) -> ContributorStats {
        ContributorStats {
            user_id: self.user_id,
            display_name: self.display_name.unwrap_or_default(),
            role: self.role.as_deref().and_then(|raw| raw.parse().ok()),
            completed_tasks: self.completed_tasks,
            overdue_tasks: self.overdue_tasks,
            completion_rate: self.completion_rate,
        }
    }
}

fn contributors(records: Vec<ContributorRecord>) -> Vec<ContributorStats> {
    records.into_iter().map(ContributorRecord::to_domain).collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AdminDashboardRecord {
    total_projects: u64,
    active_projects: u64,
    completed_projects: u64,
    overdue_projects: u64,
    upcoming_projects: u64,
    total_members: u64,
    total_tasks: u64,
    completed_tasks: u64,
    overdue_tasks: u64,
    top_contributors: Vec<ContributorRecord>,
}

impl AdminDashboardRecord {
    fn to_domain(self) -> AdminStats {
        AdminStats {
            total_projects: self.total_projects,
            active_projects: self.active_projects,
            completed_projects: self.completed_projects,
            overdue_projects: self.overdue_projects,
            upcoming_projects: self.upcoming_projects,
            total_members: self.total_members,
            total_tasks: self.total_tasks,
            completed_tasks: self.completed_tasks,
            overdue_tasks: self.overdue_tasks,
            top_contributors: contributors(self.top_contributors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LeaderDashboardRecord {
    project_id: Option<Uuid>,
    project_name: Option<String>,
    member_count: u64,
    total_tasks: u64,
    todo_tasks: u64,
    in_progress_tasks: u64,
    completed_tasks: u64,
    overdue_tasks: u64,
    member_performances: Vec<ContributorRecord>,
}

impl LeaderDashboardRecord {
    fn to_domain(self) -> LeaderStats {
        LeaderStats {
            project_id: self.project_id,
            project_name: self.project_name,
            member_count: self.member_count,
            total_tasks: self.total_tasks,
            todo_tasks: self.todo_tasks,
            in_progress_tasks: self.in_progress_tasks,
            completed_tasks: self.completed_tasks,
            overdue_tasks: self.overdue_tasks,
            member_performances: contributors(self.member_performances),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MemberDashboardRecord {
    total_assigned: u64,
    completed_tasks: u64,
    overdue_tasks: u64,
    in_progress_tasks: u64,
    todo_tasks: u64,
    completion_rate: f64,
}

impl MemberDashboardRecord {
    fn to_domain(self) -> MemberStats {
        MemberStats {
            total_assigned: self.total_assigned,
            completed_tasks: self.completed_tasks,
            overdue_tasks: self.overdue_tasks,
            in_progress_tasks: self.in_progress_tasks,
            todo_tasks: self.todo_tasks,
            completion_rate: self.completion_rate,
        }
    }
}

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload<'a> {
    id_token: &'a str,
}

#[derive(Serialize)]
struct StatusPayload<'a> {
    status: &'a str,
}

fn to_body<T: Serialize>(payload: &T) -> Result<Value, ClientError> {
    Ok(serde_json::to_value(payload)?)
}

/// The dashboard endpoint for a role. A leader without a remembered project
/// falls back to the member view.
pub fn dashboard_endpoint(role: Role, project_id: Option<Uuid>) -> String {
    match (role, project_id) {
        (Role::Admin, _) => "/dashboard/admin".to_string(),
        (Role::Leader, Some(id)) => format!("/dashboard/leader/{id}"),
        (Role::Leader, None) | (Role::Member, _) => "/dashboard/member".to_string(),
    }
}

//=========================================================================================
// The API
//=========================================================================================

/// One method per backend endpoint.
#[derive(Clone)]
pub struct DashboardApi {
    client: RequestClient,
}

impl DashboardApi {
    pub fn new(client: RequestClient) -> Self {
        Self { client }
    }

    pub fn session(&self) -> &SessionContext {
        self.client.session()
    }

    // --- Users ---

    /// Exchanges an identity-provider token for the backend profile and
    /// stores both in the session. The token itself is the bearer, so this
    /// works on an empty session and a rejection never forces a sign-out.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, id_token: &str) -> Result<UserProfile, ClientError> {
        let body = to_body(&LoginPayload { id_token })?;
        let record: UserRecord = self
            .client
            .send_json_with_credential(&RequestDescriptor::post("/auth/login", body), id_token)
            .await?;
        let profile = record.to_profile();
        self.session().store_profile(&profile, id_token)?;
        tracing::info!(role = %profile.role, "signed in");
        Ok(profile)
    }

    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        let record: UserRecord = self
            .client
            .send_json(&RequestDescriptor::get("/users/me"))
            .await?;
        Ok(record.to_profile())
    }

    // --- Dashboard ---

    pub async fn dashboard(
        &self,
        role: Role,
        project_id: Option<Uuid>,
    ) -> Result<DashboardStats, ClientError> {
        let request = RequestDescriptor::get(dashboard_endpoint(role, project_id));
        let stats = match (role, project_id) {
            (Role::Admin, _) => DashboardStats::Admin(
                self.client
                    .send_json::<Option<AdminDashboardRecord>>(&request)
                    .await?
                    .unwrap_or_default()
                    .to_domain(),
            ),
            (Role::Leader, Some(_)) => DashboardStats::Leader(
                self.client
                    .send_json::<Option<LeaderDashboardRecord>>(&request)
                    .await?
                    .unwrap_or_default()
                    .to_domain(),
            ),
            _ => DashboardStats::Member(
                self.client
                    .send_json::<Option<MemberDashboardRecord>>(&request)
                    .await?
                    .unwrap_or_default()
                    .to_domain(),
            ),
        };
        Ok(stats)
    }

    /// Fetches the role's dashboard and its recent items concurrently and
    /// derives the view. Admin project counters are checked against the
    /// client-side categorization of the fetched projects.
    #[tracing::instrument(skip_all)]
    pub async fn load_dashboard(&self, now: NaiveDate) -> Result<DashboardView, ClientError> {
        let role = self.session().role()?.unwrap_or(Role::Member);
        let project_id = match role {
            Role::Leader => self.session().project_id()?,
            _ => None,
        };

        let (stats, recent_items, local_counts) = match role {
            Role::Member => {
                let (stats, tasks) =
                    futures::try_join!(self.dashboard(role, project_id), self.my_tasks())?;
                let recent = tasks
                    .into_iter()
                    .take(RECENT_ITEM_LIMIT)
                    .map(|task| RecentItem {
                        id: None,
                        name: task.title,
                    })
                    .collect();
                (stats, recent, None)
            }
            Role::Admin | Role::Leader => {
                let (stats, projects) =
                    futures::try_join!(self.dashboard(role, project_id), self.projects())?;
                let counts = (role == Role::Admin).then(|| aggregate_counts(&projects, now));
                let recent = projects
                    .into_iter()
                    .take(RECENT_ITEM_LIMIT)
                    .map(|project| RecentItem {
                        id: Some(project.id),
                        name: project.name,
                    })
                    .collect();
                (stats, recent, counts)
            }
        };

        let snapshot = DashboardSnapshot {
            stats,
            recent_items,
        };
        let view = build_dashboard_view(&snapshot, local_counts.as_ref());
        for mismatch in &view.project_mismatches {
            tracing::warn!(
                field = mismatch.field,
                server = mismatch.server,
                local = mismatch.local,
                "server project count disagrees with local categorization"
            );
        }
        Ok(view)
    }

    // --- Projects ---

    pub async fn projects(&self) -> Result<Vec<Project>, ClientError> {
        let records: Vec<ProjectRecord> = self
            .client
            .send_list(&RequestDescriptor::get("/projects"))
            .await?;
        Ok(records.into_iter().map(ProjectRecord::to_domain).collect())
    }

    /// Fetches one project and remembers it as the last opened one.
    pub async fn project(&self, id: Uuid) -> Result<Project, ClientError> {
        let record: ProjectRecord = self
            .client
            .send_json(&RequestDescriptor::get(format!("/projects/{id}")))
            .await?;
        self.session().remember_project(id)?;
        Ok(record.to_domain())
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, ClientError> {
        if project.name.trim().is_empty() {
            return Err(ClientError::InvalidInput(
                "project name must not be empty".to_string(),
            ));
        }
        let record: ProjectRecord = self
            .client
            .send_json(&RequestDescriptor::post("/projects", to_body(project)?))
            .await?;
        Ok(record.to_domain())
    }

    pub async fn delete_project(&self, id: Uuid) -> Result<(), ClientError> {
        self.client
            .send(&RequestDescriptor::delete(format!("/projects/{id}")))
            .await?;
        Ok(())
    }

    // --- Tasks ---

    pub async fn my_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let records: Vec<TaskRecord> = self
            .client
            .send_list(&RequestDescriptor::get("/tasks/my"))
            .await?;
        Ok(records.into_iter().map(TaskRecord::to_domain).collect())
    }

    pub async fn project_tasks(&self, project_id: Uuid) -> Result<Vec<Task>, ClientError> {
        let records: Vec<TaskRecord> = self
            .client
            .send_list(&RequestDescriptor::get(format!("/tasks/project/{project_id}")))
            .await?;
        Ok(records.into_iter().map(TaskRecord::to_domain).collect())
    }

    pub async fn create_task(
        &self,
        project_id: Uuid,
        task: &NewTask,
    ) -> Result<Task, ClientError> {
        if task.title.trim().is_empty() {
            return Err(ClientError::InvalidInput(
                "task title must not be empty".to_string(),
            ));
        }
        let record: TaskRecord = self
            .client
            .send_json(&RequestDescriptor::post(
                format!("/tasks/project/{project_id}"),
                to_body(task)?,
            ))
            .await?;
        Ok(record.to_domain())
    }

    pub async fn update_task_status(
        &self,
        id: Uuid,
        status: &TaskStatus,
    ) -> Result<Task, ClientError> {
        if let TaskStatus::Unknown(raw) = status {
            return Err(ClientError::InvalidInput(format!(
                "unknown task status '{raw}'"
            )));
        }
        let body = to_body(&StatusPayload {
            status: status.as_str(),
        })?;
        let record: TaskRecord = self
            .client
            .send_json(&RequestDescriptor::put(format!("/tasks/{id}/status"), body))
            .await?;
        Ok(record.to_domain())
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<(), ClientError> {
        self.client
            .send(&RequestDescriptor::delete(format!("/tasks/{id}")))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_endpoint_follows_role() {
        let id = Uuid::nil();
        assert_eq!(dashboard_endpoint(Role::Admin, Some(id)), "/dashboard/admin");
        assert_eq!(
            dashboard_endpoint(Role::Leader, Some(id)),
            format!("/dashboard/leader/{id}")
        );
        assert_eq!(dashboard_endpoint(Role::Leader, None), "/dashboard/member");
        assert_eq!(dashboard_endpoint(Role::Member, Some(id)), "/dashboard/member");
    }

    #[test]
    fn project_record_fills_backend_defaults() {
        let record: ProjectRecord = serde_json::from_value(serde_json::json!({
            "id": "5f0c8c4e-1b1a-4a51-9a43-0c3c2d2e9a11",
            "name": "Website",
            "leader": {
                "id": "0b7d1c9e-9c0f-4c55-8f55-2a4e7b0d8c01",
                "email": "lee@example.com",
                "role": "LEADER"
            },
            "endDate": "2024-06-30",
            "createdAt": "2024-01-01T10:00:00"
        }))
        .unwrap();

        let project = record.to_domain();
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.member_count, 0);
        assert_eq!(project.end_date, NaiveDate::from_ymd_opt(2024, 6, 30));
        let leader = project.leader.unwrap();
        assert_eq!(leader.display_name, "lee@example.com");
        assert_eq!(leader.role, Some(Role::Leader));
    }

    #[test]
    fn task_record_parses_lenient_status() {
        let record: TaskRecord = serde_json::from_value(serde_json::json!({
            "id": "5f0c8c4e-1b1a-4a51-9a43-0c3c2d2e9a11",
            "title": "Write copy",
            "status": "in progress",
            "priority": "HIGH",
            "deadline": "2024-05-01"
        }))
        .unwrap();

        let task = record.to_domain();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::High);
        assert!(task.assignees.is_empty());
    }

    #[test]
    fn dashboard_records_default_missing_counters() {
        let record: AdminDashboardRecord = serde_json::from_value(serde_json::json!({
            "totalProjects": 4,
            "topContributors": [{"displayName": "Ana", "completedTasks": 3}]
        }))
        .unwrap();

        let stats = record.to_domain();
        assert_eq!(stats.total_projects, 4);
        assert_eq!(stats.active_projects, 0);
        assert_eq!(stats.top_contributors[0].display_name, "Ana");
        assert_eq!(stats.top_contributors[0].overdue_tasks, 0);
    }

    #[test]
    fn status_payload_uses_backend_names() {
        let body = to_body(&StatusPayload {
            status: TaskStatus::InProgress.as_str(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"status": "IN_PROGRESS"}));
    }
}
