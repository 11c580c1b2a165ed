//! crates/task_dashboard_core/src/domain.rs
//!
//! Defines the pure, core data structures for the dashboard client.
//! Wire formats live with the adapters; these types only derive `Serialize`
//! so view-models built from them can be printed.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Users and Roles
//=========================================================================================

/// The role of the signed-in user. Decides which dashboard the backend serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Leader,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Leader => "LEADER",
            Role::Member => "MEMBER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role string is not one of `ADMIN`, `LEADER` or `MEMBER`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "LEADER" => Ok(Role::Leader),
            "MEMBER" => Ok(Role::Member),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// The profile returned by the backend after a successful login exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub role: Role,
}

/// A lightweight user reference embedded in projects and tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub role: Option<Role>,
}

//=========================================================================================
// Projects
//=========================================================================================

/// Lifecycle status of a project as stored by the backend.
///
/// Values the client does not know are kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
    Unknown(String),
}

impl ProjectStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize_enum_token(raw).as_str() {
            "PLANNING" => ProjectStatus::Planning,
            "ACTIVE" => ProjectStatus::Active,
            "ON_HOLD" => ProjectStatus::OnHold,
            "COMPLETED" => ProjectStatus::Completed,
            "CANCELLED" => ProjectStatus::Cancelled,
            _ => ProjectStatus::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProjectStatus::Planning => "PLANNING",
            ProjectStatus::Active => "ACTIVE",
            ProjectStatus::OnHold => "ON_HOLD",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Cancelled => "CANCELLED",
            ProjectStatus::Unknown(raw) => raw,
        }
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A member entry listed on a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectMember {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub role: Option<String>,
}

/// A project. Its category (active/overdue/upcoming) is derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub leader: Option<UserSummary>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub members: Vec<ProjectMember>,
    pub member_count: u64,
    pub task_count: u64,
}

/// Payload for creating a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

//=========================================================================================
// Tasks
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Unknown(String),
}

impl TaskPriority {
    pub fn parse(raw: &str) -> Self {
        match normalize_enum_token(raw).as_str() {
            "LOW" => TaskPriority::Low,
            "MEDIUM" => TaskPriority::Medium,
            "HIGH" => TaskPriority::High,
            _ => TaskPriority::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Unknown(raw) => raw,
        }
    }
}

impl From<TaskPriority> for String {
    fn from(priority: TaskPriority) -> Self {
        priority.as_str().to_string()
    }
}

/// Workflow status of a task.
///
/// Parsing is lenient: `"in progress"`, `"In_Progress"` and `"IN_PROGRESS"`
/// are the same status. Anything else is kept in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Unknown(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize_enum_token(raw).as_str() {
            "TODO" => TaskStatus::Todo,
            "IN_PROGRESS" => TaskStatus::InProgress,
            "DONE" => TaskStatus::Done,
            _ => TaskStatus::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
            TaskStatus::Unknown(raw) => raw,
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    pub project_id: Option<Uuid>,
    pub assignees: Vec<UserSummary>,
}

/// Payload for creating a task inside a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Uuid>,
}

//=========================================================================================
// Dashboard Snapshots
//=========================================================================================

/// Per-user performance counters as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContributorStats {
    pub user_id: Option<Uuid>,
    pub display_name: String,
    pub role: Option<Role>,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminStats {
    pub total_projects: u64,
    pub active_projects: u64,
    pub completed_projects: u64,
    pub overdue_projects: u64,
    pub upcoming_projects: u64,
    pub total_members: u64,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub top_contributors: Vec<ContributorStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeaderStats {
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub member_count: u64,
    pub total_tasks: u64,
    pub todo_tasks: u64,
    pub in_progress_tasks: u64,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub member_performances: Vec<ContributorStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemberStats {
    pub total_assigned: u64,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub in_progress_tasks: u64,
    pub todo_tasks: u64,
    pub completion_rate: f64,
}

/// Role-specific counters. Every numeric field is zero when the backend omits it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardStats {
    Admin(AdminStats),
    Leader(LeaderStats),
    Member(MemberStats),
}

impl DashboardStats {
    pub fn role(&self) -> Role {
        match self {
            DashboardStats::Admin(_) => Role::Admin,
            DashboardStats::Leader(_) => Role::Leader,
            DashboardStats::Member(_) => Role::Member,
        }
    }

    /// The performance list shown next to the stats, if the role has one.
    pub fn performances(&self) -> &[ContributorStats] {
        match self {
            DashboardStats::Admin(stats) => &stats.top_contributors,
            DashboardStats::Leader(stats) => &stats.member_performances,
            DashboardStats::Member(_) => &[],
        }
    }
}

/// An entry in the "recent" widget: a project (with id) or a task title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentItem {
    pub id: Option<Uuid>,
    pub name: String,
}

/// Everything fetched for one dashboard build. Assembled per request, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub recent_items: Vec<RecentItem>,
}

/// Upper-cases and replaces inner whitespace with `_`, matching how the
/// backend normalizes enum names it receives.
fn normalize_enum_token(raw: &str) -> String {
    raw.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_parses_spaced_and_mixed_case_values() {
        assert_eq!(TaskStatus::parse("in progress"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse(" In_Progress "), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("done"), TaskStatus::Done);
        assert_eq!(
            TaskStatus::parse("BLOCKED"),
            TaskStatus::Unknown("BLOCKED".to_string())
        );
    }

    #[test]
    fn unknown_statuses_keep_their_raw_text() {
        let status = ProjectStatus::parse("archived");
        assert_eq!(status.as_str(), "archived");
        assert_eq!(ProjectStatus::parse("on hold"), ProjectStatus::OnHold);
    }

    #[test]
    fn role_round_trips_through_its_string_form() {
        for role in [Role::Admin, Role::Leader, Role::Member] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!("leader".parse::<Role>(), Ok(Role::Leader));
        assert!("OWNER".parse::<Role>().is_err());
    }

    #[test]
    fn statuses_serialize_as_backend_strings() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let json = serde_json::to_string(&Role::Leader).unwrap();
        assert_eq!(json, "\"LEADER\"");
    }

    #[test]
    fn new_project_omits_absent_fields() {
        let payload = NewProject {
            name: "Website".to_string(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            end_date: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Website", "startDate": "2024-03-01"}));
    }
}
