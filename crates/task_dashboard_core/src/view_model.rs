//! crates/task_dashboard_core/src/view_model.rs
//!
//! Pure derivations from fetched collections to display-ready shapes.
//! Nothing here performs I/O or fails: missing dates sort last, missing
//! counters are already zero, and `now` is always passed in.

use crate::domain::{
    AdminStats, ContributorStats, DashboardSnapshot, DashboardStats, Project, ProjectStatus,
    RecentItem, Role, Task, TaskStatus,
};
use chrono::NaiveDate;
use serde::Serialize;

//=========================================================================================
// Project Categories
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectCategory {
    Active,
    Overdue,
    Upcoming,
}

/// Places a project relative to `now`. A past end date always wins.
pub fn categorize(project: &Project, now: NaiveDate) -> ProjectCategory {
    categorize_dates(project.start_date, project.end_date, now)
}

pub fn categorize_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    now: NaiveDate,
) -> ProjectCategory {
    if end.is_some_and(|end| end < now) {
        return ProjectCategory::Overdue;
    }
    if start.is_some_and(|start| start <= now) {
        // end is absent or >= now, the overdue branch took everything else
        return ProjectCategory::Active;
    }
    ProjectCategory::Upcoming
}

/// Orders projects by end date; `NoDeadline` sorts after every date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeadlineKey {
    Due(NaiveDate),
    NoDeadline,
}

pub fn deadline_sort_key(project: &Project) -> DeadlineKey {
    project
        .end_date
        .map_or(DeadlineKey::NoDeadline, DeadlineKey::Due)
}

/// Counts per category. `total` always equals the sum of the three buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub total: u64,
    pub active: u64,
    pub overdue: u64,
    pub upcoming: u64,
}

impl CategoryCounts {
    fn record(&mut self, category: ProjectCategory) {
        self.total += 1;
        match category {
            ProjectCategory::Active => self.active += 1,
            ProjectCategory::Overdue => self.overdue += 1,
            ProjectCategory::Upcoming => self.upcoming += 1,
        }
    }
}

/// Folds `categorize` over the collection. Authoritative over server aggregates.
pub fn aggregate_counts(projects: &[Project], now: NaiveDate) -> CategoryCounts {
    projects.iter().fold(CategoryCounts::default(), |mut counts, project| {
        counts.record(categorize(project, now));
        counts
    })
}

/// Projects split by category, each bucket in ascending deadline order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectBoard {
    pub active: Vec<Project>,
    pub overdue: Vec<Project>,
    pub upcoming: Vec<Project>,
}

impl ProjectBoard {
    pub fn build(projects: &[Project], now: NaiveDate) -> Self {
        let mut board = ProjectBoard::default();
        for project in projects {
            let bucket = match categorize(project, now) {
                ProjectCategory::Active => &mut board.active,
                ProjectCategory::Overdue => &mut board.overdue,
                ProjectCategory::Upcoming => &mut board.upcoming,
            };
            bucket.push(project.clone());
        }
        for bucket in [&mut board.active, &mut board.overdue, &mut board.upcoming] {
            bucket.sort_by_key(deadline_sort_key);
        }
        board
    }

    /// Counts taken from the board itself, so list and totals cannot disagree.
    pub fn counts(&self) -> CategoryCounts {
        let active = self.active.len() as u64;
        let overdue = self.overdue.len() as u64;
        let upcoming = self.upcoming.len() as u64;
        CategoryCounts {
            total: active + overdue + upcoming,
            active,
            overdue,
            upcoming,
        }
    }
}

/// Case-insensitive name search plus an optional exact status match.
pub fn filter_projects(
    projects: &[Project],
    search: Option<&str>,
    status: Option<&ProjectStatus>,
) -> Vec<Project> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    projects
        .iter()
        .filter(|p| {
            needle
                .as_deref()
                .map_or(true, |n| p.name.to_lowercase().contains(n))
        })
        .filter(|p| status.map_or(true, |s| &p.status == s))
        .cloned()
        .collect()
}

//=========================================================================================
// Server Aggregate Reconciliation
//=========================================================================================

/// A server-supplied counter that disagrees with the client-side fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountMismatch {
    pub field: &'static str,
    pub server: u64,
    pub local: u64,
}

/// Compares the admin dashboard's project counters with `aggregate_counts`.
pub fn reconcile_project_counts(
    server: &AdminStats,
    local: &CategoryCounts,
) -> Vec<CountMismatch> {
    [
        ("totalProjects", server.total_projects, local.total),
        ("activeProjects", server.active_projects, local.active),
        ("overdueProjects", server.overdue_projects, local.overdue),
        ("upcomingProjects", server.upcoming_projects, local.upcoming),
    ]
    .into_iter()
    .filter(|(_, server, local)| server != local)
    .map(|(field, server, local)| CountMismatch {
        field,
        server,
        local,
    })
    .collect()
}

//=========================================================================================
// Tasks
//=========================================================================================

pub const UNKNOWN_STATUS_RANK: u8 = 99;

/// In-progress work first, then done, then to-do, then anything unrecognized.
pub fn task_status_rank(status: &TaskStatus) -> u8 {
    match status {
        TaskStatus::InProgress => 1,
        TaskStatus::Done => 2,
        TaskStatus::Todo => 3,
        TaskStatus::Unknown(_) => UNKNOWN_STATUS_RANK,
    }
}

/// Stable: tasks with the same rank keep their fetched order.
pub fn sort_tasks_by_status(tasks: &mut [Task]) {
    tasks.sort_by_key(|task| task_status_rank(&task.status));
}

//=========================================================================================
// Stats
//=========================================================================================

/// Whole percent, rounded half up. Zero when there is nothing to complete.
pub fn success_rate(completed: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let (completed, total) = (u128::from(completed), u128::from(total));
    let percent = (completed * 200 + total) / (total * 2);
    u32::try_from(percent).unwrap_or(u32::MAX)
}

/// `10 × completed − 5 × overdue`, floored at zero.
pub fn contribution_score(completed: u64, overdue: u64) -> u64 {
    completed
        .saturating_mul(10)
        .saturating_sub(overdue.saturating_mul(5))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRow {
    pub display_name: String,
    pub role: Option<Role>,
    pub completed_tasks: u64,
    pub overdue_tasks: u64,
    pub score: u64,
}

/// Highest score first; ties keep the server's order.
pub fn rank_performances(stats: &[ContributorStats]) -> Vec<PerformanceRow> {
    let mut rows: Vec<PerformanceRow> = stats
        .iter()
        .map(|s| PerformanceRow {
            display_name: s.display_name.clone(),
            role: s.role,
            completed_tasks: s.completed_tasks,
            overdue_tasks: s.overdue_tasks,
            score: contribution_score(s.completed_tasks, s.overdue_tasks),
        })
        .collect();
    rows.sort_by(|a, b| b.score.cmp(&a.score));
    rows
}

//=========================================================================================
// Dashboard View
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: u64,
    pub percent: bool,
}

impl StatCard {
    fn count(label: &'static str, value: u64) -> Self {
        Self {
            label,
            value,
            percent: false,
        }
    }

    fn percent(label: &'static str, value: u32) -> Self {
        Self {
            label,
            value: u64::from(value),
            percent: true,
        }
    }
}

/// Everything the dashboard screen shows, for one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub role: Role,
    pub stats: Vec<StatCard>,
    pub progress_percent: u32,
    pub recent_items: Vec<RecentItem>,
    pub performances: Vec<PerformanceRow>,
    /// Server project counters that disagree with the client-side fold.
    pub project_mismatches: Vec<CountMismatch>,
}

/// Builds the role-specific view. `local_counts`, when given, is reconciled
/// against the admin counters.
pub fn build_dashboard_view(
    snapshot: &DashboardSnapshot,
    local_counts: Option<&CategoryCounts>,
) -> DashboardView {
    let (stats, progress_percent, project_mismatches) = match &snapshot.stats {
        DashboardStats::Admin(s) => {
            let cards = vec![
                StatCard::count("Total Projects", s.total_projects),
                StatCard::count("Active Projects", s.active_projects),
                StatCard::count("Total Tasks", s.total_tasks),
                StatCard::count("Total Members", s.total_members),
            ];
            let mismatches = local_counts
                .map(|local| reconcile_project_counts(s, local))
                .unwrap_or_default();
            (cards, success_rate(s.completed_tasks, s.total_tasks), mismatches)
        }
        DashboardStats::Leader(s) => {
            let cards = vec![
                StatCard::count("Project Tasks", s.total_tasks),
                StatCard::count("Completed", s.completed_tasks),
                StatCard::count("In Progress", s.in_progress_tasks),
                StatCard::count("Overdue Tasks", s.overdue_tasks),
            ];
            (cards, success_rate(s.completed_tasks, s.total_tasks), Vec::new())
        }
        DashboardStats::Member(s) => {
            let tracked = s
                .completed_tasks
                .saturating_add(s.in_progress_tasks)
                .saturating_add(s.todo_tasks)
                .saturating_add(s.overdue_tasks);
            let cards = vec![
                StatCard::count("My Completed", s.completed_tasks),
                StatCard::percent("Success Rate", success_rate(s.completed_tasks, tracked)),
                StatCard::count("Pending", s.in_progress_tasks),
                StatCard::count("Overdue", s.overdue_tasks),
            ];
            (cards, success_rate(s.completed_tasks, s.total_assigned), Vec::new())
        }
    };

    DashboardView {
        role: snapshot.stats.role(),
        stats,
        progress_percent,
        recent_items: snapshot.recent_items.clone(),
        performances: rank_performances(snapshot.stats.performances()),
        project_mismatches,
    }
}
