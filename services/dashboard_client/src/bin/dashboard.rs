//! services/dashboard_client/src/bin/dashboard.rs
//!
//! Command-line entry point. Every command prints pretty JSON on stdout;
//! logs go to stderr.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dashboard_client_lib::{config::Config, error::ClientError, state::AppState};
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use task_dashboard_core::domain::{NewProject, Project, ProjectStatus, Task, TaskStatus};
use task_dashboard_core::view_model::{filter_projects, sort_tasks_by_status, ProjectBoard};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "dashboard", about = "Project and task dashboard client", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session from an identity-provider refresh token.
    Login {
        #[arg(long, env = "DASHBOARD_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },
    /// Drop the stored session.
    Logout,
    /// Show the signed-in user's profile.
    Whoami,
    /// Show the dashboard for the signed-in role.
    Dashboard,
    /// List projects.
    Projects {
        /// Case-insensitive name search.
        #[arg(long)]
        search: Option<String>,
        /// Exact status, e.g. ACTIVE or "on hold".
        #[arg(long)]
        status: Option<String>,
    },
    /// Projects grouped into active, overdue and upcoming.
    Board,
    /// Open a project and list its tasks.
    Project { id: Uuid },
    /// List tasks, either your own or a project's.
    Tasks {
        #[arg(long)]
        project: Option<Uuid>,
    },
    CreateProject {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Start date, YYYY-MM-DD.
        #[arg(long)]
        start: Option<NaiveDate>,
        /// End date, YYYY-MM-DD.
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Move a task to TODO, IN_PROGRESS or DONE.
    SetTaskStatus { id: Uuid, status: String },
}

#[derive(Serialize)]
struct ProjectDetail {
    project: Project,
    tasks: Vec<Task>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!(api = %config.api_url, "configuration loaded");

    // --- 2. Wire Adapters ---
    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            error!("failed to initialise client: {e}");
            return ExitCode::FAILURE;
        }
    };

    // --- 3. Run the Command ---
    match run(&state, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if state.sign_out.was_signed_out() {
                let reason = state.sign_out.reason().unwrap_or_default();
                eprintln!("Signed out ({reason}). Run `dashboard login` to start a new session.");
            } else {
                eprintln!("error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, command: Command) -> Result<(), ClientError> {
    let api = &state.api;
    let today = chrono::Local::now().date_naive();

    match command {
        Command::Login { refresh_token } => {
            state.config.require_identity_api_key()?;
            let id_token = state
                .identity
                .sign_in_with_refresh_token(&refresh_token)
                .await?
                .ok_or_else(|| {
                    ClientError::InvalidInput(
                        "the identity provider rejected the refresh token".to_string(),
                    )
                })?;
            print_json(&api.login(&id_token).await?)
        }
        Command::Logout => {
            state.identity.sign_out()?;
            print_json(&serde_json::json!({ "signedOut": true }))
        }
        Command::Whoami => print_json(&api.current_user().await?),
        Command::Dashboard => print_json(&api.load_dashboard(today).await?),
        Command::Projects { search, status } => {
            let status = status.as_deref().map(ProjectStatus::parse);
            let projects = api.projects().await?;
            print_json(&filter_projects(&projects, search.as_deref(), status.as_ref()))
        }
        Command::Board => {
            let board = ProjectBoard::build(&api.projects().await?, today);
            print_json(&serde_json::json!({ "counts": board.counts(), "board": board }))
        }
        Command::Project { id } => {
            let (project, mut tasks) = futures::try_join!(api.project(id), api.project_tasks(id))?;
            sort_tasks_by_status(&mut tasks);
            print_json(&ProjectDetail { project, tasks })
        }
        Command::Tasks { project } => {
            let mut tasks = match project {
                Some(id) => api.project_tasks(id).await?,
                None => api.my_tasks().await?,
            };
            sort_tasks_by_status(&mut tasks);
            print_json(&tasks)
        }
        Command::CreateProject {
            name,
            description,
            start,
            end,
        } => {
            if let (Some(start), Some(end)) = (start, end) {
                if end < start {
                    return Err(ClientError::InvalidInput(
                        "--end must not be before --start".to_string(),
                    ));
                }
            }
            let payload = NewProject {
                name,
                description,
                start_date: start,
                end_date: end,
            };
            print_json(&api.create_project(&payload).await?)
        }
        Command::SetTaskStatus { id, status } => {
            print_json(&api.update_task_status(id, &TaskStatus::parse(&status)).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ClientError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
