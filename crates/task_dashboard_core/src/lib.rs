pub mod domain;
pub mod ports;
pub mod request;
pub mod session;
pub mod view_model;

pub use domain::{
    AdminStats, ContributorStats, DashboardSnapshot, DashboardStats, LeaderStats, MemberStats,
    NewProject, NewTask, Project, ProjectMember, ProjectStatus, RecentItem, Role, Task,
    TaskPriority, TaskStatus, UserProfile, UserSummary,
};
pub use ports::{
    CredentialProvider, CredentialStore, HttpMethod, HttpResponse, HttpTransport,
    OutboundRequest, PortError, PortResult, SessionStore, SignOutHandler,
};
pub use request::{ApiError, ApiErrorKind, ApiResult, RequestClient, RequestDescriptor};
pub use session::{MemorySessionStore, SessionContext};
