use thiserror::Error;

/// Reasons a set of task definitions cannot be turned into a schedule.
///
/// Every variant is a malformed request, never a transient condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("No tasks available to build a schedule.")]
    NoTasks,

    #[error("Duplicate task title detected: {0}")]
    DuplicateTitle(String),

    #[error("Unknown dependency '{dependency}' referenced by task '{task}'.")]
    UnknownDependency { dependency: String, task: String },

    #[error("Circular dependency detected among tasks: {titles}", titles = .titles.join(", "))]
    CircularDependency { titles: Vec<String> },

    #[error("Task title cannot be blank.")]
    BlankTitle,

    #[error("Timeline for task '{0}' runs past the representable date range.")]
    TimelineOverflow(String),
}

impl ScheduleError {
    /// Stable name of the error kind, used as the machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            ScheduleError::NoTasks => "NoTasks",
            ScheduleError::DuplicateTitle(_) => "DuplicateTitle",
            ScheduleError::UnknownDependency { .. } => "UnknownDependency",
            ScheduleError::CircularDependency { .. } => "CircularDependency",
            ScheduleError::BlankTitle => "BlankTitle",
            ScheduleError::TimelineOverflow(_) => "TimelineOverflow",
        }
    }
}

/// All possible errors in the planner
#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("Project #{0} not found")]
    ProjectNotFound(i64),

    #[error("Task #{0} not found")]
    TaskNotFound(i64),

    #[error("No project selected. Pass --project or run `taskplan project use <id>` first.")]
    NoActiveProject,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid timestamp '{0}', expected ISO-8601 (e.g. 2024-05-01 or 2024-05-01T17:00:00Z)")]
    InvalidTimestamp(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database not initialized. Run `taskplan init` first.")]
    NotInitialized,

    #[error("Database already initialized")]
    AlreadyInitialized,

    #[error("MCP error: {0}")]
    Mcp(String),
}

impl PlanError {
    /// Machine-readable error code for JSON envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::Schedule(e) => e.kind(),
            PlanError::ProjectNotFound(_) => "ProjectNotFound",
            PlanError::TaskNotFound(_) => "TaskNotFound",
            PlanError::NoActiveProject => "NoActiveProject",
            PlanError::Validation(_) => "Validation",
            PlanError::InvalidTimestamp(_) => "InvalidTimestamp",
            PlanError::Db(_) => "Db",
            PlanError::Io(_) => "Io",
            PlanError::Json(_) => "Json",
            PlanError::NotInitialized => "NotInitialized",
            PlanError::AlreadyInitialized => "AlreadyInitialized",
            PlanError::Mcp(_) => "Mcp",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PlanError>;
