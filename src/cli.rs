use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "taskplan")]
#[command(about = "Project and task tracker with dependency-aware scheduling")]
#[command(version)]
pub struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, env = "TASKPLAN_DB", default_value = "taskplan.db")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Build an ordered schedule for a project
    Schedule {
        /// Project ID (defaults to the active project)
        #[arg(long)]
        project: Option<i64>,
        /// JSON file with a task/dependency override list
        #[arg(long)]
        input: Option<PathBuf>,
        /// Print the schedule as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start MCP server
    Mcp,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create a project
    Add {
        /// Project title
        title: String,
        /// Optional description
        #[arg(long)]
        desc: Option<String>,
    },

    /// List projects, newest first
    List,

    /// Show a project and its tasks
    Show {
        /// Project ID
        id: i64,
    },

    /// Edit a project
    Edit {
        /// Project ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long, conflicts_with = "no_desc")]
        desc: Option<String>,
        /// Clear description
        #[arg(long)]
        no_desc: bool,
    },

    /// Delete a project and all of its tasks
    Delete {
        /// Project ID
        id: i64,
    },

    /// Set or view the active project
    Use {
        /// Project ID (omit to view the active project)
        id: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task to a project
    Add {
        /// Task title
        title: String,
        /// Project ID (defaults to the active project)
        #[arg(long)]
        project: Option<i64>,
        /// Due date (ISO-8601, e.g. 2024-05-01 or 2024-05-01T17:00:00Z)
        #[arg(long)]
        due: Option<String>,
        /// Estimated hours (1-200)
        #[arg(long)]
        hours: Option<i64>,
    },

    /// Edit a task
    Edit {
        /// Task ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New due date
        #[arg(long, conflicts_with = "no_due")]
        due: Option<String>,
        /// Clear due date
        #[arg(long)]
        no_due: bool,
        /// New estimate
        #[arg(long, conflicts_with = "no_hours")]
        hours: Option<i64>,
        /// Clear estimate
        #[arg(long)]
        no_hours: bool,
    },

    /// Toggle a task's completion
    Toggle {
        /// Task ID
        id: i64,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },
}
