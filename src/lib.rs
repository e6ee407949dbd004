pub mod cli;
pub mod cli_handlers;
pub mod core;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod schedule;

pub use error::{PlanError, Result, ScheduleError};
pub use models::*;
