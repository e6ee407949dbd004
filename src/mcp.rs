use crate::core::Planner;
use crate::error::PlanError;
use crate::models::{
    NewTask, ProjectSchedule, ScheduleRequest, ScheduleTaskInput, TaskItem, TaskUpdate,
    parse_timestamp,
};
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt, handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters, model::*, schemars, tool, tool_handler, tool_router,
    transport::stdio,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Task planner MCP server
#[derive(Clone)]
pub struct PlannerMcp {
    planner: Arc<Mutex<Planner>>,
    tool_router: ToolRouter<Self>,
}

// Input types for tools
#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateProjectInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProjectIdInput {
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TaskIdInput {
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddTaskInput {
    /// Defaults to the active project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub title: String,
    /// ISO-8601 timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EditTaskInput {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// ISO-8601 timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<i64>,
    /// Remove the due date; wins over `due_date`
    #[serde(default)]
    pub clear_due_date: bool,
    /// Remove the estimate; wins over `estimated_hours`
    #[serde(default)]
    pub clear_estimate: bool,
}

impl EditTaskInput {
    fn to_update(self) -> Result<TaskUpdate, PlanError> {
        let due_date = if self.clear_due_date {
            Some(None)
        } else {
            self.due_date
                .as_deref()
                .map(parse_timestamp)
                .transpose()?
                .map(Some)
        };
        let estimated_hours = if self.clear_estimate {
            Some(None)
        } else {
            self.estimated_hours.map(Some)
        };

        Ok(TaskUpdate {
            title: self.title,
            due_date,
            estimated_hours,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTaskParam {
    pub title: String,
    #[serde(default)]
    pub estimated_hours: i64,
    /// ISO-8601 timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Titles of tasks that must finish first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BuildScheduleInput {
    /// Defaults to the active project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    /// Overrides the project's stored tasks when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<ScheduleTaskParam>>,
}

impl BuildScheduleInput {
    fn to_request(&self) -> Result<Option<ScheduleRequest>, PlanError> {
        let Some(tasks) = &self.tasks else {
            return Ok(None);
        };

        let tasks = tasks
            .iter()
            .map(|t| -> Result<ScheduleTaskInput, PlanError> {
                Ok(ScheduleTaskInput {
                    title: t.title.clone(),
                    estimated_hours: t.estimated_hours,
                    due_date: t.due_date.as_deref().map(parse_timestamp).transpose()?,
                    dependencies: t.dependencies.clone(),
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        Ok(Some(ScheduleRequest { tasks: Some(tasks) }))
    }
}

// Response type
#[derive(Debug, Serialize)]
pub struct McpResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> McpResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "ok",
            data: Some(data),
            error_code: None,
            message: None,
        }
    }

    pub fn error(error_code: &str, message: &str) -> Self {
        Self {
            status: "error",
            data: None,
            error_code: Some(error_code.to_string()),
            message: Some(message.to_string()),
        }
    }
}

fn to_json<T: Serialize>(response: McpResponse<T>) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string(&response)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn respond<T: Serialize>(result: Result<T, PlanError>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(data) => to_json(McpResponse::success(data)),
        Err(e) => to_json(McpResponse::<serde_json::Value>::error(
            e.code(),
            &e.to_string(),
        )),
    }
}

fn message(text: String) -> serde_json::Value {
    serde_json::json!({ "message": text })
}

#[tool_router]
impl PlannerMcp {
    pub fn new(db: &Path) -> Result<Self, PlanError> {
        let planner = Planner::open(db)?;
        Ok(Self {
            planner: Arc::new(Mutex::new(planner)),
            tool_router: Self::tool_router(),
        })
    }

    #[tool(description = "List all projects, newest first.")]
    async fn list_projects(&self) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        respond(planner.list_projects())
    }

    #[tool(description = "Create a project. Titles must be 3-100 characters.")]
    async fn create_project(
        &self,
        params: Parameters<CreateProjectInput>,
    ) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        let p = params.0;
        respond(planner.create_project(&p.title, p.description.as_deref()))
    }

    #[tool(description = "Show a project with all of its tasks.")]
    async fn show_project(
        &self,
        params: Parameters<ProjectIdInput>,
    ) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        respond(planner.get_project(params.0.id))
    }

    #[tool(description = "Delete a project and all of its tasks.")]
    async fn delete_project(
        &self,
        params: Parameters<ProjectIdInput>,
    ) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        let id = params.0.id;
        respond(
            planner
                .delete_project(id)
                .map(|()| message(format!("Deleted project #{id}"))),
        )
    }

    #[tool(
        description = "Add a task to a project. Estimated hours must be 1-200 when given; due_date is ISO-8601."
    )]
    async fn add_task(&self, params: Parameters<AddTaskInput>) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        let p = params.0;

        let result = (|| -> Result<TaskItem, PlanError> {
            let project_id = planner.resolve_project(p.project_id)?;
            let due_date = p.due_date.as_deref().map(parse_timestamp).transpose()?;
            planner.add_task(
                project_id,
                NewTask {
                    title: p.title,
                    due_date,
                    estimated_hours: p.estimated_hours,
                },
            )
        })();
        respond(result)
    }

    #[tool(
        description = "Edit a task's title, due date or estimate. Only the fields you provide will be changed."
    )]
    async fn edit_task(
        &self,
        params: Parameters<EditTaskInput>,
    ) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        let p = params.0;
        let id = p.id;

        let result = p
            .to_update()
            .and_then(|update| planner.update_task(id, update));
        respond(result)
    }

    #[tool(description = "Toggle a task between open and completed.")]
    async fn toggle_task(
        &self,
        params: Parameters<TaskIdInput>,
    ) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        respond(planner.toggle_task(params.0.id))
    }

    #[tool(description = "Delete a task.")]
    async fn delete_task(
        &self,
        params: Parameters<TaskIdInput>,
    ) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        let id = params.0.id;
        respond(
            planner
                .delete_task(id)
                .map(|()| message(format!("Deleted task #{id}"))),
        )
    }

    #[tool(
        description = "Build a dependency-respecting schedule. Without tasks, the project's stored tasks are used (no dependencies, 4h default estimate). With tasks, dependencies name other tasks by title (case-insensitive). Returns recommendedOrder and a timeline starting today at 09:00 UTC."
    )]
    async fn build_schedule(
        &self,
        params: Parameters<BuildScheduleInput>,
    ) -> Result<CallToolResult, McpError> {
        let planner = self.planner.lock().await;
        let p = params.0;

        let result = (|| -> Result<ProjectSchedule, PlanError> {
            let project_id = planner.resolve_project(p.project_id)?;
            let request = p.to_request()?;
            planner.build_schedule(project_id, request.as_ref())
        })();

        if let Err(ref e) = result {
            warn!(error = %e, "schedule rejected");
        }
        respond(result)
    }
}

#[tool_handler]
impl ServerHandler for PlannerMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Task Planner - projects, tasks and dependency-aware schedules. \
                 Typical workflow: 1) create_project, 2) add_task for each piece of work, \
                 3) build_schedule, optionally passing tasks with dependencies to plan their order."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_mcp_server(db: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mcp = PlannerMcp::new(db).inspect_err(|e| {
        eprintln!("Failed to initialize MCP server: {e}");
    })?;

    info!(db = %db.display(), "starting MCP server on stdio");
    let service = mcp.serve(stdio()).await.inspect_err(|e| {
        eprintln!("Error starting MCP server: {e}");
    })?;

    service.waiting().await?;
    Ok(())
}
