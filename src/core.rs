use crate::db::Database;
use crate::error::{PlanError, Result};
use crate::models::{
    MAX_ESTIMATED_HOURS, NewTask, Project, ProjectDetail, ProjectSchedule, ScheduleRequest,
    TaskItem, TaskUpdate,
};
use crate::schedule;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const ACTIVE_PROJECT_KEY: &str = "active_project";

/// Core business logic
pub struct Planner {
    db: Database,
}

impl Planner {
    /// Open database at specific path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(Planner { db })
    }

    /// Open an existing, initialized database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Connection::open would create an empty file
        if !path.as_ref().exists() {
            return Err(PlanError::NotInitialized);
        }
        let planner = Self::open_at(path)?;
        if !planner.is_initialized()? {
            return Err(PlanError::NotInitialized);
        }
        Ok(planner)
    }

    /// Check if initialized
    pub fn is_initialized(&self) -> Result<bool> {
        self.db.is_initialized()
    }

    /// Initialize the database
    pub fn init(&self) -> Result<()> {
        self.db.init()
    }

    // ==================== Project Operations ====================

    pub fn create_project(&self, title: &str, description: Option<&str>) -> Result<Project> {
        let title = validate_project_title(title)?;
        let description = validate_description(description)?;
        let project = self.db.create_project(&title, description.as_deref())?;
        info!(project_id = project.id, title = %project.title, "created project");
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.db.list_projects()
    }

    pub fn get_project(&self, id: i64) -> Result<ProjectDetail> {
        let project = self
            .db
            .get_project(id)?
            .ok_or(PlanError::ProjectNotFound(id))?;
        let tasks = self.db.tasks_for_project(id)?;
        Ok(ProjectDetail { project, tasks })
    }

    pub fn update_project(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<Project> {
        self.require_project(id)?;
        let title = title.map(validate_project_title).transpose()?;
        let description = description.map(validate_description).transpose()?;
        self.db.update_project(
            id,
            title.as_deref(),
            description.as_ref().map(|d| d.as_deref()),
        )
    }

    /// Delete a project and its tasks
    pub fn delete_project(&self, id: i64) -> Result<()> {
        if !self.db.delete_project(id)? {
            return Err(PlanError::ProjectNotFound(id));
        }
        if self.get_active_project()? == Some(id) {
            self.db.delete_config(ACTIVE_PROJECT_KEY)?;
        }
        info!(project_id = id, "deleted project");
        Ok(())
    }

    // ==================== Active Project ====================

    pub fn set_active_project(&self, id: i64) -> Result<()> {
        self.require_project(id)?;
        self.db.set_config(ACTIVE_PROJECT_KEY, &id.to_string())
    }

    pub fn get_active_project(&self) -> Result<Option<i64>> {
        match self.db.get_config(ACTIVE_PROJECT_KEY)? {
            Some(val) => Ok(Some(val.parse().map_err(|_| {
                PlanError::Validation(format!("Invalid {ACTIVE_PROJECT_KEY} in config: {val}"))
            })?)),
            None => Ok(None),
        }
    }

    /// Explicit project id, falling back to the active project
    pub fn resolve_project(&self, id: Option<i64>) -> Result<i64> {
        match id {
            Some(id) => Ok(id),
            None => self.get_active_project()?.ok_or(PlanError::NoActiveProject),
        }
    }

    // ==================== Task Operations ====================

    pub fn add_task(&self, project_id: i64, task: NewTask) -> Result<TaskItem> {
        self.require_project(project_id)?;
        let title = validate_task_title(&task.title)?;
        let hours = task.estimated_hours.map(validate_estimate).transpose()?;

        let task = self
            .db
            .create_task(project_id, &title, task.due_date, hours)?;
        info!(task_id = task.id, project_id, title = %task.title, "created task");
        Ok(task)
    }

    pub fn update_task(&self, id: i64, update: TaskUpdate) -> Result<TaskItem> {
        self.require_task(id)?;
        let title = update
            .title
            .as_deref()
            .map(validate_task_title)
            .transpose()?;
        let hours = match update.estimated_hours {
            Some(Some(h)) => Some(Some(validate_estimate(h)?)),
            other => other,
        };

        self.db
            .update_task(id, title.as_deref(), update.due_date, hours)
    }

    /// Flip a task's completion flag
    pub fn toggle_task(&self, id: i64) -> Result<TaskItem> {
        let task = self.require_task(id)?;
        let task = self.db.set_task_completed(id, !task.is_completed)?;
        info!(task_id = id, completed = task.is_completed, "toggled task");
        Ok(task)
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        if !self.db.delete_task(id)? {
            return Err(PlanError::TaskNotFound(id));
        }
        info!(task_id = id, "deleted task");
        Ok(())
    }

    // ==================== Scheduling ====================

    /// Build a schedule for a project, from its stored tasks unless the
    /// request carries a non-empty task list.
    pub fn build_schedule(
        &self,
        project_id: i64,
        request: Option<&ScheduleRequest>,
    ) -> Result<ProjectSchedule> {
        let detail = self.get_project(project_id)?;
        debug!(
            project_id,
            stored = detail.tasks.len(),
            overrides = request.and_then(|r| r.tasks.as_ref()).map_or(0, |t| t.len()),
            "building schedule"
        );

        let schedule = schedule::build_schedule(&detail.tasks, request)?;

        Ok(ProjectSchedule {
            project_id: detail.project.id,
            title: detail.project.title,
            schedule,
        })
    }

    // ==================== Helper Methods ====================

    fn require_project(&self, id: i64) -> Result<Project> {
        self.db.get_project(id)?.ok_or(PlanError::ProjectNotFound(id))
    }

    fn require_task(&self, id: i64) -> Result<TaskItem> {
        self.db.get_task(id)?.ok_or(PlanError::TaskNotFound(id))
    }
}

/// Read a JSON schedule request from disk
pub fn load_schedule_request<P: AsRef<Path>>(path: P) -> Result<ScheduleRequest> {
    let contents = fs::read_to_string(path)?;
    let request = serde_json::from_str(&contents)?;
    Ok(request)
}

fn validate_project_title(title: &str) -> Result<String> {
    let title = title.trim();
    let len = title.chars().count();
    if !(3..=100).contains(&len) {
        return Err(PlanError::Validation(
            "Project title must be between 3 and 100 characters".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn validate_description(description: Option<&str>) -> Result<Option<String>> {
    match description.map(str::trim) {
        Some(d) if d.chars().count() > 500 => Err(PlanError::Validation(
            "Project description must be at most 500 characters".to_string(),
        )),
        Some("") | None => Ok(None),
        Some(d) => Ok(Some(d.to_string())),
    }
}

fn validate_task_title(title: &str) -> Result<String> {
    let title = title.trim();
    let len = title.chars().count();
    if !(1..=200).contains(&len) {
        return Err(PlanError::Validation(
            "Task title must be between 1 and 200 characters".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn validate_estimate(hours: i64) -> Result<i64> {
    if !(1..=MAX_ESTIMATED_HOURS).contains(&hours) {
        return Err(PlanError::Validation(format!(
            "Estimated hours should be between 1 and {MAX_ESTIMATED_HOURS}"
        )));
    }
    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;
    use crate::models::ScheduleTaskInput;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn setup() -> (Planner, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let planner = Planner::open_at(&db_path).unwrap();
        planner.init().unwrap();
        (planner, temp_dir)
    }

    fn new_task(title: &str, hours: Option<i64>) -> NewTask {
        NewTask {
            title: title.to_string(),
            due_date: None,
            estimated_hours: hours,
        }
    }

    #[test]
    fn test_open_requires_init() {
        let temp_dir = TempDir::new().unwrap();
        let result = Planner::open(temp_dir.path().join("missing.db"));
        assert!(matches!(result, Err(PlanError::NotInitialized)));
    }

    #[test]
    fn test_create_project_trims_and_validates() {
        let (planner, _temp) = setup();

        let project = planner
            .create_project("  Website relaunch ", Some("  "))
            .unwrap();
        assert_eq!(project.title, "Website relaunch");
        assert_eq!(project.description, None);

        let result = planner.create_project("ab", None);
        assert!(matches!(result, Err(PlanError::Validation(_))));
    }

    #[test]
    fn test_list_projects_newest_first() {
        let (planner, _temp) = setup();

        let first = planner.create_project("First", None).unwrap();
        let second = planner.create_project("Second", None).unwrap();

        let ids: Vec<i64> = planner
            .list_projects()
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_add_task_validates_estimate() {
        let (planner, _temp) = setup();
        let project = planner.create_project("Website", None).unwrap();

        let task = planner
            .add_task(project.id, new_task(" Copy ", Some(200)))
            .unwrap();
        assert_eq!(task.title, "Copy");
        assert!(!task.is_completed);

        let result = planner.add_task(project.id, new_task("Huge", Some(201)));
        assert!(matches!(result, Err(PlanError::Validation(_))));

        let result = planner.add_task(project.id + 100, new_task("Orphan", None));
        assert!(matches!(result, Err(PlanError::ProjectNotFound(_))));
    }

    #[test]
    fn test_update_and_toggle_task() {
        let (planner, _temp) = setup();
        let project = planner.create_project("Website", None).unwrap();
        let task = planner.add_task(project.id, new_task("Copy", Some(2))).unwrap();

        let due = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        let updated = planner
            .update_task(
                task.id,
                TaskUpdate {
                    title: Some("Write copy".to_string()),
                    due_date: Some(Some(due)),
                    estimated_hours: Some(None),
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Write copy");
        assert_eq!(updated.due_date, Some(due));
        assert_eq!(updated.estimated_hours, None);

        assert!(planner.toggle_task(task.id).unwrap().is_completed);
        assert!(!planner.toggle_task(task.id).unwrap().is_completed);
    }

    #[test]
    fn test_delete_task_and_missing_task() {
        let (planner, _temp) = setup();
        let project = planner.create_project("Website", None).unwrap();
        let task = planner.add_task(project.id, new_task("Copy", None)).unwrap();

        planner.delete_task(task.id).unwrap();
        assert!(matches!(
            planner.delete_task(task.id),
            Err(PlanError::TaskNotFound(_))
        ));
        assert!(matches!(
            planner.toggle_task(task.id),
            Err(PlanError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_active_project_lifecycle() {
        let (planner, _temp) = setup();
        let project = planner.create_project("Website", None).unwrap();

        assert!(matches!(
            planner.resolve_project(None),
            Err(PlanError::NoActiveProject)
        ));

        planner.set_active_project(project.id).unwrap();
        assert_eq!(planner.resolve_project(None).unwrap(), project.id);
        assert_eq!(planner.resolve_project(Some(42)).unwrap(), 42);

        planner.delete_project(project.id).unwrap();
        assert_eq!(planner.get_active_project().unwrap(), None);
    }

    #[test]
    fn test_schedule_from_stored_tasks() {
        let (planner, _temp) = setup();
        let project = planner.create_project("Website", None).unwrap();
        let due = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        planner.add_task(project.id, new_task("Polish", None)).unwrap();
        planner
            .add_task(
                project.id,
                NewTask {
                    title: "Launch".to_string(),
                    due_date: Some(due),
                    estimated_hours: Some(6),
                },
            )
            .unwrap();
        let done = planner.add_task(project.id, new_task("Audit", Some(2))).unwrap();
        planner.toggle_task(done.id).unwrap();

        let result = planner.build_schedule(project.id, None).unwrap();
        assert_eq!(result.project_id, project.id);
        assert_eq!(result.title, "Website");
        assert_eq!(
            result.schedule.recommended_order,
            vec!["Launch", "Audit", "Polish"]
        );
        assert_eq!(result.schedule.timeline[2].estimated_hours, 4);
    }

    #[test]
    fn test_schedule_with_override_request() {
        let (planner, _temp) = setup();
        let project = planner.create_project("Website", None).unwrap();
        planner.add_task(project.id, new_task("Stored", None)).unwrap();

        let request = ScheduleRequest {
            tasks: Some(vec![
                ScheduleTaskInput {
                    title: "Deploy".to_string(),
                    estimated_hours: 1,
                    due_date: None,
                    dependencies: Some(vec!["build".to_string()]),
                },
                ScheduleTaskInput {
                    title: "Build".to_string(),
                    estimated_hours: 3,
                    due_date: None,
                    dependencies: None,
                },
            ]),
        };

        let result = planner.build_schedule(project.id, Some(&request)).unwrap();
        assert_eq!(result.schedule.recommended_order, vec!["Build", "Deploy"]);
    }

    #[test]
    fn test_schedule_errors_surface() {
        let (planner, _temp) = setup();
        let project = planner.create_project("Empty", None).unwrap();

        assert!(matches!(
            planner.build_schedule(project.id, None),
            Err(PlanError::Schedule(ScheduleError::NoTasks))
        ));
        assert!(matches!(
            planner.build_schedule(project.id + 1, None),
            Err(PlanError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_load_schedule_request_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plan.json");
        fs::write(
            &path,
            r#"{"tasks": [{"title": "A", "estimatedHours": 2, "dependencies": []}]}"#,
        )
        .unwrap();

        let request = load_schedule_request(&path).unwrap();
        assert_eq!(request.tasks.unwrap()[0].title, "A");

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_schedule_request(&path),
            Err(PlanError::Json(_))
        ));
    }
}
