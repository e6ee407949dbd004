use crate::core::{Planner, load_schedule_request};
use crate::error::PlanError;
use crate::models::{NewTask, ProjectSchedule, TaskItem, TaskUpdate, parse_timestamp};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::warn;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Handle the init command
pub fn handle_init(db: &Path) -> Result<(), PlanError> {
    if db.exists() {
        return Err(PlanError::AlreadyInitialized);
    }

    let planner = Planner::open_at(db)?;
    planner.init()?;

    println!("Initialized task planner");
    println!("  - Created: {}", db.display());

    Ok(())
}

// ==================== Projects ====================

pub fn handle_project_add(db: &Path, title: &str, desc: Option<&str>) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    let project = planner.create_project(title, desc)?;
    println!("Created project #{}: {}", project.id, project.title);

    Ok(())
}

pub fn handle_project_list(db: &Path) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    let projects = planner.list_projects()?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    let active = planner.get_active_project()?;
    for project in &projects {
        let marker = if active == Some(project.id) { "*" } else { " " };
        println!(
            "{marker} [#{:>3}] {}  (created {})",
            project.id,
            project.title,
            project.created_at.format(TIME_FORMAT)
        );
    }

    Ok(())
}

pub fn handle_project_show(db: &Path, id: i64) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    let detail = planner.get_project(id)?;
    let project = &detail.project;

    println!("[#{}] {}", project.id, project.title);
    println!("Created:      {}", project.created_at.format(TIME_FORMAT));
    if let Some(ref desc) = project.description {
        println!("Description:  {desc}");
    }

    if detail.tasks.is_empty() {
        println!("Tasks:        (none)");
    } else {
        println!("Tasks:");
        for task in &detail.tasks {
            println!("  {}", format_task(task));
        }
    }

    Ok(())
}

pub fn handle_project_edit(
    db: &Path,
    id: i64,
    title: Option<&str>,
    desc: Option<&str>,
    no_desc: bool,
) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    let description = if no_desc { Some(None) } else { desc.map(Some) };
    let project = planner.update_project(id, title, description)?;
    println!("Updated project #{}: {}", project.id, project.title);

    Ok(())
}

pub fn handle_project_delete(db: &Path, id: i64) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    planner.delete_project(id)?;
    println!("Deleted project #{id}");

    Ok(())
}

pub fn handle_project_use(db: &Path, id: Option<i64>) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    if let Some(project_id) = id {
        planner.set_active_project(project_id)?;
        let detail = planner.get_project(project_id)?;
        println!(
            "Active project: #{} {}",
            detail.project.id, detail.project.title
        );
    } else {
        match planner.get_active_project()? {
            Some(project_id) => {
                let detail = planner.get_project(project_id)?;
                println!(
                    "Active project: #{} {}",
                    detail.project.id, detail.project.title
                );
            }
            None => println!("No active project."),
        }
    }

    Ok(())
}

// ==================== Tasks ====================

pub fn handle_task_add(
    db: &Path,
    title: &str,
    project: Option<i64>,
    due: Option<&str>,
    hours: Option<i64>,
) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    let project_id = planner.resolve_project(project)?;
    let due_date = due.map(parse_timestamp).transpose()?;
    let task = planner.add_task(
        project_id,
        NewTask {
            title: title.to_string(),
            due_date,
            estimated_hours: hours,
        },
    )?;

    println!(
        "Created task #{} in project #{}: {}",
        task.id, task.project_id, task.title
    );

    Ok(())
}

pub fn handle_task_edit(
    db: &Path,
    id: i64,
    title: Option<&str>,
    due: Option<&str>,
    no_due: bool,
    hours: Option<i64>,
    no_hours: bool,
) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    let due_date = if no_due {
        Some(None)
    } else {
        due.map(parse_timestamp).transpose()?.map(Some)
    };
    let estimated_hours = if no_hours { Some(None) } else { hours.map(Some) };

    let task = planner.update_task(
        id,
        TaskUpdate {
            title: title.map(str::to_string),
            due_date,
            estimated_hours,
        },
    )?;
    println!("Updated task {}", format_task(&task));

    Ok(())
}

pub fn handle_task_toggle(db: &Path, id: i64) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    let task = planner.toggle_task(id)?;
    let state = if task.is_completed { "completed" } else { "open" };
    println!("Marked task #{} {}: {}", task.id, state, task.title);

    Ok(())
}

pub fn handle_task_delete(db: &Path, id: i64) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    planner.delete_task(id)?;
    println!("Deleted task #{id}");

    Ok(())
}

// ==================== Schedule ====================

pub fn handle_schedule(
    db: &Path,
    project: Option<i64>,
    input: Option<&Path>,
    json: bool,
) -> Result<(), PlanError> {
    let planner = Planner::open(db)?;

    let project_id = planner.resolve_project(project)?;
    let request = input.map(load_schedule_request).transpose()?;

    let result = planner
        .build_schedule(project_id, request.as_ref())
        .inspect_err(|e| warn!(project_id, error = %e, "schedule rejected"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_schedule(&result);
    }

    Ok(())
}

fn print_schedule(result: &ProjectSchedule) {
    println!("Schedule for #{} {}", result.project_id, result.title);
    println!(
        "Order: {}",
        result.schedule.recommended_order.join(" -> ")
    );
    println!();

    for (position, task) in result.schedule.timeline.iter().enumerate() {
        println!(
            "  {:>2}. {} -> {}  {:>3}h  {}{}{}",
            position + 1,
            task.start_on.format(TIME_FORMAT),
            task.finish_on.format(TIME_FORMAT),
            task.estimated_hours,
            task.title,
            format_due(task.due_date),
            if task.dependencies.is_empty() {
                String::new()
            } else {
                format!(" (after: {})", task.dependencies.join(", "))
            }
        );
    }
}

fn format_task(task: &TaskItem) -> String {
    let icon = if task.is_completed { "✓" } else { "○" };
    let hours = task
        .estimated_hours
        .map(|h| format!(" {h}h"))
        .unwrap_or_default();
    format!(
        "[#{:>3}] {} {}{}{}",
        task.id,
        icon,
        task.title,
        hours,
        format_due(task.due_date)
    )
}

fn format_due(due: Option<DateTime<Utc>>) -> String {
    due.map(|d| format!(" (due {})", d.format(TIME_FORMAT)))
        .unwrap_or_default()
}
