//! Dependency-aware schedule building.
//!
//! Turns a task list into a topological execution order with deterministic
//! tie-breaking, then lays the ordered tasks end to end on a single-worker
//! timeline anchored at 09:00 UTC of the current day.

use crate::error::ScheduleError;
use crate::models::{
    DEFAULT_ESTIMATED_HOURS, ScheduleRequest, ScheduleResult, ScheduleTaskInput, ScheduledTask,
    TaskDefinition, TaskItem,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::debug;

/// Hour of day (UTC) at which the timeline starts
pub const WORKDAY_START_HOUR: i64 = 9;

/// A ready task keyed by the tie-break comparator
#[derive(Debug, Clone)]
struct ReadyTask {
    due_date: Option<DateTime<Utc>>,
    estimated_hours: i64,
    key: String,
    index: usize,
}

impl Eq for ReadyTask {}

impl PartialEq for ReadyTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl ReadyTask {
    /// Ascending sequence order: due date (missing sorts last), estimate, title,
    /// then input position.
    fn sequence_cmp(&self, other: &Self) -> Ordering {
        let due = match (self.due_date, other.due_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        due.then_with(|| self.estimated_hours.cmp(&other.estimated_hours))
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl Ord for ReadyTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other.sequence_cmp(self)
    }
}

impl PartialOrd for ReadyTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Build a schedule anchored at the current wall clock.
pub fn build_schedule(
    source: &[TaskItem],
    request: Option<&ScheduleRequest>,
) -> Result<ScheduleResult, ScheduleError> {
    build_schedule_at(source, request, Utc::now())
}

/// Build a schedule anchored at `now`.
///
/// A non-empty override list in `request` replaces `source` entirely.
pub fn build_schedule_at(
    source: &[TaskItem],
    request: Option<&ScheduleRequest>,
    now: DateTime<Utc>,
) -> Result<ScheduleResult, ScheduleError> {
    let overrides = request
        .and_then(|r| r.tasks.as_deref())
        .filter(|tasks| !tasks.is_empty());

    let tasks = match overrides {
        Some(inputs) => normalize_inputs(inputs)?,
        None => normalize_source(source),
    };

    let ordered = resolve_order(tasks)?;
    let timeline = build_timeline(&ordered, anchor_for(now))?;
    let recommended_order = ordered.into_iter().map(|t| t.title).collect();

    Ok(ScheduleResult {
        recommended_order,
        timeline,
    })
}

/// Normalize caller-supplied definitions.
pub fn normalize_inputs(inputs: &[ScheduleTaskInput]) -> Result<Vec<TaskDefinition>, ScheduleError> {
    inputs
        .iter()
        .map(|input| {
            let title = input.title.trim();
            if title.is_empty() {
                return Err(ScheduleError::BlankTitle);
            }

            let mut seen: HashSet<String> = HashSet::new();
            let dependencies = input
                .dependencies
                .iter()
                .flatten()
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .filter(|d| seen.insert(d.to_lowercase()))
                .map(str::to_string)
                .collect();

            Ok(TaskDefinition {
                title: title.to_string(),
                estimated_hours: input.estimated_hours.max(1),
                due_date: input.due_date,
                dependencies,
            })
        })
        .collect()
}

/// Derive definitions from stored tasks. Stored tasks carry no dependencies.
pub fn normalize_source(source: &[TaskItem]) -> Vec<TaskDefinition> {
    source
        .iter()
        .map(|task| TaskDefinition {
            title: task.title.clone(),
            estimated_hours: task.estimated_hours.unwrap_or(DEFAULT_ESTIMATED_HOURS).max(1),
            due_date: task.due_date,
            dependencies: Vec::new(),
        })
        .collect()
}

/// Validate the definitions and return them in execution order.
pub fn resolve_order(tasks: Vec<TaskDefinition>) -> Result<Vec<TaskDefinition>, ScheduleError> {
    if tasks.is_empty() {
        return Err(ScheduleError::NoTasks);
    }

    let mut lookup: HashMap<String, usize> = HashMap::with_capacity(tasks.len());
    for (index, task) in tasks.iter().enumerate() {
        if lookup.insert(task.title.to_lowercase(), index).is_some() {
            return Err(ScheduleError::DuplicateTitle(task.title.clone()));
        }
    }

    let mut in_degree: Vec<usize> = vec![0; tasks.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];

    for (index, task) in tasks.iter().enumerate() {
        for dependency in &task.dependencies {
            let Some(&dep_index) = lookup.get(&dependency.to_lowercase()) else {
                return Err(ScheduleError::UnknownDependency {
                    dependency: dependency.clone(),
                    task: task.title.clone(),
                });
            };
            in_degree[index] += 1;
            dependents[dep_index].push(index);
        }
    }

    let ready_task = |index: usize| {
        let task = &tasks[index];
        ReadyTask {
            due_date: task.due_date,
            estimated_hours: task.estimated_hours,
            key: task.title.to_uppercase(),
            index,
        }
    };

    let mut ready: BinaryHeap<ReadyTask> = (0..tasks.len())
        .filter(|&i| in_degree[i] == 0)
        .map(ready_task)
        .collect();

    let mut order: Vec<usize> = Vec::with_capacity(tasks.len());
    while let Some(next) = ready.pop() {
        order.push(next.index);
        for &dependent in &dependents[next.index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(ready_task(dependent));
            }
        }
    }

    if order.len() < tasks.len() {
        let titles = tasks
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, t)| t.title.clone())
            .collect();
        return Err(ScheduleError::CircularDependency { titles });
    }

    let mut slots: Vec<Option<TaskDefinition>> = tasks.into_iter().map(Some).collect();
    let ordered: Vec<TaskDefinition> = order.into_iter().filter_map(|i| slots[i].take()).collect();

    debug!(
        order = ?ordered.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
        "resolved schedule order"
    );

    Ok(ordered)
}

/// Today's date of `now` at the workday start hour, UTC.
pub fn anchor_for(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc() + Duration::hours(WORKDAY_START_HOUR)
}

/// Lay ordered tasks back to back starting at `anchor`.
pub fn build_timeline(
    ordered: &[TaskDefinition],
    anchor: DateTime<Utc>,
) -> Result<Vec<ScheduledTask>, ScheduleError> {
    let mut cursor = anchor;
    let mut timeline = Vec::with_capacity(ordered.len());

    for task in ordered {
        let hours = task.estimated_hours.max(1);
        let start = cursor;
        let finish = Duration::try_hours(hours)
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(|| ScheduleError::TimelineOverflow(task.title.clone()))?;
        cursor = finish;

        timeline.push(ScheduledTask {
            title: task.title.clone(),
            start_on: start,
            finish_on: finish,
            estimated_hours: hours,
            due_date: task.due_date,
            dependencies: task.dependencies.clone(),
        });
    }

    Ok(timeline)
}
