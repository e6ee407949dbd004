use crate::error::{PlanError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Estimate assumed for stored tasks that carry none
pub const DEFAULT_ESTIMATED_HOURS: i64 = 4;

/// Upper bound accepted for estimates saved in the store
pub const MAX_ESTIMATED_HOURS: i64 = 200;

/// A project owning a list of tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A persisted task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<i64>,
    pub is_completed: bool,
}

/// Project with its tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<TaskItem>,
}

/// New task input
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<i64>,
}

/// Task update input. `Some(None)` clears a field.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_hours: Option<Option<i64>>,
}

// ==================== Scheduling ====================

/// One task as supplied by a caller overriding the stored task list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTaskInput {
    pub title: String,
    #[serde(default)]
    pub estimated_hours: i64,
    #[serde(default, with = "optional_timestamp")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

/// Optional override payload for a schedule run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub tasks: Option<Vec<ScheduleTaskInput>>,
}

/// A normalized task ready for ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub title: String,
    pub estimated_hours: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub dependencies: Vec<String>,
}

/// A task placed on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub title: String,
    pub start_on: DateTime<Utc>,
    pub finish_on: DateTime<Utc>,
    pub estimated_hours: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub dependencies: Vec<String>,
}

/// Output of a schedule run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub recommended_order: Vec<String>,
    pub timeline: Vec<ScheduledTask>,
}

/// Schedule result tagged with the project it was built for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSchedule {
    pub project_id: i64,
    pub title: String,
    #[serde(flatten)]
    pub schedule: ScheduleResult,
}

// ==================== Timestamps ====================

/// Parse an ISO-8601 timestamp, normalizing to UTC.
///
/// Accepts RFC 3339 with any offset, naive date-times (taken as UTC) and
/// bare dates (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ndt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(PlanError::InvalidTimestamp(s.to_string()))
}

/// Serde adapter for optional ISO-8601 fields
pub mod optional_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.trim().is_empty() => super::parse_timestamp(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_and_date_only() {
        assert_eq!(
            parse_timestamp("2024-05-01T08:30:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-05-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("next tuesday"),
            Err(PlanError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_schedule_request_from_json() {
        let json = r#"{
            "tasks": [
                {"title": "Design", "estimatedHours": 3, "dueDate": "2024-06-01"},
                {"title": "Build", "dependencies": ["Design"]}
            ]
        }"#;
        let request: ScheduleRequest = serde_json::from_str(json).unwrap();
        let tasks = request.tasks.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].estimated_hours, 3);
        assert_eq!(
            tasks[0].due_date,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(tasks[1].estimated_hours, 0);
        assert_eq!(tasks[1].due_date, None);
        assert_eq!(tasks[1].dependencies, Some(vec!["Design".to_string()]));
    }

    #[test]
    fn test_schedule_result_json_is_camel_case() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let result = ScheduleResult {
            recommended_order: vec!["A".to_string()],
            timeline: vec![ScheduledTask {
                title: "A".to_string(),
                start_on: start,
                finish_on: start + chrono::Duration::hours(2),
                estimated_hours: 2,
                due_date: None,
                dependencies: vec![],
            }],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["recommendedOrder"][0], "A");
        assert_eq!(value["timeline"][0]["estimatedHours"], 2);
        assert!(value["timeline"][0]["startOn"].is_string());
        assert!(value["timeline"][0]["dueDate"].is_null());
    }
}
