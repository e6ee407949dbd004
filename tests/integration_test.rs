use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn taskplan(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("taskplan").unwrap();
    cmd.current_dir(dir).env_remove("TASKPLAN_DB");
    cmd
}

fn init_with_project(dir: &TempDir) {
    taskplan(dir).arg("init").assert().success();
    taskplan(dir)
        .args(["project", "add", "Website relaunch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created project #1"));
    taskplan(dir).args(["project", "use", "1"]).assert().success();
}

#[test]
fn test_init_twice_fails() {
    let temp_dir = TempDir::new().unwrap();

    taskplan(&temp_dir).arg("init").assert().success();
    assert!(temp_dir.path().join("taskplan.db").exists());

    taskplan(&temp_dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_commands_require_init() {
    let temp_dir = TempDir::new().unwrap();

    taskplan(&temp_dir)
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("taskplan init"));
}

#[test]
fn test_schedule_from_stored_tasks() {
    let temp_dir = TempDir::new().unwrap();
    init_with_project(&temp_dir);

    taskplan(&temp_dir)
        .args(["task", "add", "Zeta", "--hours", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task #1"));
    taskplan(&temp_dir)
        .args(["task", "add", "Alpha", "--hours", "2"])
        .assert()
        .success();
    taskplan(&temp_dir)
        .args(["task", "add", "Launch", "--due", "2030-01-01"])
        .assert()
        .success();

    taskplan(&temp_dir)
        .arg("schedule")
        .assert()
        .success()
        .stdout(predicate::str::contains("Order: Launch -> Alpha -> Zeta"));
}

#[test]
fn test_schedule_json_with_override_file() {
    let temp_dir = TempDir::new().unwrap();
    init_with_project(&temp_dir);

    let plan = temp_dir.path().join("plan.json");
    fs::write(
        &plan,
        r#"{"tasks": [
            {"title": "B", "estimatedHours": 3, "dependencies": ["A"]},
            {"title": "A", "estimatedHours": 2}
        ]}"#,
    )
    .unwrap();

    let output = taskplan(&temp_dir)
        .args(["schedule", "--json", "--input"])
        .arg(&plan)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["projectId"], 1);
    assert_eq!(value["title"], "Website relaunch");
    assert_eq!(value["recommendedOrder"], serde_json::json!(["A", "B"]));
    assert_eq!(value["timeline"][0]["finishOn"], value["timeline"][1]["startOn"]);
    assert_eq!(value["timeline"][1]["dependencies"], serde_json::json!(["A"]));
}

#[test]
fn test_schedule_rejects_cycles() {
    let temp_dir = TempDir::new().unwrap();
    init_with_project(&temp_dir);

    let plan = temp_dir.path().join("cycle.json");
    fs::write(
        &plan,
        r#"{"tasks": [
            {"title": "A", "estimatedHours": 1, "dependencies": ["B"]},
            {"title": "B", "estimatedHours": 1, "dependencies": ["A"]}
        ]}"#,
    )
    .unwrap();

    taskplan(&temp_dir)
        .args(["schedule", "--input"])
        .arg(&plan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency"));
}

#[test]
fn test_schedule_empty_project_fails() {
    let temp_dir = TempDir::new().unwrap();
    init_with_project(&temp_dir);

    taskplan(&temp_dir)
        .arg("schedule")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No tasks available"));
}

#[test]
fn test_task_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    init_with_project(&temp_dir);

    taskplan(&temp_dir)
        .args(["task", "add", "Copy", "--hours", "3"])
        .assert()
        .success();
    taskplan(&temp_dir)
        .args(["task", "edit", "1", "--title", "Write copy", "--due", "2030-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write copy"));
    taskplan(&temp_dir)
        .args(["task", "toggle", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));
    taskplan(&temp_dir)
        .args(["project", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Write copy 3h"));
    taskplan(&temp_dir)
        .args(["task", "delete", "1"])
        .assert()
        .success();
    taskplan(&temp_dir)
        .args(["task", "delete", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task #1 not found"));
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    init_with_project(&temp_dir);

    taskplan(&temp_dir)
        .args(["task", "add", "Huge", "--hours", "500"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 200"));
    taskplan(&temp_dir)
        .args(["task", "add", "Later", "--due", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timestamp"));
    taskplan(&temp_dir)
        .args(["project", "add", "ab"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 3 and 100"));
}

#[test]
fn test_db_flag_selects_database() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("custom.db");

    taskplan(&temp_dir)
        .arg("--db")
        .arg(&db)
        .arg("init")
        .assert()
        .success();
    assert!(db.exists());

    taskplan(&temp_dir)
        .arg("--db")
        .arg(&db)
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects found."));
}
