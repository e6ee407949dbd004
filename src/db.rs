use crate::error::{PlanError, Result};
use crate::models::{Project, TaskItem, parse_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

/// Database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database connection
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Project deletion cascades to tasks
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Database { conn })
    }

    /// Initialize the database schema
    pub fn init(&self) -> Result<()> {
        self.create_tables()?;
        self.create_indexes()?;
        Ok(())
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%S', 'now'))
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                due_date TEXT,
                estimated_hours INTEGER CHECK (estimated_hours IS NULL OR estimated_hours BETWEEN 1 AND 200),
                is_completed INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn create_indexes(&self) -> Result<()> {
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_projects_created_at ON projects(created_at)",
            [],
        )?;
        Ok(())
    }

    /// Check if database is initialized
    pub fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('projects', 'tasks')",
            [],
            |row| row.get(0),
        )?;
        Ok(count == 2)
    }

    // ==================== Project Operations ====================

    pub fn create_project(&self, title: &str, description: Option<&str>) -> Result<Project> {
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO projects (title, description, created_at) VALUES (?1, ?2, ?3)",
            (title, description, &now),
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_project(id)?.ok_or(PlanError::ProjectNotFound(id))
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.conn
            .query_row(
                "SELECT id, title, description, created_at FROM projects WHERE id = ?1",
                [id],
                project_from_row,
            )
            .optional()
            .map_err(|e| e.into())
    }

    /// All projects, newest first
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, created_at
             FROM projects
             ORDER BY created_at DESC, id DESC",
        )?;

        let projects = stmt.query_map([], project_from_row)?;
        projects
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| e.into())
    }

    pub fn update_project(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<Project> {
        let tx = self.conn.unchecked_transaction()?;
        if let Some(t) = title {
            tx.execute("UPDATE projects SET title = ?1 WHERE id = ?2", (t, id))?;
        }

        if let Some(d) = description {
            tx.execute("UPDATE projects SET description = ?1 WHERE id = ?2", (d, id))?;
        }
        tx.commit()?;

        self.get_project(id)?.ok_or(PlanError::ProjectNotFound(id))
    }

    /// Returns false when no such project existed
    pub fn delete_project(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // ==================== Task Operations ====================

    pub fn create_task(
        &self,
        project_id: i64,
        title: &str,
        due_date: Option<DateTime<Utc>>,
        estimated_hours: Option<i64>,
    ) -> Result<TaskItem> {
        self.conn.execute(
            "INSERT INTO tasks (project_id, title, due_date, estimated_hours)
             VALUES (?1, ?2, ?3, ?4)",
            (
                project_id,
                title,
                due_date.map(|d| d.to_rfc3339()),
                estimated_hours,
            ),
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_task(id)?.ok_or(PlanError::TaskNotFound(id))
    }

    pub fn get_task(&self, id: i64) -> Result<Option<TaskItem>> {
        self.conn
            .query_row(
                "SELECT id, project_id, title, due_date, estimated_hours, is_completed
                 FROM tasks WHERE id = ?1",
                [id],
                task_from_row,
            )
            .optional()
            .map_err(|e| e.into())
    }

    pub fn tasks_for_project(&self, project_id: i64) -> Result<Vec<TaskItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, due_date, estimated_hours, is_completed
             FROM tasks
             WHERE project_id = ?1
             ORDER BY id",
        )?;

        let tasks = stmt.query_map([project_id], task_from_row)?;
        tasks
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| e.into())
    }

    pub fn update_task(
        &self,
        id: i64,
        title: Option<&str>,
        due_date: Option<Option<DateTime<Utc>>>,
        estimated_hours: Option<Option<i64>>,
    ) -> Result<TaskItem> {
        // All fields land together or not at all
        let tx = self.conn.unchecked_transaction()?;
        if let Some(t) = title {
            tx.execute("UPDATE tasks SET title = ?1 WHERE id = ?2", (t, id))?;
        }

        if let Some(d) = due_date {
            tx.execute(
                "UPDATE tasks SET due_date = ?1 WHERE id = ?2",
                (d.map(|d| d.to_rfc3339()), id),
            )?;
        }

        if let Some(h) = estimated_hours {
            tx.execute("UPDATE tasks SET estimated_hours = ?1 WHERE id = ?2", (h, id))?;
        }
        tx.commit()?;

        self.get_task(id)?.ok_or(PlanError::TaskNotFound(id))
    }

    pub fn set_task_completed(&self, id: i64, completed: bool) -> Result<TaskItem> {
        self.conn.execute(
            "UPDATE tasks SET is_completed = ?1 WHERE id = ?2",
            (completed, id),
        )?;
        self.get_task(id)?.ok_or(PlanError::TaskNotFound(id))
    }

    /// Returns false when no such task existed
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // ==================== Config Operations ====================

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| e.into())
    }

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }

    pub fn delete_config(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }
}

// ==================== Row Parsers ====================

fn project_from_row(row: &Row) -> std::result::Result<Project, rusqlite::Error> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: column_timestamp(3, row.get(3)?)?,
    })
}

fn task_from_row(row: &Row) -> std::result::Result<TaskItem, rusqlite::Error> {
    Ok(TaskItem {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        due_date: row
            .get::<_, Option<String>>(3)?
            .map(|s| column_timestamp(3, s))
            .transpose()?,
        estimated_hours: row.get(4)?,
        is_completed: row.get(5)?,
    })
}

fn column_timestamp(idx: usize, s: String) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    parse_timestamp(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            )),
        )
    })
}
