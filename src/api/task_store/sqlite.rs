//! SQLite-based task store with summaries and the audit trail.

use super::{TaskStore, TaskStoreType};
use crate::task::{
    AuditEntry, AuditLevel, ExecutionMode, NewTask, Task, TaskId, TaskStatus, TaskSummaryRecord,
    SUMMARY_PLACEHOLDER,
};
use crate::util::to_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    estimated_steps INTEGER NOT NULL,
    forced_mode TEXT,
    mode TEXT NOT NULL DEFAULT 'investigative',
    status TEXT NOT NULL DEFAULT 'pending',
    plan_presented_at TEXT,
    plan_approved_at TEXT
);

CREATE TABLE IF NOT EXISTS task_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL UNIQUE,
    content TEXT NOT NULL DEFAULT 'TODO',
    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS audit_trail (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    agent TEXT NOT NULL DEFAULT 'system',
    message TEXT NOT NULL,
    level TEXT NOT NULL DEFAULT 'info',
    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_audit_task ON audit_trail(task_id, id);
"#;

const TASK_COLUMNS: &str = "id, title, description, estimated_steps, forced_mode, mode, status,
     plan_presented_at, plan_approved_at";

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create task store dir: {}", e))?;
        }

        // Open database in blocking task
        let path = db_path.clone();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)
                .map_err(|e| format!("Failed to open SQLite database: {}", e))?;

            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("Failed to run schema: {}", e))?;

            // Run migrations for existing databases
            Self::run_migrations(&conn)?;

            Ok::<_, String>(conn)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))??;

        tracing::info!("Opened SQLite task store at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Delete a database file and its WAL side files, if present.
    pub async fn remove_database(db_path: &Path) -> Result<(), String> {
        let base = db_path.to_string_lossy().to_string();
        for path in [base.clone(), format!("{}-wal", base), format!("{}-shm", base)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::info!("Removed {}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(format!("Failed to remove {}: {}", path, e)),
            }
        }
        Ok(())
    }

    /// Run database migrations for existing databases.
    /// CREATE TABLE IF NOT EXISTS doesn't add columns to existing tables,
    /// so we need to handle schema changes manually.
    fn run_migrations(conn: &Connection) -> Result<(), String> {
        // Older databases recorded audit messages without the producing agent
        let has_agent_column: bool = conn
            .prepare("SELECT 1 FROM pragma_table_info('audit_trail') WHERE name = 'agent'")
            .map_err(|e| format!("Failed to check for agent column: {}", e))?
            .exists([])
            .map_err(|e| format!("Failed to query table info: {}", e))?;

        if !has_agent_column {
            tracing::info!("Running migration: adding 'agent' column to audit_trail table");
            conn.execute(
                "ALTER TABLE audit_trail ADD COLUMN agent TEXT NOT NULL DEFAULT 'system'",
                [],
            )
            .map_err(|e| format!("Failed to add agent column: {}", e))?;
        }

        Ok(())
    }
}

fn parse_status(s: &str) -> TaskStatus {
    match s {
        "complete" => TaskStatus::Complete,
        _ => TaskStatus::Pending,
    }
}

/// Decode a stored RFC3339 timestamp, failing the row on malformed text.
fn timestamp_column(idx: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_timestamp_column(
    idx: usize,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| timestamp_column(idx, &v)).transpose()
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, rusqlite::Error> {
    let estimated_steps: i64 = row.get(3)?;
    let forced_mode: Option<String> = row.get(4)?;
    let mode: String = row.get(5)?;
    let status: String = row.get(6)?;
    let presented: Option<String> = row.get(7)?;
    let approved: Option<String> = row.get(8)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        estimated_steps: u32::try_from(estimated_steps.max(0)).unwrap_or(u32::MAX),
        forced_mode: forced_mode.as_deref().and_then(ExecutionMode::parse),
        mode: ExecutionMode::parse(&mode).unwrap_or_default(),
        status: parse_status(&status),
        plan_presented_at: optional_timestamp_column(7, presented)?,
        plan_approved_at: optional_timestamp_column(8, approved)?,
    })
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<AuditEntry, rusqlite::Error> {
    let created_at: String = row.get(2)?;
    let level: String = row.get(5)?;
    Ok(AuditEntry {
        id: row.get(0)?,
        task_id: row.get(1)?,
        created_at: timestamp_column(2, &created_at)?,
        agent: row.get(3)?,
        message: row.get(4)?,
        level: AuditLevel::parse(&level),
    })
}

fn load_task(conn: &Connection, id: TaskId) -> Result<Option<Task>, String> {
    conn.query_row(
        &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
        params![id],
        row_to_task,
    )
    .optional()
    .map_err(|e| e.to_string())
}

fn update_task(conn: &Connection, task: &Task) -> Result<(), String> {
    let updated = conn
        .execute(
            "UPDATE tasks
             SET title = ?2, description = ?3, estimated_steps = ?4, forced_mode = ?5,
                 mode = ?6, status = ?7, plan_presented_at = ?8, plan_approved_at = ?9
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.description,
                task.estimated_steps as i64,
                task.forced_mode.map(|m| m.as_str()),
                task.mode.as_str(),
                task.status.as_str(),
                task.plan_presented_at.as_ref().map(to_rfc3339),
                task.plan_approved_at.as_ref().map(to_rfc3339),
            ],
        )
        .map_err(|e| e.to_string())?;
    if updated == 0 {
        return Err(format!("Task {} not found", task.id));
    }
    Ok(())
}

fn insert_event(
    conn: &Connection,
    task_id: TaskId,
    created_at: DateTime<Utc>,
    agent: String,
    message: String,
    level: AuditLevel,
) -> Result<AuditEntry, String> {
    conn.execute(
        "INSERT INTO audit_trail (task_id, created_at, agent, message, level)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            task_id,
            to_rfc3339(&created_at),
            agent,
            message,
            level.as_str()
        ],
    )
    .map_err(|e| e.to_string())?;
    Ok(AuditEntry {
        id: conn.last_insert_rowid(),
        task_id,
        created_at,
        agent,
        message,
        level,
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    fn kind(&self) -> TaskStoreType {
        TaskStoreType::Sqlite
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, String> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(&format!("SELECT {} FROM tasks ORDER BY id ASC", TASK_COLUMNS))
                .map_err(|e| e.to_string())?;
            let rows = stmt.query_map([], row_to_task).map_err(|e| e.to_string())?;
            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row.map_err(|e| e.to_string())?);
            }
            Ok(tasks)
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, String> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            load_task(&conn, id)
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn create_task(&self, new: &NewTask) -> Result<Task, String> {
        let conn = self.conn.clone();
        let new = new.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mode = new.resolved_mode();
            conn.execute(
                "INSERT INTO tasks (title, description, estimated_steps, forced_mode, mode, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.title,
                    new.description,
                    new.estimated_steps as i64,
                    new.forced_mode.map(|m| m.as_str()),
                    mode.as_str(),
                    TaskStatus::Pending.as_str(),
                ],
            )
            .map_err(|e| e.to_string())?;
            let id = conn.last_insert_rowid();
            Ok(Task::from_new(id, &new))
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn save_task(&self, task: &Task) -> Result<(), String> {
        let conn = self.conn.clone();
        let task = task.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            update_task(&conn, &task)
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn save_task_with_event(
        &self,
        task: &Task,
        agent: &str,
        message: &str,
        level: AuditLevel,
        created_at: DateTime<Utc>,
    ) -> Result<AuditEntry, String> {
        let conn = self.conn.clone();
        let task = task.clone();
        let agent = agent.to_string();
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            // Dropping the transaction without commit rolls both writes back
            let tx = conn.unchecked_transaction().map_err(|e| e.to_string())?;
            update_task(&tx, &task)?;
            let entry = insert_event(&tx, task.id, created_at, agent, message, level)?;
            tx.commit().map_err(|e| e.to_string())?;
            Ok(entry)
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn count_tasks(&self) -> Result<usize, String> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .map_err(|e| e.to_string())?;
        Ok(count as usize)
    }

    async fn log_event(
        &self,
        task_id: TaskId,
        agent: &str,
        message: &str,
        level: AuditLevel,
    ) -> Result<AuditEntry, String> {
        let conn = self.conn.clone();
        let agent = agent.to_string();
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            insert_event(&conn, task_id, Utc::now(), agent, message, level)
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn list_events(
        &self,
        task_id: TaskId,
        after_id: Option<i64>,
    ) -> Result<Vec<AuditEntry>, String> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, task_id, created_at, agent, message, level
                     FROM audit_trail
                     WHERE task_id = ?1 AND id > ?2
                     ORDER BY id ASC",
                )
                .map_err(|e| e.to_string())?;
            let rows = stmt
                .query_map(params![task_id, after_id.unwrap_or(0)], row_to_event)
                .map_err(|e| e.to_string())?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row.map_err(|e| e.to_string())?);
            }
            Ok(events)
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn upsert_summary(
        &self,
        task_id: TaskId,
        content: &str,
    ) -> Result<TaskSummaryRecord, String> {
        let conn = self.conn.clone();
        let content = if content.is_empty() {
            SUMMARY_PLACEHOLDER.to_string()
        } else {
            content.to_string()
        };
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO task_summaries (task_id, content) VALUES (?1, ?2)
                 ON CONFLICT(task_id) DO UPDATE SET content = excluded.content",
                params![task_id, content],
            )
            .map_err(|e| e.to_string())?;
            conn.query_row(
                "SELECT id, task_id, content FROM task_summaries WHERE task_id = ?1",
                params![task_id],
                |row| {
                    Ok(TaskSummaryRecord {
                        id: row.get(0)?,
                        task_id: row.get(1)?,
                        content: row.get(2)?,
                    })
                },
            )
            .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn get_summary(&self, task_id: TaskId) -> Result<Option<TaskSummaryRecord>, String> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row(
                "SELECT id, task_id, content FROM task_summaries WHERE task_id = ?1",
                params![task_id],
                |row| {
                    Ok(TaskSummaryRecord {
                        id: row.get(0)?,
                        task_id: row.get(1)?,
                        content: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> (tempfile::TempDir, SqliteTaskStore) {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SqliteTaskStore::new(temp.path().join("task_runner.db"))
            .await
            .expect("open store");
        (temp, store)
    }

    #[tokio::test]
    async fn test_task_round_trip() {
        let (_temp, store) = open_store().await;
        let created = store
            .create_task(
                &NewTask::new("Force planned", "", 1).with_forced_mode(ExecutionMode::Planned),
            )
            .await
            .unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.mode, ExecutionMode::Planned);

        let loaded = store.get_task(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert!(store.get_task(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_task_persists_timestamps_and_status() {
        let (_temp, store) = open_store().await;
        let mut task = store
            .create_task(&NewTask::new("Plan me", "Desc", 4))
            .await
            .unwrap();
        let now = Utc::now();
        task.mark_plan_presented(now);
        task.mark_plan_approved(now);
        task.complete();
        store.save_task(&task).await.unwrap();

        let loaded = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Complete);
        assert_eq!(loaded.plan_presented_at, Some(now));
        assert_eq!(loaded.plan_approved_at, Some(now));

        task.id = 42;
        assert!(store.save_task(&task).await.is_err());
    }

    #[tokio::test]
    async fn test_audit_trail_cursor() {
        let (_temp, store) = open_store().await;
        let task = store.create_task(&NewTask::new("A", "", 3)).await.unwrap();
        let first = store
            .log_event(task.id, "planner", "Plan: Step 1", AuditLevel::Info)
            .await
            .unwrap();
        let second = store
            .log_event(task.id, "executor", "done", AuditLevel::Warning)
            .await
            .unwrap();
        assert!(second.id > first.id);

        let all = store.list_events(task.id, None).await.unwrap();
        assert_eq!(all, vec![first.clone(), second.clone()]);
        let newer = store.list_events(task.id, Some(first.id)).await.unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].level, AuditLevel::Warning);
        assert_eq!(newer[0].agent, "executor");
    }

    #[tokio::test]
    async fn test_audit_entry_requires_existing_task() {
        let (_temp, store) = open_store().await;
        assert!(store
            .log_event(7, "planner", "orphan", AuditLevel::Info)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_summary_upsert_overwrites() {
        let (_temp, store) = open_store().await;
        let task = store.create_task(&NewTask::new("A", "", 1)).await.unwrap();
        assert!(store.get_summary(task.id).await.unwrap().is_none());

        let placeholder = store.upsert_summary(task.id, "").await.unwrap();
        assert_eq!(placeholder.content, "TODO");
        let updated = store.upsert_summary(task.id, "All done").await.unwrap();
        assert_eq!(updated.id, placeholder.id);
        assert_eq!(
            store.get_summary(task.id).await.unwrap().unwrap().content,
            "All done"
        );
    }

    #[tokio::test]
    async fn test_save_task_with_event_commits_both() {
        let (_temp, store) = open_store().await;
        let mut task = store.create_task(&NewTask::new("A", "", 3)).await.unwrap();
        let at = Utc::now();
        task.mark_plan_presented(at);

        let entry = store
            .save_task_with_event(&task, "planner", "Plan: Step 1", AuditLevel::Info, at)
            .await
            .unwrap();
        assert_eq!(entry.created_at, at);
        assert_eq!(store.list_events(task.id, None).await.unwrap(), vec![entry]);
        assert_eq!(
            store.get_task(task.id).await.unwrap().unwrap().plan_presented_at,
            Some(at)
        );
    }

    #[tokio::test]
    async fn test_save_task_with_event_rolls_back_on_insert_failure() {
        let (_temp, store) = open_store().await;
        let mut task = store.create_task(&NewTask::new("A", "", 3)).await.unwrap();
        store
            .conn
            .lock()
            .await
            .execute_batch(
                "CREATE TRIGGER refuse_audit BEFORE INSERT ON audit_trail
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        task.complete();
        let err = store
            .save_task_with_event(&task, "executor", "done", AuditLevel::Info, Utc::now())
            .await
            .unwrap_err();
        assert!(err.contains("disk full"), "{}", err);

        let loaded = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Pending);
        assert!(store.list_events(task.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_task_with_event_for_missing_task_writes_nothing() {
        let (_temp, store) = open_store().await;
        let ghost = Task::from_new(9, &NewTask::new("Ghost", "", 3));
        assert!(store
            .save_task_with_event(&ghost, "planner", "plan", AuditLevel::Info, Utc::now())
            .await
            .is_err());
        assert!(store.list_events(9, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_audit_timestamp_is_an_error() {
        let (_temp, store) = open_store().await;
        let task = store.create_task(&NewTask::new("A", "", 1)).await.unwrap();
        store
            .conn
            .lock()
            .await
            .execute(
                "INSERT INTO audit_trail (task_id, created_at, agent, message, level)
                 VALUES (?1, 'yesterday', 'planner', 'plan', 'info')",
                params![task.id],
            )
            .unwrap();

        assert!(store.list_events(task.id, None).await.is_err());
    }

    #[tokio::test]
    async fn test_legacy_audit_table_is_migrated() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE audit_trail (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    task_id INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    message TEXT NOT NULL,
                    level TEXT NOT NULL DEFAULT 'info'
                );",
            )
            .unwrap();
        }

        let store = SqliteTaskStore::new(path).await.expect("open legacy store");
        let task = store.create_task(&NewTask::new("A", "", 1)).await.unwrap();
        let entry = store
            .log_event(task.id, "executor", "ran", AuditLevel::Info)
            .await
            .unwrap();
        assert_eq!(entry.agent, "executor");
    }
}
