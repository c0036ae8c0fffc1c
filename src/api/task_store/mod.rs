//! Task storage module with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database with tasks, summaries and the audit trail

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::task::{AuditEntry, AuditLevel, NewTask, Task, TaskId, TaskSummaryRecord};

/// Task store trait - implemented by all storage backends.
///
/// The store is the sole owner of persisted records. Each call is atomic on
/// its own; callers needing read-modify-write isolation per task must provide
/// it themselves.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Backend name for diagnostics.
    fn kind(&self) -> TaskStoreType;

    /// List all tasks ordered by id.
    async fn list_tasks(&self) -> Result<Vec<Task>, String>;

    /// Get a single task by ID.
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, String>;

    /// Insert a new task. The store assigns the id; mode is resolved from `new`.
    async fn create_task(&self, new: &NewTask) -> Result<Task, String>;

    /// Overwrite all mutable fields of an existing task.
    async fn save_task(&self, task: &Task) -> Result<(), String>;

    /// Overwrite a task and append one audit entry for it as a single unit:
    /// either both writes land or neither does.
    async fn save_task_with_event(
        &self,
        task: &Task,
        agent: &str,
        message: &str,
        level: AuditLevel,
        created_at: DateTime<Utc>,
    ) -> Result<AuditEntry, String>;

    /// Number of stored tasks.
    async fn count_tasks(&self) -> Result<usize, String>;

    /// Append an audit entry for a task.
    async fn log_event(
        &self,
        task_id: TaskId,
        agent: &str,
        message: &str,
        level: AuditLevel,
    ) -> Result<AuditEntry, String>;

    /// Audit entries of a task with id greater than `after_id` (all when `None`), oldest first.
    async fn list_events(
        &self,
        task_id: TaskId,
        after_id: Option<i64>,
    ) -> Result<Vec<AuditEntry>, String>;

    /// Create or overwrite the summary of a task.
    async fn upsert_summary(
        &self,
        task_id: TaskId,
        content: &str,
    ) -> Result<TaskSummaryRecord, String>;

    /// Get the summary of a task, if one was written.
    async fn get_summary(&self, task_id: TaskId) -> Result<Option<TaskSummaryRecord>, String>;
}

pub type SharedTaskStore = Arc<dyn TaskStore>;

/// Task store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStoreType {
    Memory,
    #[default]
    Sqlite,
}

impl TaskStoreType {
    /// Parse from environment variable value.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Create a task store based on type and configuration.
///
/// With `reset` set, an existing SQLite file is deleted first.
pub async fn create_task_store(
    store_type: TaskStoreType,
    db_path: PathBuf,
    reset: bool,
) -> Result<SharedTaskStore, String> {
    match store_type {
        TaskStoreType::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        TaskStoreType::Sqlite => {
            if reset {
                SqliteTaskStore::remove_database(&db_path).await?;
            }
            let store = SqliteTaskStore::new(db_path).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Tasks inserted into an empty store at startup.
pub fn demo_tasks() -> Vec<NewTask> {
    vec![
        NewTask::new("Research competitor pricing", "Look up pricing tiers", 4),
        NewTask::new(
            "Draft FAQ update",
            "Investigate customer complaints and produce FAQ entries",
            2,
        ),
        NewTask::new(
            "Summarise call transcript",
            "Parse transcripts and produce highlights",
            5,
        ),
    ]
}

/// Seed the demo tasks if the store holds no tasks yet.
///
/// Returns the number of tasks inserted.
pub async fn seed_demo_tasks(store: &dyn TaskStore) -> Result<usize, String> {
    if store.count_tasks().await? > 0 {
        return Ok(0);
    }
    let demo = demo_tasks();
    for task in &demo {
        store.create_task(task).await?;
    }
    tracing::info!("Seeded {} demo tasks", demo.len());
    Ok(demo.len())
}
