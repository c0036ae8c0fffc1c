//! In-memory task store (non-persistent).

use super::{TaskStore, TaskStoreType};
use crate::task::{
    AuditEntry, AuditLevel, NewTask, Task, TaskId, TaskSummaryRecord, SUMMARY_PLACEHOLDER,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    tasks: BTreeMap<TaskId, Task>,
    events: Vec<AuditEntry>,
    summaries: HashMap<TaskId, TaskSummaryRecord>,
    next_task_id: TaskId,
    next_event_id: i64,
    next_summary_id: i64,
}

impl Tables {
    fn bump(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    fn kind(&self) -> TaskStoreType {
        TaskStoreType::Memory
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, String> {
        Ok(self.tables.read().await.tasks.values().cloned().collect())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, String> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn create_task(&self, new: &NewTask) -> Result<Task, String> {
        let mut tables = self.tables.write().await;
        let id = Tables::bump(&mut tables.next_task_id);
        let task = Task::from_new(id, new);
        tables.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn save_task(&self, task: &Task) -> Result<(), String> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| format!("Task {} not found", task.id))?;
        *stored = task.clone();
        Ok(())
    }

    async fn save_task_with_event(
        &self,
        task: &Task,
        agent: &str,
        message: &str,
        level: AuditLevel,
        created_at: DateTime<Utc>,
    ) -> Result<AuditEntry, String> {
        let mut tables = self.tables.write().await;
        if !tables.tasks.contains_key(&task.id) {
            return Err(format!("Task {} not found", task.id));
        }
        let entry = AuditEntry {
            id: Tables::bump(&mut tables.next_event_id),
            task_id: task.id,
            created_at,
            agent: agent.to_string(),
            message: message.to_string(),
            level,
        };
        tables.tasks.insert(task.id, task.clone());
        tables.events.push(entry.clone());
        Ok(entry)
    }

    async fn count_tasks(&self) -> Result<usize, String> {
        Ok(self.tables.read().await.tasks.len())
    }

    async fn log_event(
        &self,
        task_id: TaskId,
        agent: &str,
        message: &str,
        level: AuditLevel,
    ) -> Result<AuditEntry, String> {
        let mut tables = self.tables.write().await;
        if !tables.tasks.contains_key(&task_id) {
            return Err(format!("Task {} not found", task_id));
        }
        let entry = AuditEntry {
            id: Tables::bump(&mut tables.next_event_id),
            task_id,
            created_at: Utc::now(),
            agent: agent.to_string(),
            message: message.to_string(),
            level,
        };
        tables.events.push(entry.clone());
        Ok(entry)
    }

    async fn list_events(
        &self,
        task_id: TaskId,
        after_id: Option<i64>,
    ) -> Result<Vec<AuditEntry>, String> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .iter()
            .filter(|e| e.task_id == task_id)
            .filter(|e| after_id.map_or(true, |last| e.id > last))
            .cloned()
            .collect())
    }

    async fn upsert_summary(
        &self,
        task_id: TaskId,
        content: &str,
    ) -> Result<TaskSummaryRecord, String> {
        let mut tables = self.tables.write().await;
        if !tables.tasks.contains_key(&task_id) {
            return Err(format!("Task {} not found", task_id));
        }
        let existing = tables.summaries.get(&task_id).map(|s| s.id);
        let id = match existing {
            Some(id) => id,
            None => Tables::bump(&mut tables.next_summary_id),
        };
        let record = TaskSummaryRecord {
            id,
            task_id,
            content: if content.is_empty() {
                SUMMARY_PLACEHOLDER.to_string()
            } else {
                content.to_string()
            },
        };
        tables.summaries.insert(task_id, record.clone());
        Ok(record)
    }

    async fn get_summary(&self, task_id: TaskId) -> Result<Option<TaskSummaryRecord>, String> {
        Ok(self.tables.read().await.summaries.get(&task_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ExecutionMode, TaskStatus};

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let store = InMemoryTaskStore::new();
        let a = store.create_task(&NewTask::new("A", "", 1)).await.unwrap();
        let b = store.create_task(&NewTask::new("B", "", 3)).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(b.mode, ExecutionMode::Planned);

        let listed: Vec<TaskId> = store
            .list_tasks()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(listed, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_save_task_overwrites_fields() {
        let store = InMemoryTaskStore::new();
        let mut task = store.create_task(&NewTask::new("A", "", 1)).await.unwrap();
        task.complete();
        store.save_task(&task).await.unwrap();

        let loaded = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Complete);

        task.id = 99;
        assert!(store.save_task(&task).await.is_err());
    }

    #[tokio::test]
    async fn test_events_filtered_by_task_and_cursor() {
        let store = InMemoryTaskStore::new();
        let a = store.create_task(&NewTask::new("A", "", 3)).await.unwrap();
        let b = store.create_task(&NewTask::new("B", "", 3)).await.unwrap();

        let first = store
            .log_event(a.id, "planner", "plan", AuditLevel::Info)
            .await
            .unwrap();
        store
            .log_event(b.id, "planner", "other", AuditLevel::Info)
            .await
            .unwrap();
        let third = store
            .log_event(a.id, "executor", "done", AuditLevel::Info)
            .await
            .unwrap();

        let all = store.list_events(a.id, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let newer = store.list_events(a.id, Some(first.id)).await.unwrap();
        assert_eq!(newer, vec![third.clone()]);
        assert!(store
            .list_events(a.id, Some(third.id))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_save_task_with_event_updates_both() {
        let store = InMemoryTaskStore::new();
        let mut task = store.create_task(&NewTask::new("A", "", 3)).await.unwrap();
        let at = Utc::now();
        task.mark_plan_presented(at);

        let entry = store
            .save_task_with_event(&task, "planner", "plan", AuditLevel::Info, at)
            .await
            .unwrap();
        assert_eq!(entry.created_at, at);
        assert_eq!(store.get_task(task.id).await.unwrap().unwrap(), task);
        assert_eq!(store.list_events(task.id, None).await.unwrap(), vec![entry]);

        let ghost = Task::from_new(50, &NewTask::new("Ghost", "", 3));
        assert!(store
            .save_task_with_event(&ghost, "planner", "plan", AuditLevel::Info, at)
            .await
            .is_err());
        assert!(store.list_events(50, None).await.unwrap().is_empty());
        assert!(store.get_task(50).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_log_event_for_missing_task_fails() {
        let store = InMemoryTaskStore::new();
        assert!(store
            .log_event(42, "planner", "plan", AuditLevel::Info)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_summary_upsert_keeps_single_record() {
        let store = InMemoryTaskStore::new();
        let task = store.create_task(&NewTask::new("A", "", 1)).await.unwrap();
        assert!(store.get_summary(task.id).await.unwrap().is_none());

        let first = store.upsert_summary(task.id, "TODO").await.unwrap();
        let second = store.upsert_summary(task.id, "Done").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(
            store.get_summary(task.id).await.unwrap().unwrap().content,
            "Done"
        );
    }
}
