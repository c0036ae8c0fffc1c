//! Task service - the lifecycle rules of the HTTP variant.
//!
//! Handlers call into [`TaskService`]; it loads tasks from the store, applies
//! one transition, runs the mock agents and writes the audit trail.
//!
//! Mutations of the same task are serialized through a per-task async lock,
//! so an approval and an execution racing on one task observe each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use axum::http::StatusCode;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::task_store::SharedTaskStore;
use super::types::TaskView;
use crate::agents::{run_agent, AgentKind};
use crate::task::{AuditEntry, AuditLevel, NewTask, Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Task {0} not found")]
    NotFound(TaskId),

    #[error("{0}")]
    InvalidModeTransition(String),

    #[error("Task {0} requires an approved plan before execution")]
    PlanNotApproved(TaskId),

    #[error("Plan rejected")]
    PlanRejected,

    #[error("Storage error: {0}")]
    Store(String),
}

impl From<String> for ServiceError {
    fn from(e: String) -> Self {
        Self::Store(e)
    }
}

impl From<ServiceError> for (StatusCode, String) {
    fn from(e: ServiceError) -> Self {
        let status = match &e {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidModeTransition(_)
            | ServiceError::PlanNotApproved(_)
            | ServiceError::PlanRejected => StatusCode::BAD_REQUEST,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, e.to_string())
    }
}

/// Outcome of running the executor on a task.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub task: Task,
    /// Audit entries appended by this execution
    pub events: Vec<AuditEntry>,
}

type LockMap = StdMutex<HashMap<TaskId, Arc<Mutex<()>>>>;

fn lock_map(locks: &LockMap) -> MutexGuard<'_, HashMap<TaskId, Arc<Mutex<()>>>> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive hold on one task. The map entry is removed when the last
/// holder or waiter lets go.
struct TaskLock<'a> {
    locks: &'a LockMap,
    id: TaskId,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TaskLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = lock_map(self.locks);
        // One reference in the map, one here
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.id);
        }
    }
}

pub struct TaskService {
    store: SharedTaskStore,
    require_plan_approval: bool,
    locks: LockMap,
}

impl TaskService {
    pub fn new(store: SharedTaskStore, require_plan_approval: bool) -> Self {
        Self {
            store,
            require_plan_approval,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Lock a task and load its current state. Unknown ids fail with
    /// `NotFound` before any lock entry is created.
    async fn lock_task(&self, id: TaskId) -> Result<(TaskLock<'_>, Task), ServiceError> {
        self.get_task(id).await?;

        let lock = Arc::clone(lock_map(&self.locks).entry(id).or_default());
        let mut held = TaskLock {
            locks: &self.locks,
            id,
            lock: Arc::clone(&lock),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);

        let task = self.get_task(id).await?;
        Ok((held, task))
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        Ok(self.store.list_tasks().await?)
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task, ServiceError> {
        self.store
            .get_task(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    pub async fn create(&self, new: NewTask) -> Result<Task, ServiceError> {
        let task = self.store.create_task(&new).await?;
        tracing::info!(
            "Created task {} '{}' ({} steps) in {} mode",
            task.id,
            task.title,
            task.estimated_steps,
            task.mode
        );
        Ok(task)
    }

    /// Run the planner on a planned task and record its output.
    pub async fn generate_plan(&self, id: TaskId) -> Result<AuditEntry, ServiceError> {
        let (_lock, mut task) = self.lock_task(id).await?;

        if !task.is_planned() {
            tracing::warn!("Refusing to plan task {} in {} mode", id, task.mode);
            return Err(ServiceError::InvalidModeTransition(format!(
                "Task {} is not in planned mode",
                id
            )));
        }

        let response = run_agent(AgentKind::Planner, &task, None);
        tracing::debug!("Planner produced '{}' for task {}", response.output, id);

        let now = Utc::now();
        task.mark_plan_presented(now);
        let entry = self
            .store
            .save_task_with_event(&task, &response.agent, &response.output, AuditLevel::Info, now)
            .await?;

        tracing::info!("Presented plan for task {}", id);
        Ok(entry)
    }

    /// Record approval of a planned task's plan. Approving again keeps the
    /// original timestamp.
    pub async fn approve_plan(&self, id: TaskId) -> Result<Task, ServiceError> {
        let (_lock, mut task) = self.lock_task(id).await?;

        if !task.is_planned() {
            tracing::warn!("Refusing to approve plan of task {} in {} mode", id, task.mode);
            return Err(ServiceError::InvalidModeTransition(format!(
                "Approval only valid for planned tasks (task {} is {})",
                id, task.mode
            )));
        }

        if task.mark_plan_approved(Utc::now()) {
            self.store.save_task(&task).await?;
            tracing::info!("Approved plan for task {}", id);
        } else {
            tracing::warn!("Plan for task {} was already approved", id);
        }
        Ok(task)
    }

    /// Handle a negative approval decision. The task is left untouched and
    /// the returned error is what the caller reports.
    pub async fn reject_plan(&self, id: TaskId) -> ServiceError {
        match self.get_task(id).await {
            Ok(_) => {
                tracing::warn!("Plan for task {} rejected", id);
                ServiceError::PlanRejected
            }
            Err(e) => e,
        }
    }

    /// Run the executor, following the latest presented plan for planned tasks.
    pub async fn execute(&self, id: TaskId) -> Result<ExecutionResult, ServiceError> {
        let (_lock, mut task) = self.lock_task(id).await?;

        // The re-resolved mode is persisted together with the completion
        let previous = task.mode;
        if task.resolve_mode() != previous {
            tracing::info!("Task {} mode re-resolved {} -> {}", id, previous, task.mode);
        }

        if task.is_planned() && self.require_plan_approval && !task.is_plan_approved() {
            tracing::warn!("Refusing to execute task {} without an approved plan", id);
            return Err(ServiceError::PlanNotApproved(id));
        }

        let plan = if task.is_planned() {
            self.latest_plan(id).await?
        } else {
            None
        };

        let response = run_agent(AgentKind::Executor, &task, plan.as_deref());
        tracing::debug!("Executor output for task {}: {}", id, response.output);

        task.complete();
        let entry = self
            .store
            .save_task_with_event(
                &task,
                &response.agent,
                &response.output,
                AuditLevel::Info,
                Utc::now(),
            )
            .await?;

        tracing::info!("Task {} complete", id);
        Ok(ExecutionResult {
            task,
            events: vec![entry],
        })
    }

    /// Text of the most recent planner entry, if any.
    async fn latest_plan(&self, id: TaskId) -> Result<Option<String>, ServiceError> {
        let planner = AgentKind::Planner.name();
        let events = self.store.list_events(id, None).await?;
        Ok(events
            .into_iter()
            .rev()
            .find(|e| e.agent == planner)
            .map(|e| e.message))
    }

    /// Audit entries newer than `last_seen`, oldest first.
    pub async fn events_after(
        &self,
        id: TaskId,
        last_seen: Option<i64>,
    ) -> Result<Vec<AuditEntry>, ServiceError> {
        Ok(self.store.list_events(id, last_seen).await?)
    }

    pub async fn task_view(&self, task: Task) -> Result<TaskView, ServiceError> {
        let summary = self.store.get_summary(task.id).await?;
        Ok(TaskView::new(task, summary))
    }
}
