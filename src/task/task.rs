//! Persisted task records for the service variant.
//!
//! # State Machine
//! ```text
//! Pending --(plan presented)--> Pending + plan_presented_at
//!         --(plan approved)---> Pending + plan_approved_at
//!         --(executed)--------> Complete
//! ```
//! Investigative tasks go straight from `Pending` to `Complete`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mode::{select_mode, ExecutionMode};

/// Database identifier of a task.
pub type TaskId = i64;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet executed
    #[default]
    Pending,
    /// The executor has run
    Complete,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields supplied by a caller when creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub estimated_steps: u32,
    pub forced_mode: Option<ExecutionMode>,
}

impl NewTask {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        estimated_steps: u32,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            estimated_steps,
            forced_mode: None,
        }
    }

    pub fn with_forced_mode(mut self, mode: ExecutionMode) -> Self {
        self.forced_mode = Some(mode);
        self
    }

    /// Mode the task will be stored with.
    pub fn resolved_mode(&self) -> ExecutionMode {
        select_mode(self.forced_mode, self.estimated_steps)
    }
}

/// A task that can be executed by agents.
///
/// # Invariants
/// - `mode == select_mode(forced_mode, estimated_steps)` once resolved
/// - `plan_presented_at` / `plan_approved_at` are only set on planned tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    /// Caller's guess of how many steps the task will take
    pub estimated_steps: u32,
    /// Optional override selected by the requestor
    pub forced_mode: Option<ExecutionMode>,
    /// The mode the system will actually execute
    pub mode: ExecutionMode,
    pub status: TaskStatus,
    /// When the plan was shown to the user
    pub plan_presented_at: Option<DateTime<Utc>>,
    /// When the user approved the plan
    pub plan_approved_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build the stored form of a new task under the given id.
    pub fn from_new(id: TaskId, new: &NewTask) -> Self {
        Self {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            estimated_steps: new.estimated_steps,
            forced_mode: new.forced_mode,
            mode: new.resolved_mode(),
            status: TaskStatus::Pending,
            plan_presented_at: None,
            plan_approved_at: None,
        }
    }

    /// Recompute `mode` from the override and the heuristic.
    pub fn resolve_mode(&mut self) -> ExecutionMode {
        self.mode = select_mode(self.forced_mode, self.estimated_steps);
        self.mode
    }

    pub fn is_planned(&self) -> bool {
        self.mode == ExecutionMode::Planned
    }

    pub fn is_plan_approved(&self) -> bool {
        self.plan_approved_at.is_some()
    }

    pub fn mark_plan_presented(&mut self, at: DateTime<Utc>) {
        self.plan_presented_at = Some(at);
    }

    /// Stamp the approval time.
    ///
    /// Returns `false` and keeps the first stamp if the plan was already approved.
    pub fn mark_plan_approved(&mut self, at: DateTime<Utc>) -> bool {
        if self.plan_approved_at.is_some() {
            return false;
        }
        self.plan_approved_at = Some(at);
        true
    }

    pub fn complete(&mut self) {
        self.status = TaskStatus::Complete;
    }
}
