//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{
    AuditEntry, AuditLevel, ExecutionMode, Task, TaskId, TaskStatus, TaskSummaryRecord,
};

/// Request to create a new task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Caller's estimate; drives the mode heuristic
    pub estimated_steps: u32,

    /// Optional override of the heuristic
    #[serde(default)]
    pub forced_mode: Option<ExecutionMode>,
}

/// Request to approve or reject a presented plan.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanApprovalRequest {
    pub approved: bool,
}

/// Summary attached to a task view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSummaryView {
    pub id: i64,
    pub content: String,
}

impl From<TaskSummaryRecord> for TaskSummaryView {
    fn from(record: TaskSummaryRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
        }
    }
}

/// Task as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub estimated_steps: u32,
    pub mode: ExecutionMode,
    pub status: TaskStatus,
    pub forced_mode: Option<ExecutionMode>,
    pub plan_presented_at: Option<DateTime<Utc>>,
    pub plan_approved_at: Option<DateTime<Utc>>,
    pub summary: Option<TaskSummaryView>,
}

impl TaskView {
    pub fn new(task: Task, summary: Option<TaskSummaryRecord>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            estimated_steps: task.estimated_steps,
            mode: task.mode,
            status: task.status,
            forced_mode: task.forced_mode,
            plan_presented_at: task.plan_presented_at,
            plan_approved_at: task.plan_approved_at,
            summary: summary.map(TaskSummaryView::from),
        }
    }
}

/// One audit trail entry as sent over HTTP and the stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub agent: String,
    pub message: String,
    pub level: AuditLevel,
}

impl From<AuditEntry> for AuditLogEntry {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            created_at: entry.created_at,
            agent: entry.agent,
            message: entry.message,
            level: entry.level,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Active task store backend
    pub store: String,

    /// Whether tasks survive a restart
    pub persistent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"title": "A", "estimated_steps": 2}"#).unwrap();
        assert_eq!(req.description, "");
        assert!(req.forced_mode.is_none());

        let forced: CreateTaskRequest = serde_json::from_str(
            r#"{"title": "A", "description": "B", "estimated_steps": 1, "forced_mode": "planned"}"#,
        )
        .unwrap();
        assert_eq!(forced.forced_mode, Some(ExecutionMode::Planned));
    }

    #[test]
    fn test_task_view_serializes_null_summary() {
        let task = Task::from_new(3, &NewTask::new("A", "B", 4));
        let json = serde_json::to_value(TaskView::new(task, None)).unwrap();
        assert_eq!(json["mode"], "planned");
        assert_eq!(json["status"], "pending");
        assert!(json["summary"].is_null());
        assert!(json["plan_presented_at"].is_null());
    }
}
