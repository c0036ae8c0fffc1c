//! Audit trail and summary records attached to a task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::TaskId;

/// Placeholder content of a freshly created summary record.
pub const SUMMARY_PLACEHOLDER: &str = "TODO";

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    #[default]
    Info,
    Warning,
    Error,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Parse a stored value, falling back to `Info`.
    pub fn parse(value: &str) -> Self {
        match value {
            "warning" | "warn" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable event in a task's lifecycle.
///
/// Ids are assigned by the store and strictly increase in insertion order,
/// which the stream relies on to find entries it has not sent yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub task_id: TaskId,
    pub created_at: DateTime<Utc>,
    /// Name of the agent that produced the message
    pub agent: String,
    pub message: String,
    pub level: AuditLevel,
}

/// Persisted summary of a task (one per task, overwritten on upsert).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummaryRecord {
    pub id: i64,
    pub task_id: TaskId,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_level_parse_falls_back_to_info() {
        assert_eq!(AuditLevel::parse("warning"), AuditLevel::Warning);
        assert_eq!(AuditLevel::parse("error"), AuditLevel::Error);
        assert_eq!(AuditLevel::parse("verbose"), AuditLevel::Info);
        assert_eq!(AuditLevel::default().as_str(), "info");
    }
}
