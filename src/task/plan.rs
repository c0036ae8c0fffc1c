//! Records exchanged between the script orchestrator, its agents and memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::AuditLevel;

/// One step of a plan, attributed to the agent that proposed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    pub agent: String,
}

impl PlanStep {
    pub fn new(description: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            agent: agent.into(),
        }
    }
}

/// Outcome of executing a single plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskResult {
    pub agent: String,
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub level: AuditLevel,
}

/// Final answer produced once every step has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub short_answer: String,
    pub detailed_answer: String,
    pub next_steps: Vec<String>,
}
