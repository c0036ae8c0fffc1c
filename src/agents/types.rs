//! Core types for the agent system.

use serde::{Deserialize, Serialize};

/// Which agent the service layer should dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Turns a task into a plan outline
    Planner,
    /// Carries out a task, with or without a plan
    Executor,
}

impl AgentKind {
    /// Stable name recorded in audit entries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Planner => super::PlannerAgent::NAME,
            Self::Executor => super::ExecutorAgent::NAME,
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output of one agent call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Name of the agent that answered
    pub agent: String,

    /// Canned output text
    pub output: String,
}

impl AgentResponse {
    pub fn new(agent: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            output: output.into(),
        }
    }
}
