//! Executor agent - runs a whole task in the service variant.

use crate::agents::{AgentResponse, TaskAgent};
use crate::task::Task;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorAgent;

impl ExecutorAgent {
    pub const NAME: &'static str = "executor";

    pub fn new() -> Self {
        Self
    }
}

impl TaskAgent for ExecutorAgent {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Follow the plan when one is given, otherwise improvise.
    fn run(&self, task: &Task, plan: Option<&str>) -> AgentResponse {
        let output = match plan.filter(|p| !p.is_empty()) {
            Some(plan) => format!("Executed plan for task {}: {}", task.id, plan),
            None => format!("Investigated task {} without plan", task.id),
        };
        tracing::debug!("ExecutorAgent finished task {}", task.id);
        AgentResponse::new(Self::NAME, output)
    }
}
