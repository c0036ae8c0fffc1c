//! Agents module - stateless mock workers.
//!
//! # Agent Types
//! - **PlannerAgent**: turns a step count into a plan (outline steps or a plan line)
//! - **ResearchAgent**: answers one plan step from a fixed response table
//! - **ExecutorAgent**: executes a whole task, following a plan if one was presented
//!
//! Agents hold no state between calls; every output is a pure function of the input.

mod executor;
mod planner;
mod research;
mod types;

pub use executor::ExecutorAgent;
pub use planner::PlannerAgent;
pub use research::ResearchAgent;
pub use types::{AgentKind, AgentResponse};

use crate::task::Task;

/// Agents that act on a whole task (service variant).
///
/// # Invariants
/// - `run()` never fails and has no side effects
pub trait TaskAgent: Send + Sync {
    /// Name recorded in audit entries.
    fn name(&self) -> &'static str;

    /// Produce a response for `task`, optionally following `plan`.
    fn run(&self, task: &Task, plan: Option<&str>) -> AgentResponse;
}

/// Dispatch helper used by the service layer.
pub fn run_agent(kind: AgentKind, task: &Task, plan: Option<&str>) -> AgentResponse {
    match kind {
        AgentKind::Planner => PlannerAgent::new().run(task, plan),
        AgentKind::Executor => ExecutorAgent::new().run(task, plan),
    }
}
