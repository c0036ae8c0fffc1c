//! Planner agent - produces deterministic plans.

use crate::agents::{AgentResponse, TaskAgent};
use crate::task::{PlanStep, Task};

/// Fixed outline the script orchestrator draws its steps from.
const PLAN_OUTLINE: [&str; 4] = [
    "Clarify objectives",
    "Collect supporting data",
    "Synthesize insights",
    "Draft recommendations",
];

/// Stateless planner.
///
/// Both entry points request `max(steps, 1)` steps; the outline plan is
/// further capped at the four catalog entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerAgent;

impl PlannerAgent {
    pub const NAME: &'static str = "planner";

    pub fn new() -> Self {
        Self
    }

    /// Build an ordered plan from the fixed outline.
    ///
    /// `title` and `description` do not influence the outline.
    pub fn create_plan(&self, title: &str, description: &str, steps: u32) -> Vec<PlanStep> {
        let _ = (title, description);
        let wanted = steps.max(1) as usize;
        PLAN_OUTLINE
            .iter()
            .take(wanted)
            .map(|item| PlanStep::new(*item, Self::NAME))
            .collect()
    }

    /// Render `max(steps, 1)` synthetic step labels as a single plan line.
    pub fn outline(&self, steps: u32) -> String {
        let labels: Vec<String> = (1..=steps.max(1)).map(|i| format!("Step {}", i)).collect();
        format!("Plan: {}", labels.join(" -> "))
    }
}

impl TaskAgent for PlannerAgent {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, task: &Task, _plan: Option<&str>) -> AgentResponse {
        tracing::debug!(
            "PlannerAgent planning task {} ({} estimated steps)",
            task.id,
            task.estimated_steps
        );
        AgentResponse::new(Self::NAME, self.outline(task.estimated_steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;

    #[test]
    fn test_create_plan_follows_outline_order() {
        let plan = PlannerAgent::new().create_plan("t", "d", 3);
        let descriptions: Vec<&str> = plan.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "Clarify objectives",
                "Collect supporting data",
                "Synthesize insights"
            ]
        );
        assert!(plan.iter().all(|s| s.agent == "planner"));
    }

    #[test]
    fn test_create_plan_clamps_to_catalog() {
        let planner = PlannerAgent::new();
        assert_eq!(planner.create_plan("t", "d", 0).len(), 1);
        assert_eq!(planner.create_plan("t", "d", 1).len(), 1);
        assert_eq!(planner.create_plan("t", "d", 10).len(), 4);
    }

    #[test]
    fn test_run_renders_step_labels() {
        let task = Task::from_new(7, &NewTask::new("Demo", "Demo", 3));
        let response = PlannerAgent::new().run(&task, None);
        assert_eq!(response.agent, "planner");
        assert_eq!(response.output, "Plan: Step 1 -> Step 2 -> Step 3");
    }

    #[test]
    fn test_outline_has_at_least_one_step() {
        assert_eq!(PlannerAgent::new().outline(0), "Plan: Step 1");
    }
}
