//! Script orchestrator - drives one planned task from plan to summary.
//!
//! # Execution Flow
//! ```text
//! created ──select_mode──▶ planned ──approver──▶ approved ──steps──▶ executing ──▶ summarized
//!    │                        │
//!    └─ investigative: error  └─ rejected: error
//! ```
//! Steps run sequentially in plan order and each result is written to memory
//! before the next step starts.

use thiserror::Error;

use crate::agents::{PlannerAgent, ResearchAgent};
use crate::memory::MemoryStore;
use crate::task::{select_mode, AuditLevel, ExecutionMode, PlanStep, SubTaskResult, TaskSummary};

/// Follow-up callouts attached to every summary.
const NEXT_STEPS: [&str; 2] = [
    "Verify pricing with finance",
    "Prepare customer-facing update",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("Unsupported mode '{0}': this sandbox only runs planned tasks")]
    UnsupportedMode(ExecutionMode),

    #[error("Plan rejected")]
    PlanRejected,
}

/// Human-in-the-loop approval check for a presented plan.
pub trait PlanApprover: Send + Sync {
    fn approve(&self, title: &str, plan: &[PlanStep]) -> bool;
}

/// Approves every plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl PlanApprover for AutoApprove {
    fn approve(&self, _title: &str, _plan: &[PlanStep]) -> bool {
        true
    }
}

/// Coordinates the lifecycle of a planned task.
pub struct TaskOrchestrator {
    memory: MemoryStore,
    planner: PlannerAgent,
    researcher: ResearchAgent,
    approver: Box<dyn PlanApprover>,
}

impl TaskOrchestrator {
    pub fn new(memory: MemoryStore) -> Self {
        Self {
            memory,
            planner: PlannerAgent::new(),
            researcher: ResearchAgent::new(),
            approver: Box::new(AutoApprove),
        }
    }

    /// Replace the approval policy.
    pub fn with_approver(mut self, approver: impl PlanApprover + 'static) -> Self {
        self.approver = Box::new(approver);
        self
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Run a task end to end and return its summary.
    ///
    /// # Errors
    /// - `UnsupportedMode` if the heuristic selects investigative mode
    /// - `PlanRejected` if the approver refuses the plan
    pub fn run_task(
        &mut self,
        title: &str,
        description: &str,
        estimated_steps: u32,
    ) -> Result<TaskSummary, OrchestratorError> {
        let mode = select_mode(None, estimated_steps);
        if mode == ExecutionMode::Investigative {
            tracing::warn!(
                "Refusing '{}': {} estimated steps selects investigative mode",
                title,
                estimated_steps
            );
            return Err(OrchestratorError::UnsupportedMode(mode));
        }

        let plan = self.planner.create_plan(title, description, estimated_steps);
        tracing::info!("Planned '{}' with {} steps", title, plan.len());
        self.memory.store_plan(title, plan.clone());

        if !self.approver.approve(title, &plan) {
            tracing::warn!("Plan for '{}' was rejected", title);
            return Err(OrchestratorError::PlanRejected);
        }

        let results = self.execute_plan(title, &plan);
        let summary = summarise(title, description, &results);
        self.memory.store_summary(title, summary.clone());
        tracing::info!("Completed '{}'", title);
        Ok(summary)
    }

    /// Flattened history of a task run by this orchestrator.
    pub fn history(&self, title: &str) -> Vec<String> {
        self.memory.history(title)
    }

    fn execute_plan(&mut self, title: &str, plan: &[PlanStep]) -> Vec<SubTaskResult> {
        let mut results = Vec::with_capacity(plan.len());
        for (index, step) in plan.iter().enumerate() {
            let started_at = MemoryStore::now();
            let output = self.researcher.execute(&step.description);
            let result = SubTaskResult {
                agent: step.agent.clone(),
                output,
                started_at,
                completed_at: MemoryStore::now(),
                level: AuditLevel::Info,
            };
            tracing::debug!(
                "Step {}/{} '{}' done",
                index + 1,
                plan.len(),
                step.description
            );
            self.memory
                .store_event(title, &step.description, result.clone());
            results.push(result);
        }
        results
    }
}

impl Default for TaskOrchestrator {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

fn summarise(title: &str, description: &str, results: &[SubTaskResult]) -> TaskSummary {
    let highlights = results
        .iter()
        .map(|r| r.output.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    TaskSummary {
        short_answer: format!("Completed {}", title),
        detailed_answer: format!("{}. Key findings: {}", description, highlights),
        next_steps: NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;

    impl PlanApprover for RejectAll {
        fn approve(&self, _title: &str, _plan: &[PlanStep]) -> bool {
            false
        }
    }

    #[test]
    fn test_run_task_end_to_end() {
        let mut orchestrator = TaskOrchestrator::default();
        let summary = orchestrator
            .run_task(
                "Competitive Pricing Review",
                "Understand how competitors price premium tiers",
                3,
            )
            .expect("planned task should run");

        assert_eq!(summary.short_answer, "Completed Competitive Pricing Review");
        assert_eq!(
            summary.detailed_answer,
            "Understand how competitors price premium tiers. Key findings: \
             Objective confirmed with PM and Sales \
             Gathered metrics from last quarter \
             Identified churn drivers in segment B"
        );
        assert_eq!(
            summary.next_steps,
            vec!["Verify pricing with finance", "Prepare customer-facing update"]
        );
    }

    #[test]
    fn test_results_recorded_in_plan_order() {
        let mut orchestrator = TaskOrchestrator::default();
        orchestrator.run_task("Review", "Desc", 4).unwrap();

        let history = orchestrator.history("Review");
        assert_eq!(history.len(), 4 + 4 + 1);
        assert_eq!(history[0], "Plan: Clarify objectives");
        assert_eq!(history[4], "Result: Objective confirmed with PM and Sales");
        assert_eq!(
            history[7],
            "Result: Suggested pricing experiment for Enterprise tier"
        );
        assert_eq!(history[8], "Summary: Completed Review");
        assert!(orchestrator
            .memory()
            .events("Review")
            .iter()
            .all(|e| e.completed_at >= e.started_at));
    }

    #[test]
    fn test_investigative_estimate_is_unsupported() {
        let mut orchestrator = TaskOrchestrator::default();
        let err = orchestrator.run_task("Small", "Desc", 2).unwrap_err();
        assert_eq!(
            err,
            OrchestratorError::UnsupportedMode(ExecutionMode::Investigative)
        );
        assert!(orchestrator.history("Small").is_empty());
    }

    #[test]
    fn test_rejected_plan_halts_before_execution() {
        let mut orchestrator = TaskOrchestrator::default().with_approver(RejectAll);
        let err = orchestrator.run_task("Review", "Desc", 3).unwrap_err();
        assert_eq!(err, OrchestratorError::PlanRejected);

        // Plan was stored, nothing executed, no summary
        assert_eq!(orchestrator.memory().plan("Review").map(|p| p.len()), Some(3));
        assert!(orchestrator.memory().events("Review").is_empty());
        assert!(orchestrator.memory().summary("Review").is_none());
    }

    #[test]
    fn test_large_estimate_is_capped_by_catalog() {
        let mut orchestrator = TaskOrchestrator::default();
        orchestrator.run_task("Big", "Desc", 12).unwrap();
        assert_eq!(orchestrator.memory().events("Big").len(), 4);
    }
}
