//! Memory subsystem for the script orchestrator.
//!
//! Records plans, execution events and summaries per task title and renders
//! a flattened history of everything that happened.
//!
//! ```text
//! store_plan ──▶ plans[title]      ─┐
//! store_event ─▶ events[title]     ─┼─▶ history(title)
//! store_summary ▶ summaries[title] ─┘
//! ```
//!
//! Plans and summaries are overwritten per title; events are append-only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::task::{PlanStep, SubTaskResult, TaskSummary};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    plans: HashMap<String, Vec<PlanStep>>,
    events: HashMap<String, Vec<SubTaskResult>>,
    summaries: HashMap<String, TaskSummary>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_plan(&mut self, task_title: &str, plan: Vec<PlanStep>) {
        self.plans.insert(task_title.to_string(), plan);
    }

    /// Append the result of one executed step.
    pub fn store_event(&mut self, task_title: &str, step_description: &str, result: SubTaskResult) {
        tracing::debug!(
            "Recording result for '{}' step '{}' from {}",
            task_title,
            step_description,
            result.agent
        );
        self.events
            .entry(task_title.to_string())
            .or_default()
            .push(result);
    }

    pub fn store_summary(&mut self, task_title: &str, summary: TaskSummary) {
        self.summaries.insert(task_title.to_string(), summary);
    }

    pub fn plan(&self, task_title: &str) -> Option<&[PlanStep]> {
        self.plans.get(task_title).map(Vec::as_slice)
    }

    pub fn events(&self, task_title: &str) -> &[SubTaskResult] {
        self.events
            .get(task_title)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn summary(&self, task_title: &str) -> Option<&TaskSummary> {
        self.summaries.get(task_title)
    }

    /// Flattened view: plan lines, then result lines, then the summary line.
    pub fn history(&self, task_title: &str) -> Vec<String> {
        let mut lines: Vec<String> = self
            .plan(task_title)
            .unwrap_or(&[])
            .iter()
            .map(|step| format!("Plan: {}", step.description))
            .collect();
        lines.extend(
            self.events(task_title)
                .iter()
                .map(|event| format!("Result: {}", event.output)),
        );
        if let Some(summary) = self.summary(task_title) {
            lines.push(format!("Summary: {}", summary.short_answer));
        }
        lines
    }

    /// Timestamp source for recorded events.
    pub fn now() -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::AuditLevel;

    fn result(output: &str) -> SubTaskResult {
        let now = MemoryStore::now();
        SubTaskResult {
            agent: "planner".to_string(),
            output: output.to_string(),
            started_at: now,
            completed_at: now,
            level: AuditLevel::Info,
        }
    }

    #[test]
    fn test_history_orders_plan_results_summary() {
        let mut memory = MemoryStore::new();
        memory.store_plan(
            "Review",
            vec![PlanStep::new("A", "planner"), PlanStep::new("B", "planner")],
        );
        memory.store_event("Review", "A", result("did A"));
        memory.store_event("Review", "B", result("did B"));
        memory.store_summary(
            "Review",
            TaskSummary {
                short_answer: "Completed Review".to_string(),
                detailed_answer: String::new(),
                next_steps: vec![],
            },
        );

        assert_eq!(
            memory.history("Review"),
            vec![
                "Plan: A",
                "Plan: B",
                "Result: did A",
                "Result: did B",
                "Summary: Completed Review"
            ]
        );
    }

    #[test]
    fn test_history_of_unknown_task_is_empty() {
        let memory = MemoryStore::new();
        assert!(memory.history("missing").is_empty());
        assert!(memory.events("missing").is_empty());
    }

    #[test]
    fn test_summary_is_overwritten_not_versioned() {
        let mut memory = MemoryStore::new();
        for answer in ["first", "second"] {
            memory.store_summary(
                "T",
                TaskSummary {
                    short_answer: answer.to_string(),
                    detailed_answer: String::new(),
                    next_steps: vec![],
                },
            );
        }
        assert_eq!(memory.summary("T").unwrap().short_answer, "second");
        assert_eq!(memory.history("T"), vec!["Summary: second"]);
    }
}
