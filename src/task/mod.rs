//! Task module - plain records shared by both runners and the mode heuristic.
//!
//! - `mode`: execution modes and `select_mode`
//! - `task`: persisted task records (service variant)
//! - `audit`: audit trail entries and summary records
//! - `plan`: plan steps, step results and summaries (script variant)

mod audit;
pub mod mode;
mod plan;
pub mod task;

pub use audit::{AuditEntry, AuditLevel, TaskSummaryRecord, SUMMARY_PLACEHOLDER};
pub use mode::{select_mode, ExecutionMode, PLANNED_STEP_THRESHOLD};
pub use plan::{PlanStep, SubTaskResult, TaskSummary};
pub use task::{NewTask, Task, TaskId, TaskStatus};
