//! Execution mode and the mode selection heuristic.
//!
//! # Invariant
//! A task runs `Planned` iff its forced mode is `Planned`, or no mode is forced
//! and `estimated_steps >= PLANNED_STEP_THRESHOLD`.

use serde::{Deserialize, Serialize};

/// Minimum estimated step count that selects planned mode.
pub const PLANNED_STEP_THRESHOLD: u32 = 3;

/// The two execution styles a task can run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Proceed straight to execution without presenting a plan
    #[default]
    Investigative,
    /// Present a plan, wait for approval, then execute
    Planned,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Investigative => "investigative",
            Self::Planned => "planned",
        }
    }

    /// Parse a stored value. Unknown strings yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "investigative" => Some(Self::Investigative),
            "planned" => Some(Self::Planned),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolve the mode a task will actually run in.
///
/// A forced mode always wins; otherwise the step-count heuristic decides.
pub fn select_mode(forced_mode: Option<ExecutionMode>, estimated_steps: u32) -> ExecutionMode {
    if let Some(mode) = forced_mode {
        return mode;
    }
    if estimated_steps >= PLANNED_STEP_THRESHOLD {
        ExecutionMode::Planned
    } else {
        ExecutionMode::Investigative
    }
}
