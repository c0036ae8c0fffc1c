//! # Planned Task Runner
//!
//! Two sandboxes exploring investigative vs planned execution of tasks.
//!
//! This library provides:
//! - A script orchestrator that plans, approves, executes and summarizes one task
//! - An HTTP service with persistent tasks, mock agents and an audit trail
//! - A polling SSE stream of each task's audit trail
//!
//! ## Mode Selection
//! ```text
//!   forced_mode? ──yes──▶ forced mode
//!        │
//!        no
//!        ▼
//!   estimated_steps >= 3 ──yes──▶ planned
//!        │
//!        no ──▶ investigative
//! ```
//!
//! ## Modules
//! - `task`: task records, modes, audit entries
//! - `agents`: mock planner, researcher and executor
//! - `memory`: in-process store of the script orchestrator
//! - `orchestrator`: script variant lifecycle
//! - `api`: HTTP service, task service and task stores

pub mod agents;
pub mod api;
pub mod config;
pub mod memory;
pub mod orchestrator;
pub mod task;
pub mod util;

pub use config::Config;
