//! HTTP API for the task runner.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /tasks` - List tasks
//! - `POST /tasks` - Create a task
//! - `POST /tasks/{id}/plan` - Present a plan (planned tasks only)
//! - `POST /tasks/{id}/plan/approval` - Approve or reject the plan
//! - `POST /tasks/{id}/execute` - Run the executor
//! - `GET /stream/tasks/{id}` - Stream the audit trail via SSE

mod routes;
pub mod service;
pub mod task_store;
pub mod types;

pub use routes::{build_router, serve, AppState};
pub use service::{ExecutionResult, ServiceError, TaskService};
pub use types::*;
