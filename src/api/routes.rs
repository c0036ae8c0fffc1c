//! HTTP route handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::task::{NewTask, TaskId};

use super::service::TaskService;
use super::task_store::{self, SharedTaskStore};
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Lifecycle rules on top of the store
    pub service: TaskService,
    /// Task store backend
    pub store: SharedTaskStore,
}

impl AppState {
    pub fn new(config: Config, store: SharedTaskStore) -> Self {
        let service = TaskService::new(Arc::clone(&store), config.require_plan_approval);
        Self {
            config,
            service,
            store,
        }
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id/plan", post(generate_plan))
        .route("/tasks/:id/plan/approval", post(approve_plan))
        .route("/tasks/:id/execute", post(execute_task))
        .route("/stream/tasks/:id", get(stream_task))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = task_store::create_task_store(
        config.store.store_type,
        config.store.db_path.clone(),
        config.store.reset_on_start,
    )
    .await
    .map_err(anyhow::Error::msg)?;

    tracing::info!(
        "Task store ready: {} (persistent: {})",
        store.kind().as_str(),
        store.is_persistent()
    );

    if config.store.seed_demo_tasks {
        task_store::seed_demo_tasks(store.as_ref())
            .await
            .map_err(anyhow::Error::msg)?;
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, store));
    let app = build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Setup graceful shutdown on SIGTERM/SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drop(state);
    tracing::info!("Task store closed, shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.kind().as_str().to_string(),
        persistent: state.store.is_persistent(),
    })
}

/// List all tasks.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TaskView>>, (StatusCode, String)> {
    let tasks = state.service.list_tasks().await?;
    let mut views = Vec::with_capacity(tasks.len());
    for task in tasks {
        views.push(state.service.task_view(task).await?);
    }
    Ok(Json(views))
}

/// Create a task; its mode is resolved immediately.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskView>), (StatusCode, String)> {
    let mut new = NewTask::new(req.title, req.description, req.estimated_steps);
    new.forced_mode = req.forced_mode;

    let task = state.service.create(new).await?;
    let view = state.service.task_view(task).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Present a plan for a planned task.
async fn generate_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<Json<AuditLogEntry>, (StatusCode, String)> {
    let entry = state.service.generate_plan(id).await?;
    Ok(Json(entry.into()))
}

/// Approve or reject the plan of a planned task.
async fn approve_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
    Json(req): Json<PlanApprovalRequest>,
) -> Result<Json<TaskView>, (StatusCode, String)> {
    if !req.approved {
        return Err(state.service.reject_plan(id).await.into());
    }
    let task = state.service.approve_plan(id).await?;
    Ok(Json(state.service.task_view(task).await?))
}

/// Execute a task.
async fn execute_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskView>, (StatusCode, String)> {
    let result = state.service.execute(id).await?;
    Ok(Json(state.service.task_view(result.task).await?))
}

/// Stream a task's audit trail via SSE.
///
/// Polls the store and sends every entry not sent yet as an `audit` event.
/// The stream ends when the client disconnects or the store fails.
async fn stream_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    // Check task exists
    state.service.get_task(id).await?;

    let interval = state.config.stream_poll_interval;
    let stream = async_stream::stream! {
        let mut last_seen: Option<i64> = None;

        loop {
            match state.service.events_after(id, last_seen).await {
                Ok(entries) => {
                    for entry in entries {
                        last_seen = Some(entry.id);
                        match Event::default()
                            .event("audit")
                            .json_data(AuditLogEntry::from(entry))
                        {
                            Ok(event) => yield Ok(event),
                            Err(e) => tracing::warn!("Failed to encode audit event: {}", e),
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Audit stream for task {} failed: {}", id, e);
                    yield Ok(Event::default().event("error").data(e.to_string()));
                    break;
                }
            }

            // Poll interval
            tokio::time::sleep(interval).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
