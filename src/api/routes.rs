//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use bson::oid::ObjectId;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::secrets::EnvSecrets;
use crate::store::{MongoStore, TaskStore};
use crate::task::{Lifecycle, StepExecutor};
use crate::wallet::WalletGateway;

use super::error::ApiError;
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TaskStore>,
    pub lifecycle: Arc<Lifecycle>,
    /// Wallet gateway, present when the Aptos variables are configured.
    /// The task flow never requires it.
    pub wallet: Option<Arc<WalletGateway>>,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn TaskStore> = Arc::new(
        MongoStore::connect(&config.mongodb_uri, &config.mongodb_db).await?,
    );
    if store.ping().await {
        tracing::info!("Connected to MongoDB");
    } else {
        tracing::warn!("MongoDB not reachable yet; continuing, health will report disconnected");
    }

    let lifecycle = Lifecycle::new(Arc::clone(&store), StepExecutor::simulated());

    // Re-queue tasks a previous process left mid-flight.
    match lifecycle.recover().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Recovered {} stranded task(s)", n),
        Err(e) => tracing::error!("Startup recovery failed: {}", e),
    }

    // The wallet gateway is optional: without its configuration the task
    // API still runs in full.
    let wallet = match WalletGateway::new(&config.aptos, &EnvSecrets) {
        Ok(gateway) => {
            let gateway = Arc::new(gateway);
            let init = Arc::clone(&gateway);
            tokio::spawn(async move {
                if let Err(e) = init.initialize_account().await {
                    tracing::warn!("Wallet account initialization failed: {}", e);
                }
            });
            Some(gateway)
        }
        Err(e) => {
            tracing::warn!("Wallet gateway disabled: {}", e);
            None
        }
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        lifecycle,
        wallet,
    });

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the application router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", post(create_task).get(list_tasks))
        .route("/api/tasks/:task_id", get(get_task))
        .route("/api/tasks/:task_id/execute", post(execute_task))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wait for ctrl-c or SIGTERM.
///
/// In-flight background runs are not awaited; startup recovery re-queues
/// whatever a shutdown strands.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install signal handler: {}", e),
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
    let mongodb = if state.store.ping().await {
        "connected"
    } else {
        "disconnected"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        mongodb: mongodb.to_string(),
    })
}

/// Create a new task.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let description = req.description.unwrap_or_default();
    if description.trim().is_empty() {
        return Err(ApiError::validation("Description is required"));
    }
    let cost = req.cost.unwrap_or(0.0);

    let task = state
        .lifecycle
        .create(&description, cost)
        .await
        .map_err(|e| ApiError::from_lifecycle(e, "Failed to create task"))?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// List all tasks, newest first.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let tasks = state
        .store
        .list_recent()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch tasks", e))?;

    Ok(Json(tasks.iter().map(TaskResponse::from).collect()))
}

/// Get one task.
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let id = parse_task_id(&task_id)?;

    let task = state
        .store
        .find(id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch task", e))?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(Json(TaskResponse::from(task)))
}

/// Start executing a task. Responds as soon as the task is marked
/// executing; the steps finish in the background.
async fn execute_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let id = parse_task_id(&task_id)?;

    let task = state
        .lifecycle
        .execute(id)
        .await
        .map_err(|e| ApiError::from_lifecycle(e, "Failed to execute task"))?;

    Ok(Json(TaskResponse::from(task)))
}

/// An id that does not parse cannot name a stored task, so it reads as
/// not found rather than as a malformed request.
fn parse_task_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::not_found("Task not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_task_id_maps_to_not_found() {
        let err = parse_task_id("does-not-exist").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Task not found");
    }

    #[test]
    fn test_valid_hex_id_parses() {
        assert!(parse_task_id("507f1f77bcf86cd799439011").is_ok());
    }
}
