//! HTTP front door: trigger, status, gallery, and artifact serving.
//!
//! A thin wrapper over the orchestrator. A `POST /start` returns the run id
//! immediately and the run proceeds on its own task; `GET /status/{run_id}`
//! polls the shared tracker, which answers for unknown ids with the default
//! not-yet-started state.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::storage::DOCUMENT_FILE;
use crate::core::{Orchestrator, ProgressTracker, RunStore};
use crate::domain::{DreamRequest, RunId};
use crate::error::{PipelineError, StorageError};

/// Shared handles for all routes.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub tracker: Arc<ProgressTracker>,
    pub store: RunStore,
    /// Text models the UI may offer for selection
    pub available_models: Arc<Vec<String>>,
}

/// Application-level error for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Pipeline(PipelineError::UnknownModel(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct StartResponse {
    run_id: RunId,
}

#[derive(Debug, Serialize)]
struct GalleryEntry {
    name: String,
    link: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let outputs = ServeDir::new(state.store.output_root());

    Router::new()
        .route("/start", post(start))
        .route("/status/{run_id}", get(status))
        .route("/gallery", get(gallery))
        .route("/models", get(models))
        .nest_service("/outputs", outputs)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, address: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(address).await?;

    info!(%address, "dreamloom front door listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// POST /start: allocate a run, kick it off in the background, and hand
/// the caller its id for polling.
async fn start(
    State(state): State<AppState>,
    Json(request): Json<DreamRequest>,
) -> Result<Json<StartResponse>, AppError> {
    let (run_id, _handle) = Arc::clone(&state.orchestrator).spawn(request).await?;

    Ok(Json(StartResponse { run_id }))
}

/// GET /status/{run_id}: progress snapshot; unknown ids read as the
/// default not-yet-started state, never an error.
async fn status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    Json(state.tracker.get(&RunId::new(run_id)))
}

/// GET /gallery: completed runs, newest first.
async fn gallery(State(state): State<AppState>) -> Result<Json<Vec<GalleryEntry>>, AppError> {
    let runs = state.store.list_completed_runs().await?;

    let entries = runs
        .into_iter()
        .map(|name| GalleryEntry {
            link: format!("/outputs/{}/{}", name, DOCUMENT_FILE),
            name,
        })
        .collect();

    Ok(Json(entries))
}

/// GET /models: text models offered for selection.
async fn models(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.available_models.as_ref().clone())
}
