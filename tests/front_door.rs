//! Integration tests for the HTTP front door.
//!
//! The router is exercised in-process with `tower::ServiceExt::oneshot`;
//! backends are mocks, storage is a temp directory.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use dreamloom::adapters::{ImageBackend, TextBackend};
use dreamloom::server::{router, AppState};
use dreamloom::{BackendError, Config, ModelRegistry, Orchestrator, ProgressTracker, RunStore};

struct StaticText;

#[async_trait]
impl TextBackend for StaticText {
    fn name(&self) -> &str {
        "static-text"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
        Ok("Para one.\nPara two.\nPara three.".to_string())
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

struct StaticImage;

#[async_trait]
impl ImageBackend for StaticImage {
    fn name(&self) -> &str {
        "static-image"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _steps: u32,
        _guidance_scale: f32,
    ) -> Result<Vec<u8>, BackendError> {
        Ok(b"stub-png-bytes".to_vec())
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Build the app with mock backends over a temp output root.
fn build_test_app() -> (axum::Router, Arc<ProgressTracker>, TempDir) {
    let temp = TempDir::new().unwrap();

    let mut config = Config::default();
    config.pipeline.output_dir = temp.path().to_path_buf();
    config.pipeline.compress_scenes = false;
    config.text_model.name = "mock-text".to_string();
    config.image_model.name = "mock-image".to_string();

    let registry = Arc::new(ModelRegistry::new());
    registry.register_text("mock-text", Arc::new(StaticText));
    registry.register_image("mock-image", Arc::new(StaticImage));

    let tracker = Arc::new(ProgressTracker::new());
    let store = RunStore::new(config.pipeline.output_dir.clone());
    let orchestrator = Arc::new(Orchestrator::new(
        registry,
        Arc::clone(&tracker),
        store.clone(),
        &config,
    ));

    let state = AppState {
        orchestrator,
        tracker: Arc::clone(&tracker),
        store,
        available_models: Arc::new(vec!["mock-text".to_string()]),
    };

    (router(state), tracker, temp)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_start_returns_run_id_immediately() {
    let (app, tracker, _temp) = build_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/start")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"dream": "a city of glass"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let run_id = json["run_id"].as_str().unwrap();
    assert!(run_id.starts_with("run_"));

    // The run is live in the tracker; wait for it to finish so the temp
    // directory outlives all writes.
    let run_id = dreamloom::RunId::new(run_id);
    loop {
        let state = tracker.get(&run_id);
        if state.done || state.failed {
            assert!(state.done);
            break;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_status_of_unknown_run_is_default_not_error() {
    let (app, _tracker, _temp) = build_test_app();

    let request = Request::builder()
        .uri("/status/run_that_never_existed")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["percent"], 0);
    assert_eq!(json["stage"], "Starting...");
    assert_eq!(json["done"], false);
    assert_eq!(json["failed"], false);
}

#[tokio::test]
async fn test_gallery_lists_completed_runs() {
    let (app, tracker, _temp) = build_test_app();

    // Trigger one run and wait for completion.
    let start = Request::builder()
        .method("POST")
        .uri("/start")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"dream": "a gallery-worthy dream"}"#))
        .unwrap();
    let response = app.clone().oneshot(start).await.unwrap();
    let run_id = body_json(response).await["run_id"]
        .as_str()
        .unwrap()
        .to_string();

    loop {
        let state = tracker.get(&dreamloom::RunId::new(run_id.clone()));
        if state.done || state.failed {
            break;
        }
        tokio::task::yield_now().await;
    }

    let gallery = Request::builder()
        .uri("/gallery")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(gallery).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], run_id);
    assert_eq!(
        entries[0]["link"],
        format!("/outputs/{}/storybook.html", run_id)
    );
}

#[tokio::test]
async fn test_models_endpoint_lists_configured_models() {
    let (app, _tracker, _temp) = build_test_app();

    let request = Request::builder()
        .uri("/models")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0], "mock-text");
}
