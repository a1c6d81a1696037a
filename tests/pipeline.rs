//! End-to-end pipeline tests with mock backends.
//!
//! The backends are scripted in-process implementations of the adapter
//! traits; storage is rooted in a temp directory. No network, no real
//! models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use dreamloom::adapters::{ImageBackend, TextBackend};
use dreamloom::{
    BackendError, Config, DreamRequest, ModelRegistry, Orchestrator, PipelineError,
    ProgressTracker, RunStore,
};

const FIVE_PARAGRAPH_STORY: &str = "Para one.\nPara two.\nPara three.\nPara four.\nPara five.";

/// Text backend that returns a fixed story and counts its calls.
struct ScriptedTextBackend {
    story: String,
    calls: AtomicUsize,
}

impl ScriptedTextBackend {
    fn new(story: &str) -> Arc<Self> {
        Arc::new(Self {
            story: story.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextBackend for ScriptedTextBackend {
    fn name(&self) -> &str {
        "scripted-text"
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        // Compression requests get a short summary, anything else the story.
        if prompt.contains("Rewrite the following scene") {
            Ok("a short vivid summary".to_string())
        } else {
            Ok(self.story.clone())
        }
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Image backend that returns stub bytes, optionally failing on one call.
struct CountingImageBackend {
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl CountingImageBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on_call: None,
        })
    }

    fn failing_on(call: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on_call: Some(call),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageBackend for CountingImageBackend {
    fn name(&self) -> &str {
        "counting-image"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _steps: u32,
        _guidance_scale: f32,
    ) -> Result<Vec<u8>, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_on_call == Some(call) {
            return Err(BackendError::Api(format!("render {} exploded", call)));
        }

        Ok(b"stub-png-bytes".to_vec())
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Wire a full context around the given mock backends.
fn test_context(
    text: Arc<ScriptedTextBackend>,
    image: Arc<CountingImageBackend>,
) -> (Arc<Orchestrator>, Arc<ProgressTracker>, RunStore, TempDir) {
    let temp = TempDir::new().unwrap();

    let mut config = Config::default();
    config.pipeline.output_dir = temp.path().to_path_buf();
    // Mocks answer compression prompts too, but keeping this off makes the
    // expected call counts obvious: one text call per run.
    config.pipeline.compress_scenes = false;
    config.text_model.name = "mock-text".to_string();
    config.image_model.name = "mock-image".to_string();

    let registry = Arc::new(ModelRegistry::new());
    registry.register_text("mock-text", text);
    registry.register_image("mock-image", image);

    let tracker = Arc::new(ProgressTracker::new());
    let store = RunStore::new(config.pipeline.output_dir.clone());
    let orchestrator = Arc::new(Orchestrator::new(
        registry,
        Arc::clone(&tracker),
        store.clone(),
        &config,
    ));

    (orchestrator, tracker, store, temp)
}

fn request(dream: &str) -> DreamRequest {
    DreamRequest {
        dream: dream.to_string(),
        elements: vec!["whale".to_string()],
        model: None,
    }
}

#[tokio::test]
async fn test_end_to_end_five_paragraph_story() {
    let text = ScriptedTextBackend::new(FIVE_PARAGRAPH_STORY);
    let image = CountingImageBackend::new();
    let (orchestrator, tracker, store, _temp) =
        test_context(Arc::clone(&text), Arc::clone(&image));

    let summary = orchestrator.run(request("a city of glass")).await.unwrap();

    // Four scenes from five paragraphs, one image per scene.
    assert_eq!(summary.scene_count, 4);
    assert_eq!(
        summary.image_files,
        vec!["scene_1.png", "scene_2.png", "scene_3.png", "scene_4.png"]
    );
    assert_eq!(text.calls(), 1);
    assert_eq!(image.calls(), 4);

    // Artifacts on disk: the images, the document, the index entry.
    let run_dir = store.run_dir(&summary.run_id);
    for file in &summary.image_files {
        assert!(run_dir.join(file).exists(), "missing {}", file);
    }
    assert!(summary.document_path.exists());

    let index =
        std::fs::read_to_string(store.output_root().join("index.html")).unwrap();
    assert!(index.contains(summary.run_id.as_str()));

    // Every paragraph is illustrated: N=5, M=4 gives stride 1.
    let html = std::fs::read_to_string(&summary.document_path).unwrap();
    assert_eq!(html.matches("<img").count(), 4);

    // Terminal progress state.
    let state = tracker.get(&summary.run_id);
    assert_eq!(state.percent, 100);
    assert!(state.done);
    assert!(!state.failed);
}

#[tokio::test]
async fn test_empty_story_completes_with_no_scenes() {
    let text = ScriptedTextBackend::new("");
    let image = CountingImageBackend::new();
    let (orchestrator, tracker, _store, _temp) =
        test_context(text, Arc::clone(&image));

    let summary = orchestrator.run(request("nothing at all")).await.unwrap();

    // Zero usable paragraphs degrade to zero scenes; the run still completes.
    assert_eq!(summary.scene_count, 0);
    assert!(summary.image_files.is_empty());
    assert_eq!(image.calls(), 0);
    assert!(summary.document_path.exists());
    assert!(tracker.get(&summary.run_id).done);
}

#[tokio::test]
async fn test_image_failure_aborts_the_run() {
    let text = ScriptedTextBackend::new(FIVE_PARAGRAPH_STORY);
    let image = CountingImageBackend::failing_on(2);
    let (orchestrator, tracker, store, _temp) =
        test_context(text, Arc::clone(&image));

    let err = orchestrator
        .run(request("a doomed dream"))
        .await
        .unwrap_err();

    // All-or-nothing: the second illustration failing fails the whole run,
    // and no further image calls are made.
    match err {
        PipelineError::ImageBackend { scene, .. } => assert_eq!(scene, 2),
        other => panic!("expected image backend error, got {:?}", other),
    }
    assert_eq!(image.calls(), 2);

    // No storybook was rendered anywhere.
    let runs = store.list_completed_runs().await.unwrap();
    assert!(runs.is_empty());

    // The tracker reports an explicit failure at the illustration stage,
    // not a silently stalled run.
    let run_id = only_run_dir(&store).await;
    let state = tracker.get(&run_id);
    assert!(state.failed);
    assert!(!state.done);
    assert_eq!(state.percent, 60);
    assert!(state.error.unwrap().contains("scene 2"));
}

#[tokio::test]
async fn test_unknown_model_never_calls_backends() {
    let text = ScriptedTextBackend::new(FIVE_PARAGRAPH_STORY);
    let image = CountingImageBackend::new();
    let (orchestrator, _tracker, _store, _temp) =
        test_context(Arc::clone(&text), Arc::clone(&image));

    let mut bad_request = request("a typo'd model");
    bad_request.model = Some("no-such-model".to_string());

    let err = orchestrator.run(bad_request).await.unwrap_err();

    assert!(matches!(err, PipelineError::UnknownModel(_)));
    assert_eq!(text.calls(), 0);
    assert_eq!(image.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let text = ScriptedTextBackend::new(FIVE_PARAGRAPH_STORY);
    let image = CountingImageBackend::new();
    let (orchestrator, tracker, store, _temp) = test_context(text, image);

    let (id_a, handle_a) = Arc::clone(&orchestrator)
        .spawn(request("first dream"))
        .await
        .unwrap();
    let (id_b, handle_b) = Arc::clone(&orchestrator)
        .spawn(request("second dream"))
        .await
        .unwrap();

    assert_ne!(id_a, id_b);

    let summary_a = handle_a.await.unwrap().unwrap();
    let summary_b = handle_b.await.unwrap().unwrap();

    // Independent directories and documents.
    assert_ne!(summary_a.document_path, summary_b.document_path);
    assert!(store.run_dir(&id_a).is_dir());
    assert!(store.run_dir(&id_b).is_dir());

    // Independent tracker entries, both terminal.
    assert!(tracker.get(&id_a).done);
    assert!(tracker.get(&id_b).done);

    // Both discoverable.
    let runs = store.list_completed_runs().await.unwrap();
    assert_eq!(runs.len(), 2);
}

#[tokio::test]
async fn test_spawned_failure_lands_in_tracker() {
    let text = ScriptedTextBackend::new(FIVE_PARAGRAPH_STORY);
    let image = CountingImageBackend::failing_on(1);
    let (orchestrator, tracker, _store, _temp) = test_context(text, image);

    let (run_id, handle) = Arc::clone(&orchestrator)
        .spawn(request("a doomed dream"))
        .await
        .unwrap();

    // The caller got a run id immediately; the failure arrives later,
    // through the handle and the tracker.
    let result = handle.await.unwrap();
    assert!(result.is_err());

    let state = tracker.get(&run_id);
    assert!(state.failed);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_progress_is_monotonic_under_polling() {
    let text = ScriptedTextBackend::new(FIVE_PARAGRAPH_STORY);
    let image = CountingImageBackend::new();
    let (orchestrator, tracker, _store, _temp) = test_context(text, image);

    let (run_id, handle) = Arc::clone(&orchestrator)
        .spawn(request("a slow dream"))
        .await
        .unwrap();

    // Poll concurrently with the run, recording every observed percent.
    let mut observed = vec![tracker.get(&run_id).percent];
    let mut done_count = 0;
    loop {
        let state = tracker.get(&run_id);
        observed.push(state.percent);
        if state.done {
            done_count += 1;
            break;
        }
        if handle.is_finished() {
            observed.push(tracker.get(&run_id).percent);
            break;
        }
        tokio::task::yield_now().await;
    }
    handle.await.unwrap().unwrap();

    let final_state = tracker.get(&run_id);
    assert!(final_state.done);
    assert_eq!(final_state.percent, 100);
    assert!(done_count <= 1);

    // Monotonically non-decreasing across all observations.
    for pair in observed.windows(2) {
        assert!(
            pair[0] <= pair[1],
            "progress went backwards: {:?}",
            observed
        );
    }
}

/// The single run directory under the store's output root.
async fn only_run_dir(store: &RunStore) -> dreamloom::RunId {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(store.output_root()).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        if entry.file_type().await.unwrap().is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    assert_eq!(names.len(), 1, "expected exactly one run, got {:?}", names);
    dreamloom::RunId::new(names.remove(0))
}
