//! Pipeline orchestrator: one dream in, one illustrated storybook out.
//!
//! Drives a run through its fixed stages (story, scenes, prompts, images,
//! document), updating the shared [`ProgressTracker`] at each checkpoint.
//! The orchestrator is the only writer of a run's progress entry; any number
//! of pollers read it concurrently.
//!
//! Collaborators are injected at construction. Model handles are resolved
//! from the registry when a run starts and captured for its whole lifetime,
//! so re-registering a model name never changes an in-flight run.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::config::{Config, ImageModelParams, PipelineSettings};
use crate::domain::{DreamRequest, RunId, RunSummary, Stage};
use crate::error::PipelineError;
use crate::registry::ModelRegistry;
use crate::render::{render_storybook, DocumentMeta};

use super::progress::ProgressTracker;
use super::prompt::{build_image_prompt, build_story_prompt, compress_scene};
use super::scenes::split_scenes;
use super::storage::RunStore;

/// Title given to every rendered storybook.
const DOCUMENT_TITLE: &str = "My Dream Story";

/// Drives dream-to-storybook runs.
pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
    tracker: Arc<ProgressTracker>,
    store: RunStore,
    settings: PipelineSettings,
    image_params: ImageModelParams,
    /// Default text model; requests may name another
    text_model: String,
    image_model: String,
}

impl Orchestrator {
    /// Create an orchestrator over injected collaborators.
    pub fn new(
        registry: Arc<ModelRegistry>,
        tracker: Arc<ProgressTracker>,
        store: RunStore,
        config: &Config,
    ) -> Self {
        Self {
            registry,
            tracker,
            store,
            settings: config.pipeline.clone(),
            image_params: config.image_model.parameters.clone(),
            text_model: config.text_model.name.clone(),
            image_model: config.image_model.name.clone(),
        }
    }

    /// Start a run in the background and return its id immediately.
    ///
    /// Allocation happens synchronously so the caller observes a storage
    /// failure directly; everything after runs on its own tokio task. The
    /// task is supervised through the returned handle, and any pipeline
    /// failure moves the run's progress entry to the terminal failed state
    /// rather than leaving it silently stalled.
    pub async fn spawn(
        self: Arc<Self>,
        request: DreamRequest,
    ) -> Result<(RunId, JoinHandle<Result<RunSummary, PipelineError>>), PipelineError> {
        let run_id = self.allocate().await?;

        let orchestrator = Arc::clone(&self);
        let task_run_id = run_id.clone();
        let handle = tokio::spawn(async move {
            orchestrator.execute_tracked(&task_run_id, request).await
        });

        Ok((run_id, handle))
    }

    /// Run a pipeline to completion on the current task (the CLI path).
    pub async fn run(&self, request: DreamRequest) -> Result<RunSummary, PipelineError> {
        let run_id = self.allocate().await?;
        self.execute_tracked(&run_id, request).await
    }

    /// Allocate a run id, its output directory, and its progress entry.
    async fn allocate(&self) -> Result<RunId, PipelineError> {
        let run_id = RunId::generate();
        self.store.create_run_dir(&run_id).await?;
        self.tracker.advance(&run_id, Stage::Starting);

        info!(%run_id, dir = %self.store.run_dir(&run_id).display(), "Run allocated");
        Ok(run_id)
    }

    /// Execute a run, routing any failure into the progress tracker.
    async fn execute_tracked(
        &self,
        run_id: &RunId,
        request: DreamRequest,
    ) -> Result<RunSummary, PipelineError> {
        match self.execute(run_id, request).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(%run_id, error = %e, "Run failed");
                self.tracker.fail(run_id, &e);
                Err(e)
            }
        }
    }

    /// The staged pipeline. Transitions are strictly forward; no retries,
    /// no skipping; every error aborts the run.
    #[instrument(skip(self, request, run_id), fields(run_id = %run_id))]
    async fn execute(
        &self,
        run_id: &RunId,
        request: DreamRequest,
    ) -> Result<RunSummary, PipelineError> {
        let started_at = Utc::now();

        // Handles are captured here for the whole run.
        self.tracker.advance(run_id, Stage::ResolvingModels);
        let text_model = request.model.as_deref().unwrap_or(&self.text_model);
        let text = self.registry.text(text_model)?;
        let image = self.registry.image(&self.image_model)?;

        // The story is accepted as-is: no validation of content, length, or
        // language. Empty or odd model output degrades to fewer scenes
        // downstream instead of failing the run.
        self.tracker.advance(run_id, Stage::GeneratingStory);
        let story_prompt = build_story_prompt(
            &request.dream,
            &request.elements,
            self.settings.target_words,
            self.settings.scenes,
        );
        let story = text
            .generate(&story_prompt)
            .await
            .map_err(PipelineError::TextBackend)?;
        info!(chars = story.len(), model = text_model, "Story generated");

        self.tracker.advance(run_id, Stage::SplittingScenes);
        let scenes = split_scenes(&story, self.settings.scenes);
        info!(scenes = scenes.len(), "Scenes selected");

        let mut image_prompts = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            let focus = if self.settings.compress_scenes {
                compress_scene(text.as_ref(), scene)
                    .await
                    .map_err(PipelineError::TextBackend)?
            } else {
                scene.clone()
            };
            image_prompts.push(build_image_prompt(&focus, &self.settings.style_hint));
        }

        // Sequential, one image per prompt. A single failed illustration
        // fails the whole run: there is no partial-storybook mode.
        self.tracker.advance(run_id, Stage::CreatingIllustrations);
        let mut image_files = Vec::with_capacity(image_prompts.len());
        for (i, prompt) in image_prompts.iter().enumerate() {
            let scene = i + 1;
            debug!(scene, "Generating illustration");

            let png = image
                .generate(prompt, self.image_params.steps, self.image_params.guidance_scale)
                .await
                .map_err(|source| PipelineError::ImageBackend { scene, source })?;

            self.store.store_scene_image(run_id, scene, &png).await?;
            image_files.push(RunStore::scene_file_name(scene));
        }

        self.tracker.advance(run_id, Stage::Rendering);
        let meta = DocumentMeta {
            title: DOCUMENT_TITLE,
            text_model,
            image_model: &self.image_model,
            dream_prompt: &request.dream,
            image_prompts: &image_prompts,
            generated_at: started_at,
        };
        let html = render_storybook(&story, &image_files, &meta);
        let document_path = self.store.store_document(run_id, &html).await?;
        self.store.append_index(run_id).await?;

        self.tracker.advance(run_id, Stage::Complete);
        info!(
            scenes = scenes.len(),
            images = image_files.len(),
            document = %document_path.display(),
            "Run complete"
        );

        Ok(RunSummary {
            run_id: run_id.clone(),
            story,
            scene_count: scenes.len(),
            image_files,
            document_path,
            started_at,
            completed_at: Utc::now(),
        })
    }
}
