//! Adapter interfaces for generation backends.
//!
//! Adapters give the orchestrator a uniform seam over external model
//! servers. The orchestrator only sees these traits; the registry stores
//! them as `Arc<dyn _>` handles.

pub mod diffusion;
pub mod ollama;

use async_trait::async_trait;

use crate::error::BackendError;

pub use diffusion::DiffusionClient;
pub use ollama::OllamaClient;

/// A text-generation capability. The model it targets is bound at
/// construction; callers only hand it prompts.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Model name this backend answers for
    fn name(&self) -> &str;

    /// Generate text for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    /// Check that the backing server is reachable.
    async fn health_check(&self) -> Result<(), BackendError>;
}

/// An image-generation capability. Rendering geometry and negative prompt
/// are the backend's own configuration; the per-call knobs are the prompt,
/// step count, and guidance scale.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Model name this backend answers for
    fn name(&self) -> &str;

    /// Render one image for a prompt. Returns encoded PNG bytes.
    async fn generate(
        &self,
        prompt: &str,
        steps: u32,
        guidance_scale: f32,
    ) -> Result<Vec<u8>, BackendError>;

    /// Check that the backing server is reachable.
    async fn health_check(&self) -> Result<(), BackendError>;
}
