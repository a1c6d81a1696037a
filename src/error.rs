//! Error taxonomy for the generation pipeline.
//!
//! Pure stages (splitting, prompt building, slot mapping) never fail; only
//! I/O-facing stages can, and every such failure is fatal to its run. Backend
//! failures are typed and propagated rather than folded into generated text.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::RegistryError;

/// Failure talking to a generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connection refused, timeout, bad status).
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered, but with an error payload.
    #[error("backend reported an error: {0}")]
    Api(String),

    /// The backend answered with a payload we could not decode.
    #[error("could not decode backend response: {0}")]
    Decode(String),
}

/// Failure creating or writing run artifacts.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create run directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A fatal pipeline failure.
///
/// Every variant aborts the run; there is no retry or partial-completion
/// path. The spawning side maps these into the run's terminal progress state.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unknown model name. Surfaced before any backend call; the run never
    /// reaches a generation stage.
    #[error(transparent)]
    UnknownModel(#[from] RegistryError),

    /// The text backend failed while generating the story or compressing a
    /// scene.
    #[error("text generation failed: {0}")]
    TextBackend(#[source] BackendError),

    /// The image backend failed for one scene. One failed illustration fails
    /// the whole run (all-or-nothing policy).
    #[error("illustration for scene {scene} failed: {source}")]
    ImageBackend {
        scene: usize,
        source: BackendError,
    },

    /// Run directory or artifact could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
