//! Run identity and outcome types.
//!
//! A Run is one end-to-end execution of the pipeline for a single request.
//! It owns its output directory and its progress entry; artifacts are
//! immutable once the run completes.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one pipeline run.
///
/// Timestamp-derived so output directories sort chronologically on disk; a
/// short random suffix keeps runs started within the same second distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Allocate a fresh id for a run starting now.
    pub fn generate() -> Self {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("run_{}_{}", stamp, &suffix[..6]))
    }

    /// Wrap an existing id (status lookups accept arbitrary strings).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The request that triggers a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DreamRequest {
    /// Free-text dream description
    pub dream: String,

    /// Core elements to weave into the story (snake, fish, bat, ...)
    #[serde(default)]
    pub elements: Vec<String>,

    /// Text model override; the configured default is used when absent
    #[serde(default)]
    pub model: Option<String>,
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,

    /// The generated story, verbatim
    pub story: String,

    /// How many scenes were selected for illustration
    pub scene_count: usize,

    /// File names of the generated images, in scene order
    pub image_files: Vec<String>,

    /// Absolute path of the rendered storybook
    pub document_path: PathBuf,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
