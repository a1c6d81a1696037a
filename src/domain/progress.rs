//! Progress state for a run, as seen by concurrent observers.

use serde::{Deserialize, Serialize};

/// Snapshot of a run's progress.
///
/// Invariants: `percent` is monotonically non-decreasing across a run's
/// lifetime; `done == true` implies `percent == 100` and `failed == false`.
/// A run id the tracker has never seen reads as [`ProgressState::default`],
/// which is indistinguishable from a run that has not started yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub percent: u8,
    pub stage: String,
    pub done: bool,

    /// Terminal failure marker; the run will never advance past this state
    #[serde(default)]
    pub failed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            percent: 0,
            stage: "Starting...".to_string(),
            done: false,
            failed: false,
            error: None,
        }
    }
}

/// The fixed stages of a pipeline run, each with its progress checkpoint.
///
/// Transitions are strictly forward; no stage is retried or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Starting,
    ResolvingModels,
    GeneratingStory,
    SplittingScenes,
    CreatingIllustrations,
    Rendering,
    Complete,
}

impl Stage {
    /// Progress checkpoint reported on entry to this stage.
    pub fn percent(self) -> u8 {
        match self {
            Stage::Starting => 0,
            Stage::ResolvingModels => 5,
            Stage::GeneratingStory => 10,
            Stage::SplittingScenes => 30,
            Stage::CreatingIllustrations => 60,
            Stage::Rendering => 90,
            Stage::Complete => 100,
        }
    }

    /// Label shown to status pollers.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Starting => "Starting...",
            Stage::ResolvingModels => "Resolving models...",
            Stage::GeneratingStory => "Generating story...",
            Stage::SplittingScenes => "Splitting scenes...",
            Stage::CreatingIllustrations => "Creating illustrations...",
            Stage::Rendering => "Rendering storybook...",
            Stage::Complete => "Complete!",
        }
    }
}
