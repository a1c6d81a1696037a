//! Data structures shared across the pipeline.

pub mod progress;
pub mod run;

pub use progress::{ProgressState, Stage};
pub use run::{DreamRequest, RunId, RunSummary};
