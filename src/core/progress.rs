//! Shared progress tracking for concurrent observers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::domain::{ProgressState, RunId, Stage};

/// Keyed-by-run progress map.
///
/// One writer per run (its orchestrator task), arbitrarily many concurrent
/// readers. Every update replaces the whole record under the lock, so a
/// reader never observes a half-written state. Querying an unknown run id
/// returns the default state; the tracker cannot tell a typo from a run
/// that has not started yet, and treats both as valid.
///
/// Constructed explicitly and shared via `Arc`; there is no process-global
/// instance.
#[derive(Default)]
pub struct ProgressTracker {
    runs: RwLock<HashMap<RunId, ProgressState>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a run's progress; the default state when unknown.
    pub fn get(&self, run_id: &RunId) -> ProgressState {
        self.read().get(run_id).cloned().unwrap_or_default()
    }

    /// Record entry into a pipeline stage.
    ///
    /// `Complete` flips `done` together with `percent = 100` in the same
    /// record write.
    pub fn advance(&self, run_id: &RunId, stage: Stage) {
        debug!(%run_id, stage = stage.label(), percent = stage.percent(), "Stage entered");

        let state = ProgressState {
            percent: stage.percent(),
            stage: stage.label().to_string(),
            done: stage == Stage::Complete,
            failed: false,
            error: None,
        };
        self.write().insert(run_id.clone(), state);
    }

    /// Move a run to the terminal failed state.
    ///
    /// The percent and stage label of the last completed checkpoint are
    /// kept, so pollers can see where the run died.
    pub fn fail(&self, run_id: &RunId, error: impl fmt::Display) {
        let mut runs = self.write();
        let entry = runs.entry(run_id.clone()).or_default();
        entry.done = false;
        entry.failed = true;
        entry.error = Some(error.to_string());
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RunId, ProgressState>> {
        self.runs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RunId, ProgressState>> {
        self.runs.write().unwrap_or_else(PoisonError::into_inner)
    }
}
