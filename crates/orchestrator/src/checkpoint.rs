//! A checkpoint is a persisted resume point: enough of the row/step
//! cursor and partial results to restart a run from the middle instead
//! of from row zero.

use relay_core::{CheckpointId, SessionId, StepOutcome};
use serde::{Deserialize, Serialize};

use crate::trackers::ProgressSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub session_id: SessionId,
    pub created_at_epoch_ms: u64,
    pub row_index: usize,
    pub step_index: usize,
    pub completed_rows: usize,
    pub step_results: Vec<StepOutcome>,
    pub progress: ProgressSnapshot,
}

/// Fields supplied by the orchestrator when it asks the session manager
/// to mint a checkpoint; the id, session, and timestamp are filled in by
/// the session manager itself.
pub struct CheckpointDraft {
    pub row_index: usize,
    pub step_index: usize,
    pub completed_rows: usize,
    pub step_results: Vec<StepOutcome>,
    pub progress: ProgressSnapshot,
}

impl Checkpoint {
    /// Where a resumed run should pick back up.
    pub fn resume_point(&self) -> (usize, usize) {
        (self.row_index, self.step_index)
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
