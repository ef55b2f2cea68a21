//! Pure in-memory aggregation: the running progress snapshot, the
//! timestamped log, and the per-step result accumulator. None of these
//! talk to a collaborator — they are read/written exclusively by the
//! orchestrator during a run.

use parking_lot::Mutex;
use relay_core::{Clock, LogEntry, LogLevel, StepOutcome, StepStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current_row: usize,
    pub total_rows: usize,
    pub current_step: usize,
    pub total_steps: usize,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    #[serde(with = "duration_ms_opt")]
    pub estimated_remaining: Option<Duration>,
}

struct ProgressState {
    current_row: usize,
    total_rows: usize,
    current_step: usize,
    total_steps: usize,
    passed: u64,
    failed: u64,
    skipped: u64,
}

pub struct ProgressTracker<C: Clock> {
    clock: C,
    started_at: Instant,
    state: Mutex<ProgressState>,
}

impl<C: Clock> ProgressTracker<C> {
    pub fn new(clock: C, total_rows: usize, total_steps: usize) -> Self {
        let started_at = clock.now();
        Self {
            clock,
            started_at,
            state: Mutex::new(ProgressState {
                current_row: 0,
                total_rows: total_rows.max(1),
                current_step: 0,
                total_steps,
                passed: 0,
                failed: 0,
                skipped: 0,
            }),
        }
    }

    pub fn set_row(&self, row_index: usize) {
        self.state.lock().current_row = row_index;
    }

    pub fn set_step(&self, step_index: usize) {
        self.state.lock().current_step = step_index;
    }

    pub fn record(&self, status: StepStatus) {
        let mut state = self.state.lock();
        match status {
            StepStatus::Passed => state.passed += 1,
            StepStatus::Failed => state.failed += 1,
            StepStatus::Skipped => state.skipped += 1,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        let elapsed = self.clock.now().duration_since(self.started_at);
        let completed = state.passed + state.failed + state.skipped;
        let total = (state.total_rows * state.total_steps.max(1)) as u64;
        let estimated_remaining = if completed > 0 && total > completed {
            let per_unit = elapsed.as_secs_f64() / completed as f64;
            Some(Duration::from_secs_f64(per_unit * (total - completed) as f64))
        } else {
            None
        };
        ProgressSnapshot {
            current_row: state.current_row,
            total_rows: state.total_rows,
            current_step: state.current_step,
            total_steps: state.total_steps,
            passed: state.passed,
            failed: state.failed,
            skipped: state.skipped,
            elapsed,
            estimated_remaining,
        }
    }
}

/// An in-memory, append-only timestamped log, owned exclusively by the
/// orchestrator during a run and concatenated into the test-run update
/// at finalize time.
#[derive(Clone, Default)]
pub struct LogTracker {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, epoch_ms: u64, level: LogLevel, message: impl Into<String>, data: Option<serde_json::Value>) {
        self.entries.lock().push(LogEntry {
            timestamp_epoch_ms: epoch_ms,
            level,
            message: message.into(),
            data,
        });
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Per-row and per-step outcome accumulation for the final test-run
/// summary.
#[derive(Clone, Default)]
pub struct ResultTracker {
    outcomes: Arc<Mutex<Vec<StepOutcome>>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub rows_processed: usize,
    pub passed_rows: usize,
    pub failed_rows: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
}

impl ResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: StepOutcome) {
        self.outcomes.lock().push(outcome);
    }

    pub fn outcomes(&self) -> Vec<StepOutcome> {
        self.outcomes.lock().clone()
    }

    /// Builds the summary over every recorded step, grouping by
    /// `row_index`. `total_rows` is supplied separately since a row can
    /// be abandoned (e.g. on stop) before any of its steps run.
    pub fn summarize(&self, total_rows: usize) -> RunSummary {
        let outcomes = self.outcomes.lock();
        let mut rows_seen = std::collections::BTreeMap::<usize, bool>::new();
        let mut passed_steps = 0;
        let mut failed_steps = 0;
        let mut skipped_steps = 0;
        for outcome in outcomes.iter() {
            match outcome.status {
                StepStatus::Passed => passed_steps += 1,
                StepStatus::Failed => failed_steps += 1,
                StepStatus::Skipped => skipped_steps += 1,
            }
            let row_failed = rows_seen.entry(outcome.row_index).or_insert(false);
            if outcome.status == StepStatus::Failed {
                *row_failed = true;
            }
        }
        let rows_processed = rows_seen.len();
        let failed_rows = rows_seen.values().filter(|failed| **failed).count();
        let passed_rows = rows_processed - failed_rows;
        RunSummary {
            total_rows,
            rows_processed,
            passed_rows,
            failed_rows,
            passed_steps,
            failed_steps,
            skipped_steps,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod duration_ms_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        d.map(|d| d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
#[path = "trackers_tests.rs"]
mod tests;
