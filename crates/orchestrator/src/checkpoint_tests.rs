use super::*;
use relay_core::StepStatus;
use std::time::Duration;

fn sample_progress() -> ProgressSnapshot {
    ProgressSnapshot {
        current_row: 10,
        total_rows: 25,
        current_step: 0,
        total_steps: 3,
        passed: 20,
        failed: 0,
        skipped: 0,
        elapsed: Duration::from_secs(5),
        estimated_remaining: None,
    }
}

#[test]
fn resume_point_is_the_recorded_row_and_step() {
    let checkpoint = Checkpoint {
        id: CheckpointId::new(),
        session_id: SessionId::new(),
        created_at_epoch_ms: 1,
        row_index: 10,
        step_index: 0,
        completed_rows: 10,
        step_results: vec![StepOutcome {
            row_index: 9,
            step_index: 2,
            status: StepStatus::Passed,
            duration: Duration::from_millis(20),
            error: None,
        }],
        progress: sample_progress(),
    };

    assert_eq!(checkpoint.resume_point(), (10, 0));
}
