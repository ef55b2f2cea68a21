//! The session manager identifies one run, enforces its lifecycle state
//! machine, and produces/restores checkpoints. Owned exclusively by the
//! orchestrator for the duration of a run — see [`crate::orchestrator`].

use parking_lot::Mutex;
use relay_core::{CheckpointId, Clock, ProjectId, SessionId};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{Checkpoint, CheckpointDraft};
use crate::error::OrchestratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Running,
    Paused,
    Resuming,
    Stopped,
    Completed,
    Failed,
    Crashed,
}

impl SessionStatus {
    fn label(&self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Resuming => "resuming",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Crashed => "crashed",
        }
    }

    fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Paused)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub project_id: ProjectId,
    pub target_url: String,
    pub total_steps: usize,
    pub total_rows: usize,
    pub has_csv_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub rows_processed: usize,
    pub passed_rows: usize,
    pub failed_rows: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    pub metadata: SessionMetadata,
    pub created_at_epoch_ms: u64,
    pub started_at_epoch_ms: Option<u64>,
    pub ended_at_epoch_ms: Option<u64>,
    pub summary: Option<SessionSummary>,
    pub pause_duration_total_ms: u64,
}

impl Session {
    /// `endTime - startTime - pauseDuration`. `None` until the session
    /// has ended.
    pub fn duration_ms(&self) -> Option<u64> {
        let started = self.started_at_epoch_ms?;
        let ended = self.ended_at_epoch_ms?;
        Some(ended.saturating_sub(started).saturating_sub(self.pause_duration_total_ms))
    }
}

/// `rowIndex > 0 ∧ rowIndex mod checkpointInterval == 0`. A
/// `checkpointInterval` of zero never auto-fires.
pub fn should_auto_checkpoint(row_index: usize, checkpoint_interval: usize) -> bool {
    checkpoint_interval > 0 && row_index > 0 && row_index % checkpoint_interval == 0
}

struct State {
    session: Option<Session>,
    pause_started_at_epoch_ms: Option<u64>,
    checkpoints: Vec<Checkpoint>,
}

pub struct SessionManager<C: Clock> {
    clock: C,
    state: Mutex<State>,
}

impl<C: Clock> SessionManager<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, state: Mutex::new(State { session: None, pause_started_at_epoch_ms: None, checkpoints: Vec::new() }) }
    }

    /// Rejects if an active (`running`/`paused`) session already exists.
    pub fn create(&self, metadata: SessionMetadata) -> Result<SessionId, OrchestratorError> {
        let mut state = self.state.lock();
        if let Some(existing) = &state.session {
            if existing.status.is_active() {
                return Err(OrchestratorError::SessionAlreadyActive);
            }
        }
        let id = SessionId::new();
        state.session = Some(Session {
            id: id.clone(),
            status: SessionStatus::Created,
            metadata,
            created_at_epoch_ms: self.clock.epoch_ms(),
            started_at_epoch_ms: None,
            ended_at_epoch_ms: None,
            summary: None,
            pause_duration_total_ms: 0,
        });
        state.pause_started_at_epoch_ms = None;
        state.checkpoints.clear();
        Ok(id)
    }

    pub fn start(&self) -> Result<(), OrchestratorError> {
        self.transition("start", |session| matches!(session.status, SessionStatus::Created | SessionStatus::Resuming), |session, epoch_ms| {
            session.status = SessionStatus::Running;
            session.started_at_epoch_ms = Some(epoch_ms);
        })
    }

    pub fn pause(&self) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock();
        let epoch_ms = self.clock.epoch_ms();
        let session = state.session.as_mut().ok_or(OrchestratorError::NoActiveSession)?;
        if session.status != SessionStatus::Running {
            return Err(OrchestratorError::InvalidTransition { from: session.status.label().to_string(), attempted: "pause".to_string() });
        }
        session.status = SessionStatus::Paused;
        state.pause_started_at_epoch_ms = Some(epoch_ms);
        Ok(())
    }

    pub fn resume(&self) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock();
        let epoch_ms = self.clock.epoch_ms();
        let pause_started_at = state.pause_started_at_epoch_ms.take();
        let session = state.session.as_mut().ok_or(OrchestratorError::NoActiveSession)?;
        if session.status != SessionStatus::Paused {
            return Err(OrchestratorError::InvalidTransition { from: session.status.label().to_string(), attempted: "resume".to_string() });
        }
        if let Some(paused_at) = pause_started_at {
            session.pause_duration_total_ms += epoch_ms.saturating_sub(paused_at);
        }
        session.status = SessionStatus::Running;
        Ok(())
    }

    pub fn stop(&self) -> Result<(), OrchestratorError> {
        self.finish("stop", |status| matches!(status, SessionStatus::Running | SessionStatus::Paused), SessionStatus::Stopped, None)
    }

    pub fn complete(&self, summary: SessionSummary) -> Result<(), OrchestratorError> {
        self.finish("complete", |status| status == SessionStatus::Running, SessionStatus::Completed, Some(summary))
    }

    pub fn fail(&self) -> Result<(), OrchestratorError> {
        self.finish("fail", |status| status.is_active(), SessionStatus::Failed, None)
    }

    /// Marks the current session crashed without checking its prior
    /// status — called once, at process revival, when the coordinator
    /// finds a session left `running`/`paused` by a process that never
    /// reached a terminal state.
    pub fn mark_crashed(&self) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock();
        let epoch_ms = self.clock.epoch_ms();
        let session = state.session.as_mut().ok_or(OrchestratorError::NoActiveSession)?;
        session.status = SessionStatus::Crashed;
        session.ended_at_epoch_ms = Some(epoch_ms);
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        self.state.lock().session.clone()
    }

    /// Legal only in `running` or `paused`. Checkpoint times are
    /// enforced strictly increasing for a single session.
    pub fn create_checkpoint(&self, draft: CheckpointDraft) -> Result<Checkpoint, OrchestratorError> {
        let mut state = self.state.lock();
        let epoch_ms = self.clock.epoch_ms();
        let session = state.session.as_ref().ok_or(OrchestratorError::NoActiveSession)?;
        if !session.status.is_active() {
            return Err(OrchestratorError::InvalidTransition { from: session.status.label().to_string(), attempted: "create_checkpoint".to_string() });
        }
        let session_id = session.id.clone();
        let created_at_epoch_ms = match state.checkpoints.last() {
            Some(last) if last.created_at_epoch_ms >= epoch_ms => last.created_at_epoch_ms + 1,
            _ => epoch_ms,
        };
        let checkpoint = Checkpoint {
            id: CheckpointId::new(),
            session_id,
            created_at_epoch_ms,
            row_index: draft.row_index,
            step_index: draft.step_index,
            completed_rows: draft.completed_rows,
            step_results: draft.step_results,
            progress: draft.progress,
        };
        state.checkpoints.push(checkpoint.clone());
        Ok(checkpoint)
    }

    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.state.lock().checkpoints.clone()
    }

    pub fn latest_checkpoint(&self) -> Option<Checkpoint> {
        self.state.lock().checkpoints.last().cloned()
    }

    /// Legal only from `{stopped, failed, crashed}`. Transitions to
    /// `resuming` and returns where the caller should begin.
    pub fn resume_from_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(usize, usize), OrchestratorError> {
        let mut state = self.state.lock();
        let session = state.session.as_mut().ok_or(OrchestratorError::NoActiveSession)?;
        if !matches!(session.status, SessionStatus::Stopped | SessionStatus::Failed | SessionStatus::Crashed) {
            return Err(OrchestratorError::InvalidTransition { from: session.status.label().to_string(), attempted: "resume_from_checkpoint".to_string() });
        }
        session.status = SessionStatus::Resuming;
        Ok(checkpoint.resume_point())
    }

    fn transition(
        &self,
        attempted: &str,
        allowed: impl Fn(&Session) -> bool,
        apply: impl FnOnce(&mut Session, u64),
    ) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock();
        let epoch_ms = self.clock.epoch_ms();
        let session = state.session.as_mut().ok_or(OrchestratorError::NoActiveSession)?;
        if !allowed(session) {
            return Err(OrchestratorError::InvalidTransition { from: session.status.label().to_string(), attempted: attempted.to_string() });
        }
        apply(session, epoch_ms);
        Ok(())
    }

    fn finish(
        &self,
        attempted: &str,
        allowed: impl Fn(SessionStatus) -> bool,
        target: SessionStatus,
        summary: Option<SessionSummary>,
    ) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock();
        let epoch_ms = self.clock.epoch_ms();
        let pause_started_at = state.pause_started_at_epoch_ms.take();
        let session = state.session.as_mut().ok_or(OrchestratorError::NoActiveSession)?;
        if !allowed(session.status) {
            return Err(OrchestratorError::InvalidTransition { from: session.status.label().to_string(), attempted: attempted.to_string() });
        }
        if let Some(paused_at) = pause_started_at {
            session.pause_duration_total_ms += epoch_ms.saturating_sub(paused_at);
        }
        session.status = target;
        session.ended_at_epoch_ms = Some(epoch_ms);
        if summary.is_some() {
            session.summary = summary;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
