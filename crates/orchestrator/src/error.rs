use thiserror::Error;

/// The distinguished stop signal raised by [`crate::stop::StopController::checkpoint`].
/// Deliberately *not* a variant of [`OrchestratorError`] — callers unwind
/// cleanly on this and finalize the run as `stopped`, it is not an error
/// condition.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("stop requested ({reason}): {message}")]
pub struct StopRequestedError {
    pub reason: String,
    pub message: String,
}

/// Failures surfaced by the session manager, the step execution loop,
/// and collaborator calls the orchestrator makes (project store, tab
/// API, page-agent channel). A lifecycle transition violation is a
/// programming error and is never swallowed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("invalid transition from {from} via {attempted}")]
    InvalidTransition { from: String, attempted: String },

    #[error("project '{0}' has no steps")]
    EmptyStepList(String),

    #[error("project '{0}' has no target URL")]
    EmptyTargetUrl(String),

    #[error("project store error: {0}")]
    ProjectStore(String),

    #[error("host error: {0}")]
    Host(#[from] relay_host::HostError),

    #[error("step '{row_index}:{step_index}' timed out after {timeout_ms}ms")]
    StepTimeout { row_index: usize, step_index: usize, timeout_ms: u64 },

    #[error("stopped: {0}")]
    Stopped(#[from] StopRequestedError),

    #[error("max row failures ({0}) reached")]
    MaxRowFailuresReached(u32),

    #[error("no active session for this operation")]
    NoActiveSession,

    #[error("a session is already active")]
    SessionAlreadyActive,

    #[error("page agent in tab {tab_id} did not become ready after injection and one re-inject attempt")]
    AgentNotReady { tab_id: i64 },
}
