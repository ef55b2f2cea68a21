#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-orchestrator: the test-run orchestrator. Owns the session
//! lifecycle, checkpoints, the stop/pause controllers, and the row ×
//! step replay loop that drives a recorded project against a live page
//! agent.

pub mod checkpoint;
pub mod collaborators;
pub mod error;
pub mod orchestrator;
pub mod pause;
pub mod session;
pub mod stop;
pub mod trackers;

pub use checkpoint::{Checkpoint, CheckpointDraft};
pub use collaborators::{FieldMapping, Project, ProjectStore, Step, StepEvent, TestRunUpdate};
pub use error::{OrchestratorError, StopRequestedError};
pub use orchestrator::{OrchestratorState, RunOptions, TestOrchestrator, TestRunSummary};
pub use pause::PauseController;
pub use session::{should_auto_checkpoint, Session, SessionManager, SessionMetadata, SessionStatus, SessionSummary};
pub use stop::{StopController, StopReason};
pub use trackers::{LogTracker, ProgressSnapshot, ProgressTracker, ResultTracker, RunSummary};
