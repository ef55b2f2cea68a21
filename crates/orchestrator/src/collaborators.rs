//! The storage collaborator the orchestrator delegates project and
//! test-run persistence to. Out of scope for this core — recorded here
//! only through the interface the orchestrator consumes, plus an
//! in-memory double for tests.

use async_trait::async_trait;
use relay_core::{ProjectId, RunId};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::OrchestratorError;

/// One field mapping between a recorded step's label and a CSV column
/// name. `mapped == false` entries are retained (e.g. surfaced in a UI)
/// but never contribute to the orchestrator's lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub step_label: String,
    pub field_name: String,
    pub mapped: bool,
}

/// One recorded interaction to replay.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub label: String,
    pub event: String,
    pub value: Option<Value>,
    pub payload: Value,
}

/// A recorded project: target URL, step program, field mappings, and
/// optional tabular data to replay the steps against.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub target_url: String,
    pub steps: Vec<Step>,
    pub field_mappings: Vec<FieldMapping>,
    pub csv_rows: Option<Vec<HashMap<String, Value>>>,
}

/// One step-level result the orchestrator reports back at finalize
/// time, alongside the aggregate counts in [`TestRunUpdate`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvent {
    pub row_index: usize,
    pub step_index: usize,
    pub status: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestRunUpdate {
    pub status: String,
    pub rows_processed: usize,
    pub passed_rows: usize,
    pub failed_rows: usize,
    pub step_results: Vec<StepEvent>,
    pub logs: Vec<String>,
    pub duration_ms: u64,
}

/// The `get_project_by_id` / `createTestRun` / `updateTestRun`
/// well-known actions, as a typed collaborator interface rather than
/// routed through the message bus directly — the bus's dispatch is an
/// orthogonal concern (host-facing callers, not the orchestrator, issue
/// those actions by name).
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ProjectStore: Send + Sync {
    async fn get_project_by_id(&self, project_id: &ProjectId) -> Result<Option<Project>, OrchestratorError>;
    async fn create_test_run(&self, project_id: &ProjectId) -> Result<RunId, OrchestratorError>;
    async fn update_test_run(&self, run_id: &RunId, update: TestRunUpdate) -> Result<(), OrchestratorError>;
}

/// An in-memory double, kept outside `#[cfg(test)]` so downstream
/// crates (e.g. a demo binary) can wire a [`ProjectStore`] without a
/// real storage backend.
pub mod mock {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    pub struct MockProjectStore {
        projects: Mutex<HashMap<String, Project>>,
        runs: Mutex<HashMap<String, TestRunUpdate>>,
    }

    impl MockProjectStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, project: Project) {
            self.projects.lock().insert(project.id.as_str().to_string(), project);
        }

        pub fn run_update(&self, run_id: &RunId) -> Option<TestRunUpdate> {
            self.runs.lock().get(run_id.as_str()).cloned()
        }
    }

    #[cfg_attr(not(target_arch = "wasm32"), async_trait)]
    #[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
    impl ProjectStore for MockProjectStore {
        async fn get_project_by_id(&self, project_id: &ProjectId) -> Result<Option<Project>, OrchestratorError> {
            Ok(self.projects.lock().get(project_id.as_str()).cloned())
        }

        async fn create_test_run(&self, _project_id: &ProjectId) -> Result<RunId, OrchestratorError> {
            Ok(RunId::new())
        }

        async fn update_test_run(&self, run_id: &RunId, update: TestRunUpdate) -> Result<(), OrchestratorError> {
            self.runs.lock().insert(run_id.as_str().to_string(), update);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "collaborators_tests.rs"]
mod tests;
