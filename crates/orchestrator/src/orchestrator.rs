//! The test orchestrator: drives the row × step execution state machine
//! described in this crate, owning the session, the trackers, and the
//! stop/pause controllers for the lifetime of one run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relay_core::config::{InjectionConfig, TabPolicyConfig};
use relay_core::{Clock, ProjectId, RunId, Sleeper, StepOutcome, StepStatus, TabId};
use relay_bus::NavigationSupervisor;
use relay_host::traits::{ExecuteScriptParams, PageAgentChannel, ScriptInjector, TabApi};
use serde_json::Value;
use tracing::{info, warn};

use crate::checkpoint::CheckpointDraft;
use crate::collaborators::{Project, ProjectStore, Step, StepEvent, TestRunUpdate};
use crate::error::OrchestratorError;
use crate::pause::PauseController;
use crate::session::{should_auto_checkpoint, Session, SessionManager, SessionMetadata, SessionSummary};
use crate::stop::{StopController, StopReason};
use crate::trackers::{LogTracker, ProgressTracker, ResultTracker, RunSummary};

/// A ≤ 100 ms slice: every cancellable inter-row/inter-step delay is cut
/// into slices this size so a stop request is observed within one slice
/// of being issued, never after a multi-second sleep.
const DELAY_SLICE: Duration = Duration::from_millis(100);

/// How long to wait for the page agent's readiness ping after injection,
/// before attempting one re-inject.
const AGENT_READY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Loading,
    Ready,
    Running,
    Paused,
    Stopping,
    Stopped,
    Completed,
    Error,
}

impl OrchestratorState {
    fn label(&self) -> &'static str {
        match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Loading => "loading",
            OrchestratorState::Ready => "ready",
            OrchestratorState::Running => "running",
            OrchestratorState::Paused => "paused",
            OrchestratorState::Stopping => "stopping",
            OrchestratorState::Stopped => "stopped",
            OrchestratorState::Completed => "completed",
            OrchestratorState::Error => "error",
        }
    }

    /// `error` is reachable from every state; the rest follow the
    /// published transition relation exactly.
    fn allows(from: OrchestratorState, to: OrchestratorState) -> bool {
        use OrchestratorState::*;
        if to == Error {
            return true;
        }
        matches!(
            (from, to),
            (Idle, Loading)
                | (Loading, Ready)
                | (Ready, Running)
                | (Ready, Idle)
                | (Running, Paused)
                | (Running, Stopping)
                | (Running, Completed)
                | (Paused, Running)
                | (Paused, Stopping)
                | (Stopping, Stopped)
                | (Stopped, Idle)
                | (Completed, Idle)
                | (Error, Idle)
        )
    }
}

/// Inputs to one `run()` call. Fields left `None` fall back to the
/// tab-policy defaults in [`relay_core::config::TabPolicyConfig`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub project_id: ProjectId,
    pub row_indices: Option<Vec<usize>>,
    pub close_tab_on_complete: Option<bool>,
    pub reuse_tab: Option<bool>,
    pub existing_tab_id: Option<TabId>,
    pub row_delay: Duration,
    pub step_delay: Duration,
    pub human_delay: Option<(Duration, Duration)>,
    pub continue_on_row_failure: bool,
    pub max_row_failures: u32,
    pub step_timeout: Duration,
    pub capture_screenshots: bool,
    pub persist_results: bool,
    pub checkpoint_interval: usize,
}

impl RunOptions {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            row_indices: None,
            close_tab_on_complete: None,
            reuse_tab: None,
            existing_tab_id: None,
            row_delay: Duration::ZERO,
            step_delay: Duration::ZERO,
            human_delay: None,
            continue_on_row_failure: false,
            max_row_failures: 0,
            step_timeout: Duration::from_secs(10),
            capture_screenshots: false,
            persist_results: true,
            checkpoint_interval: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Completed,
    Stopped,
    Error,
}

#[derive(Debug, Clone)]
pub struct TestRunSummary {
    pub state: OrchestratorState,
    pub run_id: Option<RunId>,
    pub results: RunSummary,
    pub session: Session,
}

pub struct TestOrchestrator<C: Clock> {
    clock: C,
    sleeper: Arc<dyn Sleeper>,
    project_store: Arc<dyn ProjectStore>,
    tab_api: Arc<dyn TabApi>,
    script_injector: Arc<dyn ScriptInjector>,
    page_agent: Arc<dyn PageAgentChannel>,
    navigation: Arc<NavigationSupervisor>,
    tab_policy: TabPolicyConfig,
    injection: InjectionConfig,
    state: Mutex<OrchestratorState>,
    session: SessionManager<C>,
    stop: StopController,
    pause: PauseController,
    progress: Mutex<Option<Arc<ProgressTracker<C>>>>,
    log: Mutex<LogTracker>,
    results: Mutex<ResultTracker>,
    active_tab: Mutex<Option<TabId>>,
}

impl<C: Clock> TestOrchestrator<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: C,
        sleeper: Arc<dyn Sleeper>,
        project_store: Arc<dyn ProjectStore>,
        tab_api: Arc<dyn TabApi>,
        script_injector: Arc<dyn ScriptInjector>,
        page_agent: Arc<dyn PageAgentChannel>,
        navigation: Arc<NavigationSupervisor>,
        tab_policy: TabPolicyConfig,
        injection: InjectionConfig,
    ) -> Self {
        Self {
            session: SessionManager::new(clock.clone()),
            clock,
            sleeper,
            project_store,
            tab_api,
            script_injector,
            page_agent,
            navigation,
            tab_policy,
            injection,
            state: Mutex::new(OrchestratorState::Idle),
            stop: StopController::new(),
            pause: PauseController::new(),
            progress: Mutex::new(None),
            log: Mutex::new(LogTracker::new()),
            results: Mutex::new(ResultTracker::new()),
            active_tab: Mutex::new(None),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock()
    }

    pub fn progress(&self) -> Option<crate::trackers::ProgressSnapshot> {
        self.progress.lock().as_ref().map(|tracker| tracker.snapshot())
    }

    pub fn logs(&self) -> Vec<relay_core::LogEntry> {
        self.log.lock().entries()
    }

    /// Request a cooperative pause. Legal only while `running`.
    pub fn request_pause(&self, reason: impl Into<String>) -> Result<(), OrchestratorError> {
        self.transition(OrchestratorState::Paused)?;
        self.session.pause()?;
        self.pause.pause(reason);
        Ok(())
    }

    /// Resume from a cooperative pause. Legal only while `paused`.
    pub fn request_resume(&self) -> Result<(), OrchestratorError> {
        self.transition(OrchestratorState::Running)?;
        self.session.resume()?;
        self.pause.resume();
        Ok(())
    }

    /// Request a stop. Takes effect at the next checkpoint boundary
    /// inside the row/step loop, typically within one delay slice.
    pub fn request_stop(&self, reason: StopReason, message: impl Into<String>) {
        self.stop.stop(reason, message);
    }

    fn transition(&self, to: OrchestratorState) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock();
        if !OrchestratorState::allows(*state, to) {
            return Err(OrchestratorError::InvalidTransition {
                from: state.label().to_string(),
                attempted: to.label().to_string(),
            });
        }
        info!(from = state.label(), to = to.label(), "orchestrator transition");
        *state = to;
        Ok(())
    }

    /// Runs the full §4.10 algorithm to completion: load, track, inject,
    /// replay every row × step, finalize, and return a summary. Only a
    /// genuine [`OrchestratorError`] (not a stop request) is returned as
    /// `Err` — a stop finalizes the run as `stopped` and is reported in
    /// the returned summary's `state`, not as an error.
    pub async fn run(&self, options: RunOptions) -> Result<TestRunSummary, OrchestratorError> {
        self.reset_terminal_state();
        self.transition(OrchestratorState::Loading)?;

        let project = self.load_project(&options.project_id).await?;
        self.transition(OrchestratorState::Ready)?;

        let reverse_lookup = build_reverse_lookup(&project);
        let effective_rows = determine_rows(&project, &options);
        let total_rows = effective_rows.len().max(1);
        let total_steps = project.steps.len();

        let tab_id = match self.acquire_tab(&project, &options).await {
            Ok(tab_id) => tab_id,
            Err(error) => {
                self.transition(OrchestratorState::Error)?;
                return Err(error);
            }
        };

        if let Err(error) = self.inject_and_wait_ready(tab_id).await {
            self.transition(OrchestratorState::Error)?;
            return Err(error);
        }

        let run_id = if options.persist_results {
            Some(self.project_store.create_test_run(&options.project_id).await?)
        } else {
            None
        };

        self.session.create(SessionMetadata {
            project_id: options.project_id.clone(),
            target_url: project.target_url.clone(),
            total_steps,
            total_rows,
            has_csv_data: project.csv_rows.is_some(),
        })?;
        self.session.start()?;

        let progress = Arc::new(ProgressTracker::new(self.clock.clone(), total_rows, total_steps));
        *self.progress.lock() = Some(progress.clone());
        let log = LogTracker::new();
        *self.log.lock() = log.clone();
        let results = ResultTracker::new();
        *self.results.lock() = results.clone();

        self.stop.start();
        self.transition(OrchestratorState::Running)?;

        let execution = self
            .execute_rows(&project, &effective_rows, &reverse_lookup, &options, &progress, &log, &results)
            .await;

        let outcome = if self.stop.should_stop() {
            RunOutcome::Stopped
        } else {
            match &execution {
                Ok(()) => RunOutcome::Completed,
                Err(OrchestratorError::Stopped(_)) => RunOutcome::Stopped,
                Err(_) => RunOutcome::Error,
            }
        };

        self.finalize(outcome, tab_id, &options, run_id, &results, total_rows, &log).await;

        match outcome {
            RunOutcome::Error => Err(execution.err().unwrap_or(OrchestratorError::NoActiveSession)),
            _ => Ok(TestRunSummary {
                state: self.state(),
                run_id,
                results: results.summarize(total_rows),
                session: self.session.current().ok_or(OrchestratorError::NoActiveSession)?,
            }),
        }
    }

    fn reset_terminal_state(&self) {
        let mut state = self.state.lock();
        if matches!(*state, OrchestratorState::Stopped | OrchestratorState::Completed | OrchestratorState::Error) {
            *state = OrchestratorState::Idle;
        }
    }

    async fn load_project(&self, project_id: &ProjectId) -> Result<Project, OrchestratorError> {
        let project = self
            .project_store
            .get_project_by_id(project_id)
            .await?
            .ok_or_else(|| OrchestratorError::ProjectStore(format!("no project with id {project_id}")))?;
        if project.steps.is_empty() {
            return Err(OrchestratorError::EmptyStepList(project_id.to_string()));
        }
        if project.target_url.trim().is_empty() {
            return Err(OrchestratorError::EmptyTargetUrl(project_id.to_string()));
        }
        Ok(project)
    }

    async fn acquire_tab(&self, project: &Project, options: &RunOptions) -> Result<TabId, OrchestratorError> {
        let reuse = options.reuse_tab.unwrap_or(self.tab_policy.reuse_tab_default);
        if reuse {
            if let Some(existing) = options.existing_tab_id {
                if self.tab_api.is_open(existing).await? {
                    *self.active_tab.lock() = Some(existing);
                    return Ok(existing);
                }
            }
        }
        let tab_id = self.tab_api.create(&project.target_url, true).await?;
        self.navigation.track(tab_id);
        *self.active_tab.lock() = Some(tab_id);
        Ok(tab_id)
    }

    async fn inject_and_wait_ready(&self, tab_id: TabId) -> Result<(), OrchestratorError> {
        self.execute_injection(tab_id).await?;
        if self.page_agent.ping_ready(tab_id, AGENT_READY_TIMEOUT).await.unwrap_or(false) {
            return Ok(());
        }
        warn!(tab_id = tab_id.0, "page agent not ready after injection, attempting one re-inject");
        self.execute_injection(tab_id).await?;
        if self.page_agent.ping_ready(tab_id, AGENT_READY_TIMEOUT).await.unwrap_or(false) {
            return Ok(());
        }
        Err(OrchestratorError::AgentNotReady { tab_id: tab_id.0 })
    }

    async fn execute_injection(&self, tab_id: TabId) -> Result<(), OrchestratorError> {
        self.script_injector
            .execute_script(ExecuteScriptParams {
                tab_id,
                all_frames: self.injection.all_frames,
                world: self.injection.world,
                files: Vec::new(),
            })
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_rows(
        &self,
        project: &Project,
        rows: &[HashMap<String, Value>],
        reverse_lookup: &HashMap<String, String>,
        options: &RunOptions,
        progress: &ProgressTracker<C>,
        log: &LogTracker,
        results: &ResultTracker,
    ) -> Result<(), OrchestratorError> {
        let mut row_failures: u32 = 0;
        let last_row_index = rows.len().saturating_sub(1);

        for (row_index, row) in rows.iter().enumerate() {
            self.stop.checkpoint()?;
            self.pause.wait_if_paused().await;
            progress.set_row(row_index);
            log.push(self.clock.epoch_ms(), relay_core::LogLevel::Info, format!("row {row_index} started"), None);

            let row_failed = self.execute_steps(project, row, reverse_lookup, options, row_index, progress, log, results).await?;
            if row_failed {
                row_failures += 1;
            }
            log.push(self.clock.epoch_ms(), relay_core::LogLevel::Info, format!("row {row_index} completed"), None);

            if should_auto_checkpoint(row_index, options.checkpoint_interval) {
                let draft = CheckpointDraft {
                    row_index: row_index + 1,
                    step_index: 0,
                    completed_rows: row_index + 1,
                    step_results: results.outcomes(),
                    progress: progress.snapshot(),
                };
                self.session.create_checkpoint(draft)?;
            }

            if options.max_row_failures > 0 && row_failures >= options.max_row_failures {
                self.stop.stop(StopReason::MaxErrors, format!("{row_failures} row failures reached the configured limit"));
                return Ok(());
            }

            if row_index != last_row_index {
                self.sliced_delay(options.row_delay).await?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_steps(
        &self,
        project: &Project,
        row: &HashMap<String, Value>,
        reverse_lookup: &HashMap<String, String>,
        options: &RunOptions,
        row_index: usize,
        progress: &ProgressTracker<C>,
        log: &LogTracker,
        results: &ResultTracker,
    ) -> Result<bool, OrchestratorError> {
        let tab_id = self.active_tab.lock().ok_or(OrchestratorError::NoActiveSession)?;
        let last_step_index = project.steps.len().saturating_sub(1);
        let mut row_failed = false;

        for (step_index, step) in project.steps.iter().enumerate() {
            self.stop.checkpoint()?;
            self.pause.wait_if_paused().await;
            progress.set_step(step_index);

            let resolved = resolve_step_value(step, row, reverse_lookup);
            let start = self.clock.now();

            let status = if step.event == "input" && resolved.is_none() && !row.is_empty() {
                log.push(
                    self.clock.epoch_ms(),
                    relay_core::LogLevel::Warn,
                    format!("row {row_index} step {step_index} skipped: no CSV value available"),
                    None,
                );
                StepStatus::Skipped
            } else {
                let payload = merge_value(&step.payload, resolved.as_ref());
                match self.page_agent.send_step(tab_id, payload, options.step_timeout).await {
                    Ok(true) => StepStatus::Passed,
                    Ok(false) => StepStatus::Failed,
                    Err(error) => {
                        log.push(
                            self.clock.epoch_ms(),
                            relay_core::LogLevel::Error,
                            format!("row {row_index} step {step_index} errored: {error}"),
                            None,
                        );
                        StepStatus::Failed
                    }
                }
            };

            let duration = self.clock.now().duration_since(start);
            let error = match status {
                StepStatus::Failed => Some(format!("step '{}' did not succeed", step.label)),
                _ => None,
            };
            progress.record(status);
            results.record(StepOutcome { row_index, step_index, status, duration, error });

            if status == StepStatus::Failed {
                row_failed = true;
                if !options.continue_on_row_failure {
                    self.stop.stop(StopReason::Error, format!("row {row_index} step {step_index} failed and continue_on_row_failure is disabled"));
                    break;
                }
            }

            if step_index != last_step_index {
                self.sliced_delay(options.step_delay).await?;
            }
        }
        Ok(row_failed)
    }

    /// Cuts `total` into ≤ [`DELAY_SLICE`] chunks, checking stop/pause
    /// before and after every chunk so a stop is observed within one
    /// slice regardless of where in the delay it lands.
    async fn sliced_delay(&self, total: Duration) -> Result<(), OrchestratorError> {
        let mut remaining = total;
        loop {
            self.stop.checkpoint()?;
            self.pause.wait_if_paused().await;
            if remaining.is_zero() {
                return Ok(());
            }
            let slice = remaining.min(DELAY_SLICE);
            self.sleeper.sleep(slice).await;
            remaining -= slice;
        }
    }

    async fn finalize(
        &self,
        outcome: RunOutcome,
        tab_id: TabId,
        options: &RunOptions,
        run_id: Option<RunId>,
        results: &ResultTracker,
        total_rows: usize,
        log: &LogTracker,
    ) {
        let summary = results.summarize(total_rows);

        let final_state = match outcome {
            RunOutcome::Completed => OrchestratorState::Completed,
            RunOutcome::Stopped => OrchestratorState::Stopped,
            RunOutcome::Error => OrchestratorState::Error,
        };
        if final_state == OrchestratorState::Stopped {
            let _ = self.transition(OrchestratorState::Stopping);
        }
        let _ = self.transition(final_state);

        let duration_ms = match outcome {
            RunOutcome::Completed => {
                let _ = self.session.complete(SessionSummary {
                    rows_processed: summary.rows_processed,
                    passed_rows: summary.passed_rows,
                    failed_rows: summary.failed_rows,
                    duration_ms: 0,
                });
                self.session.current().and_then(|session| session.duration_ms()).unwrap_or(0)
            }
            RunOutcome::Stopped => {
                let _ = self.session.stop();
                self.session.current().and_then(|session| session.duration_ms()).unwrap_or(0)
            }
            RunOutcome::Error => {
                let _ = self.session.fail();
                self.session.current().and_then(|session| session.duration_ms()).unwrap_or(0)
            }
        };

        if options.persist_results {
            if let Some(run_id) = run_id {
                let update = TestRunUpdate {
                    status: final_state.label().to_string(),
                    rows_processed: summary.rows_processed,
                    passed_rows: summary.passed_rows,
                    failed_rows: summary.failed_rows,
                    step_results: results
                        .outcomes()
                        .into_iter()
                        .map(|outcome| StepEvent {
                            row_index: outcome.row_index,
                            step_index: outcome.step_index,
                            status: format!("{:?}", outcome.status).to_lowercase(),
                            duration_ms: outcome.duration.as_millis() as u64,
                            error: outcome.error,
                        })
                        .collect(),
                    logs: log.entries().into_iter().map(|entry| entry.message).collect(),
                    duration_ms,
                };
                if let Err(error) = self.project_store.update_test_run(&run_id, update).await {
                    warn!(%error, "failed to persist test-run update");
                }
            }
        }

        let close_tab = options.close_tab_on_complete.unwrap_or(self.tab_policy.close_tab_on_complete_default);
        if close_tab {
            if let Err(error) = self.tab_api.close(tab_id).await {
                warn!(%error, tab_id = tab_id.0, "failed to close tab on completion");
            }
        }
    }
}

fn build_reverse_lookup(project: &Project) -> HashMap<String, String> {
    let mut lookup = HashMap::new();
    for mapping in &project.field_mappings {
        if mapping.mapped {
            lookup.insert(mapping.field_name.clone(), mapping.step_label.clone());
        }
    }
    let mut reverse = HashMap::new();
    for (field_name, step_label) in lookup {
        reverse.insert(step_label, field_name);
    }
    reverse
}

fn determine_rows(project: &Project, options: &RunOptions) -> Vec<HashMap<String, Value>> {
    if let Some(indices) = &options.row_indices {
        indices
            .iter()
            .map(|&index| project.csv_rows.as_ref().and_then(|rows| rows.get(index)).cloned().unwrap_or_default())
            .collect()
    } else if let Some(rows) = &project.csv_rows {
        rows.clone()
    } else {
        vec![HashMap::new()]
    }
}

fn resolve_step_value(step: &Step, row: &HashMap<String, Value>, reverse_lookup: &HashMap<String, String>) -> Option<Value> {
    row.get(&step.label)
        .cloned()
        .or_else(|| reverse_lookup.get(&step.label).and_then(|field_name| row.get(field_name)).cloned())
}

fn merge_value(payload: &Value, resolved: Option<&Value>) -> Value {
    match resolved {
        None => payload.clone(),
        Some(value) => {
            let mut merged = payload.clone();
            if let Value::Object(map) = &mut merged {
                map.insert("value".to_string(), value.clone());
                merged
            } else {
                value.clone()
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
