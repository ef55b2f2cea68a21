//! Constructs one process's worth of collaborators — the service
//! coordinator (lifecycle + navigation + state) and an independently
//! driven test orchestrator — and runs a single demo replay end to end.
//!
//! Every host adapter here is the in-memory double from
//! `relay_host::mock`; a real deployment swaps these for the `chrome`
//! feature's bindings without touching anything below.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use relay_bus::{Keepalive, LifecycleSupervisor, NavigationSupervisor, ServiceCoordinator};
use relay_core::{Config, ProjectId, SystemClock};
use relay_host::{MockAlarmScheduler, MockHostEventBus, MockKvStore, MockNavigationEvents, MockPageAgentChannel, MockPersistenceApi, MockScriptInjector, MockTabApi};
use relay_orchestrator::collaborators::mock::MockProjectStore;
use relay_orchestrator::{FieldMapping, Project, RunOptions, Step, TestOrchestrator};
use relay_state::PersistentStateCache;
use serde_json::Value;
use tracing::info;

/// One demo project with a two-row CSV fixture: fill in a username field
/// from the row, then click submit.
fn demo_project(project_id: ProjectId) -> Project {
    Project {
        id: project_id,
        target_url: "https://example.com/login".to_string(),
        steps: vec![
            Step { label: "username".to_string(), event: "input".to_string(), value: None, payload: serde_json::json!({ "label": "username", "selector": "#username" }) },
            Step { label: "submit".to_string(), event: "click".to_string(), value: None, payload: serde_json::json!({ "label": "submit", "selector": "#submit" }) },
        ],
        field_mappings: vec![FieldMapping { step_label: "username".to_string(), field_name: "user".to_string(), mapped: true }],
        csv_rows: Some(vec![
            HashMap::from([("user".to_string(), Value::String("alice".to_string()))]),
            HashMap::from([("user".to_string(), Value::String("bob".to_string()))]),
        ]),
    }
}

/// Wires one `ServiceCoordinator` and one `TestOrchestrator` over
/// in-memory host doubles, replays the demo project once, and prints a
/// summary of the run.
pub async fn run_demo() -> Result<()> {
    let config = Config::development();
    config.validate().context("built-in development preset failed validation")?;

    let clock = SystemClock::default();

    let kv_store: Arc<dyn relay_host::KvStore + Send + Sync> = Arc::new(MockKvStore::new());
    let state = PersistentStateCache::new(kv_store, &config.state, clock.clone());

    let action_bus = relay_bus::ActionBus::new();
    let broadcast = relay_bus::BroadcastBus::new();

    let lifecycle = Arc::new(LifecycleSupervisor::new(
        Arc::new(MockHostEventBus::new()),
        Arc::new(MockPersistenceApi::default()),
        broadcast.clone(),
        Arc::new(|| info!("demo page opener invoked")),
        config.state.request_persistence,
    ));

    let script_injector = Arc::new(MockScriptInjector::new());
    let navigation = Arc::new(NavigationSupervisor::new(
        Arc::new(MockNavigationEvents::new()),
        Arc::new(|_tab_id, _all_frames, _world| Ok(true)),
        None,
        config.injection.reinject_on_navigation,
        config.injection.all_frames,
        config.injection.world,
        std::time::Duration::from_millis(config.injection.navigation_delay_ms),
    ));

    let coordinator = ServiceCoordinator::new(clock.clone(), state, action_bus, broadcast.clone(), lifecycle, navigation.clone(), false);
    coordinator.initialize().await.context("service coordinator failed to initialize")?;

    let keepalive = Arc::new(Keepalive::new(
        Arc::new(MockAlarmScheduler::new()),
        broadcast.clone(),
        clock.clone(),
        config.keepalive.interval_minutes,
    ));
    coordinator.register_component(keepalive).await;

    coordinator.start().await.context("service coordinator failed to start")?;
    info!(status = ?coordinator.status(), "service coordinator running");

    let project_store = Arc::new(MockProjectStore::new());
    let project_id = ProjectId::new();
    project_store.seed(demo_project(project_id.clone()));

    let orchestrator = TestOrchestrator::new(
        clock,
        Arc::new(relay_core::RealSleeper::default()),
        project_store,
        Arc::new(MockTabApi::new()),
        script_injector,
        Arc::new(MockPageAgentChannel::new()),
        navigation,
        config.tab,
        config.injection,
    );

    let mut options = RunOptions::new(project_id);
    options.persist_results = false;
    let summary = orchestrator.run(options).await.context("demo replay failed")?;

    info!(
        state = ?summary.state,
        rows_processed = summary.results.rows_processed,
        passed_rows = summary.results.passed_rows,
        failed_rows = summary.results.failed_rows,
        "demo replay finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary_as_json(&summary))?);

    coordinator.stop().await.context("service coordinator failed to stop")?;
    Ok(())
}

fn summary_as_json(summary: &relay_orchestrator::TestRunSummary) -> Value {
    serde_json::json!({
        "state": format!("{:?}", summary.state),
        "run_id": summary.run_id.as_ref().map(|id| id.to_string()),
        "results": {
            "total_rows": summary.results.total_rows,
            "rows_processed": summary.results.rows_processed,
            "passed_rows": summary.results.passed_rows,
            "failed_rows": summary.results.failed_rows,
            "passed_steps": summary.results.passed_steps,
            "failed_steps": summary.results.failed_steps,
            "skipped_steps": summary.results.skipped_steps,
        },
        "session_status": format!("{:?}", summary.session.status),
    })
}
