use super::*;
use crate::collaborators::mock::MockProjectStore;
use crate::collaborators::{FieldMapping, Step};
use relay_core::config::InjectionWorld;
use relay_core::FakeClock;
use relay_core::RecordingSleeper;
use relay_host::{MockNavigationEvents, MockPageAgentChannel, MockScriptInjector, MockTabApi};

fn tab_policy() -> TabPolicyConfig {
    TabPolicyConfig { close_tab_on_complete_default: false, reuse_tab_default: true }
}

fn injection_config() -> InjectionConfig {
    InjectionConfig { world: InjectionWorld::Isolated, all_frames: true, navigation_delay_ms: 10, reinject_on_navigation: true }
}

struct Harness {
    orchestrator: TestOrchestrator<FakeClock>,
    project_store: Arc<MockProjectStore>,
    page_agent: Arc<MockPageAgentChannel>,
    tab_api: Arc<MockTabApi>,
    script_injector: Arc<MockScriptInjector>,
    sleeper: Arc<RecordingSleeper>,
}

fn build_harness() -> Harness {
    let clock = FakeClock::new();
    let sleeper = Arc::new(RecordingSleeper::new());
    let project_store = Arc::new(MockProjectStore::new());
    let tab_api = Arc::new(MockTabApi::new());
    let script_injector = Arc::new(MockScriptInjector::new());
    let page_agent = Arc::new(MockPageAgentChannel::new());
    page_agent.set_ready(true);
    let nav_events = Arc::new(MockNavigationEvents::new());
    let navigation = Arc::new(NavigationSupervisor::new(
        nav_events,
        Arc::new(|_tab_id, _all_frames, _world| Ok(true)),
        None,
        true,
        true,
        InjectionWorld::Isolated,
        Duration::from_millis(10),
    ));

    let orchestrator = TestOrchestrator::new(
        clock,
        sleeper.clone(),
        project_store.clone(),
        tab_api.clone(),
        script_injector.clone(),
        page_agent.clone(),
        navigation,
        tab_policy(),
        injection_config(),
    );

    Harness { orchestrator, project_store, page_agent, tab_api, script_injector, sleeper }
}

fn step(label: &str, event: &str) -> Step {
    Step { label: label.to_string(), event: event.to_string(), value: None, payload: serde_json::json!({ "label": label }) }
}

fn seed_project(store: &MockProjectStore, id: ProjectId, steps: Vec<Step>, csv_rows: Option<Vec<HashMap<String, Value>>>) {
    store.seed(Project {
        id,
        target_url: "https://example.com".to_string(),
        steps,
        field_mappings: vec![FieldMapping { step_label: "username".to_string(), field_name: "user".to_string(), mapped: true }],
        csv_rows,
    });
}

#[tokio::test]
async fn a_successful_run_over_two_rows_completes_and_persists_results() {
    let harness = build_harness();
    let project_id = ProjectId::new();
    let rows = vec![
        HashMap::from([("username".to_string(), Value::String("alice".to_string()))]),
        HashMap::from([("username".to_string(), Value::String("bob".to_string()))]),
    ];
    seed_project(&harness.project_store, project_id.clone(), vec![step("username", "input"), step("submit", "click")], Some(rows));

    let mut options = RunOptions::new(project_id);
    options.persist_results = true;

    let summary = harness.orchestrator.run(options).await.unwrap();

    assert_eq!(summary.state, OrchestratorState::Completed);
    assert_eq!(summary.results.rows_processed, 2);
    assert_eq!(summary.results.passed_rows, 2);
    assert_eq!(harness.page_agent.sent().len(), 4);
    assert!(harness.project_store.run_update(&summary.run_id.unwrap()).is_some());
}

#[tokio::test]
async fn a_project_with_no_steps_fails_to_load() {
    let harness = build_harness();
    let project_id = ProjectId::new();
    seed_project(&harness.project_store, project_id.clone(), Vec::new(), None);

    let error = harness.orchestrator.run(RunOptions::new(project_id)).await.unwrap_err();
    assert!(matches!(error, OrchestratorError::EmptyStepList(_)));
    assert_eq!(harness.orchestrator.state(), OrchestratorState::Error);
}

#[tokio::test]
async fn an_unknown_project_id_surfaces_a_project_store_error() {
    let harness = build_harness();
    let error = harness.orchestrator.run(RunOptions::new(ProjectId::new())).await.unwrap_err();
    assert!(matches!(error, OrchestratorError::ProjectStore(_)));
}

#[tokio::test]
async fn an_input_step_with_no_matching_row_value_is_skipped() {
    let harness = build_harness();
    let project_id = ProjectId::new();
    let rows = vec![HashMap::from([("other_field".to_string(), Value::String("x".to_string()))])];
    seed_project(&harness.project_store, project_id.clone(), vec![step("username", "input")], Some(rows));

    let summary = harness.orchestrator.run(RunOptions::new(project_id)).await.unwrap();
    assert_eq!(summary.results.skipped_steps, 1);
    assert!(harness.page_agent.sent().is_empty());
}

#[tokio::test]
async fn a_row_key_equal_to_the_step_label_resolves_directly() {
    let harness = build_harness();
    let project_id = ProjectId::new();
    let rows = vec![HashMap::from([("submit".to_string(), Value::String("go".to_string()))])];
    seed_project(&harness.project_store, project_id.clone(), vec![step("submit", "click")], Some(rows));

    let summary = harness.orchestrator.run(RunOptions::new(project_id)).await.unwrap();
    assert_eq!(summary.results.passed_steps, 1);
    let (_, payload) = &harness.page_agent.sent()[0];
    assert_eq!(payload["value"], Value::String("go".to_string()));
}

#[tokio::test]
async fn a_failed_step_aborts_the_rest_of_the_row_and_propagates_a_stop_unless_continue_on_row_failure_is_set() {
    let harness = build_harness();
    harness.page_agent.script_outcomes(vec![false, true]);
    let project_id = ProjectId::new();
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click"), step("b", "click")], None);

    let summary = harness.orchestrator.run(RunOptions::new(project_id)).await.unwrap();
    assert_eq!(summary.results.failed_rows, 1);
    assert_eq!(harness.page_agent.sent().len(), 1);
    assert_eq!(summary.state, OrchestratorState::Stopped);
    assert_eq!(summary.session.status, crate::session::SessionStatus::Stopped);
}

#[tokio::test]
async fn a_failed_step_without_continue_on_row_failure_aborts_every_remaining_row() {
    let harness = build_harness();
    harness.page_agent.script_outcomes(vec![false, true, true]);
    let project_id = ProjectId::new();
    let rows = vec![HashMap::new(), HashMap::new(), HashMap::new()];
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click")], Some(rows));

    let summary = harness.orchestrator.run(RunOptions::new(project_id)).await.unwrap();

    assert_eq!(summary.state, OrchestratorState::Stopped);
    assert_eq!(harness.page_agent.sent().len(), 1);
    assert_eq!(summary.results.rows_processed, 1);
}

#[tokio::test]
async fn continue_on_row_failure_runs_every_step_in_the_row() {
    let harness = build_harness();
    harness.page_agent.script_outcomes(vec![false, true]);
    let project_id = ProjectId::new();
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click"), step("b", "click")], None);

    let mut options = RunOptions::new(project_id);
    options.continue_on_row_failure = true;
    let summary = harness.orchestrator.run(options).await.unwrap();

    assert_eq!(harness.page_agent.sent().len(), 2);
    assert_eq!(summary.results.failed_rows, 1);
}

#[tokio::test]
async fn max_row_failures_stops_the_run_with_the_max_errors_reason() {
    let harness = build_harness();
    harness.page_agent.script_outcomes(vec![false, false, false]);
    let project_id = ProjectId::new();
    let rows = vec![HashMap::new(), HashMap::new(), HashMap::new()];
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click")], Some(rows));

    let mut options = RunOptions::new(project_id);
    options.max_row_failures = 1;
    let summary = harness.orchestrator.run(options).await.unwrap();

    assert_eq!(summary.state, OrchestratorState::Stopped);
    assert_eq!(summary.session.status, crate::session::SessionStatus::Stopped);
}

#[tokio::test]
async fn an_unready_agent_is_re_injected_once_before_failing() {
    let harness = build_harness();
    harness.page_agent.set_ready(false);
    let project_id = ProjectId::new();
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click")], None);

    let error = harness.orchestrator.run(RunOptions::new(project_id)).await.unwrap_err();
    assert!(matches!(error, OrchestratorError::AgentNotReady { .. }));
    assert_eq!(harness.script_injector.calls().len(), 2);
}

#[tokio::test]
async fn reusing_an_existing_open_tab_skips_creating_a_new_one() {
    let harness = build_harness();
    let existing = TabId(42);
    harness.tab_api.seed_open_tab(existing, "https://example.com");
    let project_id = ProjectId::new();
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click")], None);

    let mut options = RunOptions::new(project_id);
    options.existing_tab_id = Some(existing);
    let summary = harness.orchestrator.run(options).await.unwrap();

    assert_eq!(summary.state, OrchestratorState::Completed);
    let (sent_tab, _) = &harness.page_agent.sent()[0];
    assert_eq!(*sent_tab, existing);
}

#[tokio::test]
async fn close_tab_on_complete_closes_the_tab_the_orchestrator_opened() {
    let harness = build_harness();
    let project_id = ProjectId::new();
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click")], None);

    let mut options = RunOptions::new(project_id);
    options.close_tab_on_complete = Some(true);
    harness.orchestrator.run(options).await.unwrap();

    let opened = TabId(1);
    assert!(!harness.tab_api.is_open(opened).await.unwrap());
}

#[tokio::test]
async fn sliced_delays_are_requested_in_chunks_no_larger_than_the_slice() {
    let harness = build_harness();
    let project_id = ProjectId::new();
    let rows = vec![HashMap::new(), HashMap::new()];
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click")], Some(rows));

    let mut options = RunOptions::new(project_id);
    options.row_delay = Duration::from_millis(250);
    harness.orchestrator.run(options).await.unwrap();

    let requested = harness.sleeper.requested();
    assert!(requested.iter().all(|d| *d <= DELAY_SLICE));
    assert_eq!(requested.iter().map(|d| d.as_millis()).sum::<u128>(), 250);
}

#[tokio::test]
async fn a_stop_requested_before_run_is_reset_by_the_fresh_run_starting() {
    let harness = build_harness();
    let project_id = ProjectId::new();
    seed_project(&harness.project_store, project_id.clone(), vec![step("a", "click")], None);
    harness.orchestrator.request_stop(StopReason::UserRequested, "stale stop from a previous run");

    let summary = harness.orchestrator.run(RunOptions::new(project_id)).await.unwrap();
    assert_eq!(summary.state, OrchestratorState::Completed);
}

#[test]
fn transition_table_matches_the_published_relation() {
    use OrchestratorState::*;
    assert!(OrchestratorState::allows(Idle, Loading));
    assert!(OrchestratorState::allows(Loading, Ready));
    assert!(OrchestratorState::allows(Loading, Error));
    assert!(!OrchestratorState::allows(Idle, Running));
    assert!(!OrchestratorState::allows(Stopped, Running));
    assert!(OrchestratorState::allows(Stopped, Idle));
}
