use super::*;
use crate::traits::{ExecuteScriptParams, InstallReason, InstalledEvent};
use relay_core::InjectionWorld;

#[tokio::test]
async fn alarm_scheduler_tracks_created_alarms_and_fires_handler() {
    let alarms = MockAlarmScheduler::new();
    alarms.create("keepalive", Duration::from_secs(60)).await.unwrap();
    assert_eq!(alarms.active_alarms().len(), 1);

    let fired = Arc::new(Mutex::new(Vec::new()));
    let fired_clone = fired.clone();
    alarms.set_handler(Arc::new(move |name: &str| fired_clone.lock().push(name.to_string())));
    alarms.fire("keepalive");
    assert_eq!(*fired.lock(), vec!["keepalive".to_string()]);

    assert!(alarms.clear("keepalive").await.unwrap());
    assert!(alarms.active_alarms().is_empty());
}

#[tokio::test]
async fn host_event_bus_dispatches_to_the_registered_handler() {
    let bus = MockHostEventBus::new();
    let seen = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();
    bus.on_installed(Arc::new(move |e: InstalledEvent| *seen_clone.lock() = Some(e)));
    bus.fire_installed(InstalledEvent { reason: InstallReason::Install, previous_version: None });
    assert_eq!(seen.lock().as_ref().unwrap().reason, InstallReason::Install);
}

#[tokio::test]
async fn host_event_bus_has_click_handler_reports_registration() {
    let bus = MockHostEventBus::new();
    assert!(!bus.has_click_handler());
    bus.on_clicked(Arc::new(|_tab_id| {}));
    assert!(bus.has_click_handler());
}

#[tokio::test]
async fn host_event_bus_clear_handlers_removes_every_subscription() {
    let bus = MockHostEventBus::new();
    bus.on_clicked(Arc::new(|_| {}));
    bus.clear_handlers();
    assert!(!bus.has_click_handler());
}

#[tokio::test]
async fn script_injector_records_calls_and_can_be_made_to_fail() {
    let injector = MockScriptInjector::new();
    let params = ExecuteScriptParams {
        tab_id: TabId(7),
        all_frames: true,
        world: InjectionWorld::Isolated,
        files: vec!["agent.js".to_string()],
    };
    injector.execute_script(params.clone()).await.unwrap();
    assert_eq!(injector.calls(), vec![params.clone()]);

    injector.fail_next_n(1);
    let err = injector.execute_script(params).await.unwrap_err();
    assert!(matches!(err, HostError::Injection(_)));
}

#[tokio::test]
async fn tab_api_create_and_query_round_trip() {
    let tabs = MockTabApi::new();
    let id = tabs.create("https://example.com", true).await.unwrap();
    assert_eq!(tabs.query_by_url("https://example.com").await.unwrap(), vec![id]);
    assert!(tabs.is_open(id).await.unwrap());

    tabs.close(id).await.unwrap();
    assert!(!tabs.is_open(id).await.unwrap());
    assert!(tabs.query_by_url("https://example.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn tab_api_seeded_tab_is_queryable_and_advances_next_id() {
    let tabs = MockTabApi::new();
    tabs.seed_open_tab(TabId(42), "https://seeded.example");
    assert!(tabs.is_open(TabId(42)).await.unwrap());
    let next = tabs.create("https://other.example", false).await.unwrap();
    assert!(next.0 > 42);
}

#[tokio::test]
async fn tab_api_unknown_tab_is_reported_as_not_found() {
    let tabs = MockTabApi::new();
    let err = tabs.update_active(TabId(999), true).await.unwrap_err();
    assert!(matches!(err, HostError::TabNotFound(999)));
}

#[tokio::test]
async fn kv_store_set_get_remove_clear_round_trip() {
    let store = MockKvStore::new();
    let mut items = HashMap::new();
    items.insert("bg_openedTabId".to_string(), serde_json::json!(7));
    store.set(items).await.unwrap();

    let got = store.get(&["bg_openedTabId".to_string()]).await.unwrap();
    assert_eq!(got["bg_openedTabId"], serde_json::json!(7));

    store.remove(&["bg_openedTabId".to_string()]).await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());

    store.set(HashMap::from([("k".to_string(), serde_json::json!(1))])).await.unwrap();
    store.clear().await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn kv_store_fail_next_n_surfaces_a_storage_error_then_recovers() {
    let store = MockKvStore::new();
    store.fail_next_n(1);
    let err = store.get_all().await.unwrap_err();
    assert!(matches!(err, HostError::Storage(_)));
    assert!(store.get_all().await.is_ok());
}

#[tokio::test]
async fn persistence_api_reports_the_configured_grant() {
    let denied = MockPersistenceApi { grant: false };
    assert!(!denied.persist().await.unwrap());
    assert!(!denied.persisted().await.unwrap());

    let granted = MockPersistenceApi::default();
    assert!(granted.persist().await.unwrap());
}

#[tokio::test]
async fn page_agent_channel_defaults_to_success_and_records_sent_steps() {
    let channel = MockPageAgentChannel::new();
    channel.set_ready(true);
    assert!(channel.ping_ready(TabId(1), Duration::from_millis(100)).await.unwrap());

    let ok = channel
        .send_step(TabId(1), serde_json::json!({"event": "click"}), Duration::from_millis(100))
        .await
        .unwrap();
    assert!(ok);
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn page_agent_channel_replays_a_scripted_outcome_sequence() {
    let channel = MockPageAgentChannel::new();
    channel.script_outcomes(vec![true, false]);

    let first = channel.send_step(TabId(1), serde_json::json!({}), Duration::from_millis(50)).await.unwrap();
    let second = channel.send_step(TabId(1), serde_json::json!({}), Duration::from_millis(50)).await.unwrap();
    assert!(first);
    assert!(!second);
}
