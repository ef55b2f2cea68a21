use super::*;
use async_trait::async_trait;
use parking_lot::Mutex as PLMutex;
use relay_core::{FakeClock, InjectionWorld, StateConfig, StorageType};
use relay_host::{KvStore, MockHostEventBus, MockKvStore, MockNavigationEvents, MockPersistenceApi};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use crate::lifecycle::LifecycleSupervisor;
use crate::navigation::NavigationSupervisor;

struct RecordingComponent {
    name: &'static str,
    log: Arc<PLMutex<Vec<String>>>,
    fail_start: bool,
    fail_stop: bool,
}

#[async_trait]
impl Component for RecordingComponent {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self) -> Result<(), BusError> {
        self.log.lock().push(format!("{}:start", self.name));
        if self.fail_start {
            return Err(BusError::ComponentStartFailed(self.name.to_string(), "boom".to_string()));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), BusError> {
        self.log.lock().push(format!("{}:stop", self.name));
        if self.fail_stop {
            return Err(BusError::ComponentStopFailed(self.name.to_string(), "boom".to_string()));
        }
        Ok(())
    }
}

fn build_coordinator(
    save_state_on_stop: bool,
) -> (ServiceCoordinator<FakeClock>, Arc<MockKvStore>, Arc<MockNavigationEvents>) {
    let clock = FakeClock::new();
    let kv = Arc::new(MockKvStore::new());
    let state_config =
        StateConfig { key_prefix: "bg_".to_string(), save_debounce_ms: 0, storage_type: StorageType::Local, auto_restore: true, request_persistence: false };
    let state = PersistentStateCache::new(kv.clone(), &state_config, clock.clone());

    let event_bus = Arc::new(MockHostEventBus::new());
    let persistence = Arc::new(MockPersistenceApi::default());
    let lifecycle = Arc::new(LifecycleSupervisor::new(
        event_bus,
        persistence,
        BroadcastBus::new(),
        Arc::new(|| {}),
        false,
    ));

    let nav_events = Arc::new(MockNavigationEvents::new());
    let navigation = Arc::new(NavigationSupervisor::new(
        nav_events.clone(),
        Arc::new(|_tab, _all_frames, _world| Ok(true)),
        None,
        true,
        true,
        InjectionWorld::Isolated,
        std::time::Duration::from_millis(10),
    ));

    let coordinator = ServiceCoordinator::new(
        clock,
        state,
        ActionBus::new(),
        BroadcastBus::new(),
        lifecycle,
        navigation,
        save_state_on_stop,
    );
    (coordinator, kv, nav_events)
}

#[tokio::test]
async fn initialize_restores_state_and_becomes_ready() {
    let (coordinator, kv, _nav) = build_coordinator(false);
    kv.set(std::iter::once(("bg_openedTabId".to_string(), serde_json::json!(42))).collect()).await.unwrap();

    coordinator.initialize().await.unwrap();

    assert_eq!(coordinator.status(), CoordinatorStatus::Ready);
    assert_eq!(coordinator.state().opened_tab_id().map(|t| t.0), Some(42));
}

#[tokio::test]
async fn start_runs_lifecycle_then_navigation_then_extras_in_order() {
    let (coordinator, _kv, _nav) = build_coordinator(false);
    coordinator.initialize().await.unwrap();

    let log = Arc::new(PLMutex::new(Vec::new()));
    coordinator
        .register_component(Arc::new(RecordingComponent {
            name: "extra-a",
            log: log.clone(),
            fail_start: false,
            fail_stop: false,
        }))
        .await;
    coordinator
        .register_component(Arc::new(RecordingComponent {
            name: "extra-b",
            log: log.clone(),
            fail_start: false,
            fail_stop: false,
        }))
        .await;

    coordinator.start().await.unwrap();
    assert_eq!(coordinator.status(), CoordinatorStatus::Running);
    assert_eq!(log.lock().clone(), vec!["extra-a:start", "extra-b:start"]);

    let health = coordinator.health();
    assert_eq!(health.components.len(), 4);
    assert!(health.components.iter().any(|c| c.name == "lifecycle"));
    assert!(health.components.iter().any(|c| c.name == "navigation"));
}

#[tokio::test]
async fn stop_tears_down_extras_in_reverse_then_navigation_then_lifecycle() {
    let (coordinator, _kv, _nav) = build_coordinator(false);
    coordinator.initialize().await.unwrap();

    let log = Arc::new(PLMutex::new(Vec::new()));
    coordinator
        .register_component(Arc::new(RecordingComponent {
            name: "extra-a",
            log: log.clone(),
            fail_start: false,
            fail_stop: false,
        }))
        .await;
    coordinator
        .register_component(Arc::new(RecordingComponent {
            name: "extra-b",
            log: log.clone(),
            fail_start: false,
            fail_stop: false,
        }))
        .await;

    coordinator.start().await.unwrap();
    log.lock().clear();
    coordinator.stop().await.unwrap();

    assert_eq!(coordinator.status(), CoordinatorStatus::Stopped);
    assert_eq!(log.lock().clone(), vec!["extra-b:stop", "extra-a:stop"]);
}

#[tokio::test]
async fn a_failing_component_does_not_abort_teardown_of_its_peers() {
    let (coordinator, _kv, _nav) = build_coordinator(false);
    coordinator.initialize().await.unwrap();

    let log = Arc::new(PLMutex::new(Vec::new()));
    coordinator
        .register_component(Arc::new(RecordingComponent {
            name: "flaky",
            log: log.clone(),
            fail_start: false,
            fail_stop: true,
        }))
        .await;
    coordinator
        .register_component(Arc::new(RecordingComponent {
            name: "healthy",
            log: log.clone(),
            fail_start: false,
            fail_stop: false,
        }))
        .await;

    coordinator.start().await.unwrap();
    log.lock().clear();
    let result = coordinator.stop().await;

    assert!(result.is_ok());
    assert_eq!(log.lock().clone(), vec!["healthy:stop", "flaky:stop"]);
}

#[tokio::test]
async fn late_registered_component_is_auto_started_once_running() {
    let (coordinator, _kv, _nav) = build_coordinator(false);
    coordinator.initialize().await.unwrap();
    coordinator.start().await.unwrap();

    let log = Arc::new(PLMutex::new(Vec::new()));
    let started = Arc::new(AtomicUsize::new(0));
    let sink = started.clone();
    struct CountingComponent {
        log: Arc<PLMutex<Vec<String>>>,
        started: Arc<AtomicUsize>,
    }
    #[async_trait]
    impl Component for CountingComponent {
        fn name(&self) -> &str {
            "late"
        }
        async fn start(&self) -> Result<(), BusError> {
            self.log.lock().push("late:start".to_string());
            self.started.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        }
        async fn stop(&self) -> Result<(), BusError> {
            Ok(())
        }
    }
    coordinator.register_component(Arc::new(CountingComponent { log: log.clone(), started: sink })).await;

    assert_eq!(started.load(AtomicOrdering::SeqCst), 1);
    assert_eq!(log.lock().clone(), vec!["late:start"]);
}

#[tokio::test]
async fn stop_saves_a_state_snapshot_first_when_configured() {
    let (coordinator, kv, _nav) = build_coordinator(true);
    coordinator.initialize().await.unwrap();
    coordinator.start().await.unwrap();
    coordinator.stop().await.unwrap();

    let all = kv.get_all().await.unwrap();
    assert!(all.contains_key("bg_persistedState"));
}
