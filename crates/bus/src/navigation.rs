//! Navigation-triggered re-injection: tracks a set of tab ids, debounces
//! bursts of main-frame navigation events on each tracked tab into a
//! single re-injection, and cleans up tracking state when a tab closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{InjectionWorld, TabId};
use relay_host::traits::{NavigationEvent, NavigationEvents, TabRemovedEvent};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::component::Component;
use crate::error::BusError;

type DynNavigationEvents = dyn NavigationEvents + Send + Sync;

/// Invoked once per settled navigation on a tracked tab. `Ok(true)` is a
/// successful injection, `Ok(false)`/`Err` a failure — this layer never
/// retries either outcome on its own.
pub type InjectionCallback =
    Arc<dyn Fn(TabId, bool, InjectionWorld) -> Result<bool, String> + Send + Sync>;

/// Invoked once a tracked tab is removed, after tracking state for it has
/// already been cleared.
pub type TabRemovedCallback = Arc<dyn Fn(TabId) + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct NavigationStats {
    pub reinjection_attempts: u64,
    pub reinjection_successes: u64,
    pub reinjection_failures: u64,
}

struct Counters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }
}

/// Tracks tabs for automatic re-injection and debounces navigation
/// bursts on each into a single injection per settled navigation.
pub struct NavigationSupervisor {
    events: Arc<DynNavigationEvents>,
    tracked: Arc<Mutex<std::collections::HashSet<i64>>>,
    pending: Arc<Mutex<HashMap<i64, JoinHandle<()>>>>,
    injector: InjectionCallback,
    on_removed: Option<TabRemovedCallback>,
    reinject_on_navigation: bool,
    all_frames: bool,
    world: InjectionWorld,
    navigation_delay: Duration,
    counters: Arc<Counters>,
}

impl NavigationSupervisor {
    pub fn new(
        events: Arc<DynNavigationEvents>,
        injector: InjectionCallback,
        on_removed: Option<TabRemovedCallback>,
        reinject_on_navigation: bool,
        all_frames: bool,
        world: InjectionWorld,
        navigation_delay: Duration,
    ) -> Self {
        Self {
            events,
            tracked: Arc::new(Mutex::new(std::collections::HashSet::new())),
            pending: Arc::new(Mutex::new(HashMap::new())),
            injector,
            on_removed,
            reinject_on_navigation,
            all_frames,
            world,
            navigation_delay,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn track(&self, tab_id: TabId) {
        self.tracked.lock().insert(tab_id.0);
    }

    pub fn untrack(&self, tab_id: TabId) {
        self.tracked.lock().remove(&tab_id.0);
        self.cancel_pending(tab_id.0);
    }

    pub fn is_tracked(&self, tab_id: TabId) -> bool {
        self.tracked.lock().contains(&tab_id.0)
    }

    fn cancel_pending(&self, tab_id: i64) {
        if let Some(handle) = self.pending.lock().remove(&tab_id) {
            handle.abort();
        }
    }

    /// Cancel any pending timer on `tab_id` and run the injection
    /// callback immediately. Never cancels or waits on an injection
    /// whose callback is already running — only a *pending*, not-yet-
    /// fired timer is affected.
    pub fn force_injection(&self, tab_id: TabId) -> bool {
        self.cancel_pending(tab_id.0);
        self.run_injection(tab_id)
    }

    fn run_injection(&self, tab_id: TabId) -> bool {
        self.counters.attempts.fetch_add(1, Ordering::Relaxed);
        match (self.injector)(tab_id, self.all_frames, self.world) {
            Ok(true) => {
                self.counters.successes.fetch_add(1, Ordering::Relaxed);
                true
            }
            Ok(false) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(tab_id = tab_id.0, "navigation supervisor: injection callback reported failure");
                false
            }
            Err(error) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(tab_id = tab_id.0, %error, "navigation supervisor: injection callback errored");
                false
            }
        }
    }

    /// Fired for every main-frame committed/completed/history-state
    /// event on a tracked tab: cancels any existing pending timer for
    /// this tab and schedules a fresh one, so a burst of triggers
    /// coalesces into exactly one injection after the last trigger plus
    /// the configured delay.
    fn debounce_reinjection(&self, tab_id: TabId) {
        if !self.reinject_on_navigation || !self.is_tracked(tab_id) {
            return;
        }
        self.cancel_pending(tab_id.0);

        let tracked = self.tracked.clone();
        let injector = self.injector.clone();
        let all_frames = self.all_frames;
        let world = self.world;
        let delay = self.navigation_delay;
        let counters = self.counters.clone();
        let pending = self.pending.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.lock().remove(&tab_id.0);
            if !tracked.lock().contains(&tab_id.0) {
                debug!(tab_id = tab_id.0, "navigation supervisor: tab untracked before debounce fired");
                return;
            }
            counters.attempts.fetch_add(1, Ordering::Relaxed);
            match injector(tab_id, all_frames, world) {
                Ok(true) => {
                    counters.successes.fetch_add(1, Ordering::Relaxed);
                }
                Ok(false) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(tab_id = tab_id.0, "navigation supervisor: re-injection reported failure");
                }
                Err(error) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(tab_id = tab_id.0, %error, "navigation supervisor: re-injection errored");
                }
            }
        });
        self.pending.lock().insert(tab_id.0, handle);
    }

    pub fn stats(&self) -> NavigationStats {
        NavigationStats {
            reinjection_attempts: self.counters.attempts.load(Ordering::Relaxed),
            reinjection_successes: self.counters.successes.load(Ordering::Relaxed),
            reinjection_failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    fn wire(&self) {
        let tracked = self.tracked.clone();
        let this_committed = self.clone_handle();
        self.events.on_committed(Arc::new(move |event: NavigationEvent| {
            if event.frame_id != 0 || !tracked.lock().contains(&event.tab_id.0) {
                return;
            }
            this_committed.debounce_reinjection(event.tab_id);
        }));

        let tracked = self.tracked.clone();
        let this_completed = self.clone_handle();
        self.events.on_completed(Arc::new(move |event: NavigationEvent| {
            if event.frame_id != 0 || !tracked.lock().contains(&event.tab_id.0) {
                return;
            }
            this_completed.debounce_reinjection(event.tab_id);
        }));

        let tracked = self.tracked.clone();
        let this_history = self.clone_handle();
        self.events.on_history_state_updated(Arc::new(move |event: NavigationEvent| {
            if event.frame_id != 0 || !tracked.lock().contains(&event.tab_id.0) {
                return;
            }
            this_history.debounce_reinjection(event.tab_id);
        }));

        let tracked = self.tracked.clone();
        let pending = self.pending.clone();
        let on_removed = self.on_removed.clone();
        self.events.on_removed(Arc::new(move |event: TabRemovedEvent| {
            if !tracked.lock().remove(&event.tab_id.0) {
                return;
            }
            if let Some(handle) = pending.lock().remove(&event.tab_id.0) {
                handle.abort();
            }
            if let Some(callback) = &on_removed {
                callback(event.tab_id);
            }
        }));
    }

    /// A `Clone`-like handle sharing this supervisor's state, needed
    /// because the event-bus callbacks close over `self` by value but
    /// `NavigationSupervisor` itself is held behind `Arc<dyn Component>`
    /// by the coordinator.
    fn clone_handle(&self) -> NavigationSupervisor {
        NavigationSupervisor {
            events: self.events.clone(),
            tracked: self.tracked.clone(),
            pending: self.pending.clone(),
            injector: self.injector.clone(),
            on_removed: self.on_removed.clone(),
            reinject_on_navigation: self.reinject_on_navigation,
            all_frames: self.all_frames,
            world: self.world,
            navigation_delay: self.navigation_delay,
            counters: self.counters.clone(),
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Component for NavigationSupervisor {
    fn name(&self) -> &str {
        "navigation"
    }

    async fn start(&self) -> Result<(), BusError> {
        self.wire();
        Ok(())
    }

    async fn stop(&self) -> Result<(), BusError> {
        self.events.clear_handlers();
        let pending: Vec<JoinHandle<()>> = self.pending.lock().drain().map(|(_, h)| h).collect();
        for handle in pending {
            handle.abort();
        }
        Ok(())
    }

    fn stats(&self) -> Option<Value> {
        serde_json::to_value(self.stats()).ok()
    }
}

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod tests;
