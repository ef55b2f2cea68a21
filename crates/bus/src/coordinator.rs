//! Composes the lifecycle supervisor, the navigation supervisor, and any
//! caller-registered components into one ordered start/stop sequence,
//! restoring persisted state on `initialize()` and saving a snapshot on
//! `stop()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use relay_core::Clock;
use relay_state::PersistentStateCache;
use serde_json::Value;
use tracing::{error, info};

use crate::action_bus::ActionBus;
use crate::broadcast::BroadcastBus;
use crate::component::Component;
use crate::error::BusError;
use crate::lifecycle::LifecycleSupervisor;
use crate::navigation::NavigationSupervisor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorStatus {
    Uninitialized,
    Initializing,
    Ready,
    Running,
    Paused,
    Stopping,
    Stopped,
    Error,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub active: bool,
    pub stats: Option<Value>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthSnapshot {
    pub status: CoordinatorStatus,
    pub uptime_ms: u64,
    pub started_at_epoch_ms: Option<u64>,
    pub last_activity_epoch_ms: Option<u64>,
    pub components: Vec<ComponentHealth>,
}

struct ComponentEntry {
    component: Arc<dyn Component>,
    active: AtomicBool,
}

/// Composes and sequences every long-lived background component.
/// Exclusively owns the lifecycle/navigation/message-bus side of the
/// core; the test orchestrator is a separate, independently driven
/// collaborator (`relay-orchestrator`) that this coordinator never
/// reaches into.
pub struct ServiceCoordinator<C: Clock> {
    clock: C,
    state: PersistentStateCache<C>,
    action_bus: ActionBus,
    broadcast: BroadcastBus,
    save_state_on_stop: bool,
    lifecycle: Arc<LifecycleSupervisor>,
    navigation: Arc<NavigationSupervisor>,
    extra: Mutex<Vec<Arc<ComponentEntry>>>,
    status: Mutex<CoordinatorStatus>,
    started_at_epoch_ms: Mutex<Option<u64>>,
    last_activity_epoch_ms: Mutex<Option<u64>>,
}

impl<C: Clock> ServiceCoordinator<C> {
    pub fn new(
        clock: C,
        state: PersistentStateCache<C>,
        action_bus: ActionBus,
        broadcast: BroadcastBus,
        lifecycle: Arc<LifecycleSupervisor>,
        navigation: Arc<NavigationSupervisor>,
        save_state_on_stop: bool,
    ) -> Self {
        Self {
            clock,
            state,
            action_bus,
            broadcast,
            save_state_on_stop,
            lifecycle,
            navigation,
            extra: Mutex::new(Vec::new()),
            status: Mutex::new(CoordinatorStatus::Uninitialized),
            started_at_epoch_ms: Mutex::new(None),
            last_activity_epoch_ms: Mutex::new(None),
        }
    }

    pub fn action_bus(&self) -> &ActionBus {
        &self.action_bus
    }

    pub fn broadcast(&self) -> &BroadcastBus {
        &self.broadcast
    }

    pub fn state(&self) -> &PersistentStateCache<C> {
        &self.state
    }

    pub fn status(&self) -> CoordinatorStatus {
        *self.status.lock()
    }

    fn touch_activity(&self) {
        *self.last_activity_epoch_ms.lock() = Some(self.clock.epoch_ms());
    }

    /// Register an additional component to be started/stopped after
    /// lifecycle and navigation. If the coordinator is already running,
    /// the component is started immediately (components added after
    /// `start()` are auto-started).
    pub async fn register_component(&self, component: Arc<dyn Component>) {
        let entry = Arc::new(ComponentEntry { component: component.clone(), active: AtomicBool::new(false) });
        let already_running = *self.status.lock() == CoordinatorStatus::Running;
        if already_running {
            match component.start().await {
                Ok(()) => entry.active.store(true, Ordering::Relaxed),
                Err(error) => error!(component = component.name(), %error, "failed to auto-start late-registered component"),
            }
        }
        self.extra.lock().push(entry);
    }

    /// Restores persisted state and prepares the coordinator to run.
    /// Idempotent ordering note: this does not start any component — it
    /// only puts the cache in a known-good state and marks the
    /// coordinator `ready`.
    ///
    /// Restoration is two-layered: `restore()` mirrors every prefixed key
    /// from the backing store into the cache (including the well-known
    /// keys a prior process already wrote directly), then, if a
    /// `persistedState` snapshot with an accepted version is also
    /// present, its fields are re-applied on top — the path that matters
    /// after a process revival where only the coalesced snapshot, not the
    /// individual keys, made it to the backing store before the process
    /// died.
    pub async fn initialize(&self) -> Result<(), BusError> {
        *self.status.lock() = CoordinatorStatus::Initializing;
        if let Err(error) = self.state.restore().await {
            error!(%error, "service coordinator: state restore failed during initialize");
            *self.status.lock() = CoordinatorStatus::Error;
            return Err(BusError::from(error));
        }
        if let Some(snapshot) = self.state.load_snapshot() {
            if let Err(error) = self.state.apply_snapshot(&snapshot).await {
                error!(%error, "service coordinator: failed to apply restored snapshot");
            }
        }
        *self.status.lock() = CoordinatorStatus::Ready;
        info!("service coordinator: initialized");
        Ok(())
    }

    /// Starts lifecycle, then navigation, then every registered extra
    /// component, in that order. Every component gets a start attempt
    /// regardless of earlier failures; failures are logged and
    /// aggregated. Returns `Err` (coordinator transitions to `error`) iff
    /// at least one component failed to start.
    pub async fn start(&self) -> Result<(), BusError> {
        let mut failures = Vec::new();

        match self.lifecycle.start().await {
            Ok(()) => {}
            Err(error) => failures.push((self.lifecycle.name().to_string(), error)),
        }
        match self.navigation.start().await {
            Ok(()) => {}
            Err(error) => failures.push((self.navigation.name().to_string(), error)),
        }
        let extra: Vec<Arc<ComponentEntry>> = self.extra.lock().clone();
        for entry in &extra {
            match entry.component.start().await {
                Ok(()) => entry.active.store(true, Ordering::Relaxed),
                Err(error) => failures.push((entry.component.name().to_string(), error)),
            }
        }

        self.touch_activity();
        *self.started_at_epoch_ms.lock() = Some(self.clock.epoch_ms());

        if failures.is_empty() {
            *self.status.lock() = CoordinatorStatus::Running;
            info!("service coordinator: started");
            Ok(())
        } else {
            for (name, error) in &failures {
                error!(component = %name, %error, "service coordinator: component failed to start");
            }
            *self.status.lock() = CoordinatorStatus::Error;
            let (name, error) = failures.remove(0);
            Err(BusError::ComponentStartFailed(name, error.to_string()))
        }
    }

    /// Stops every extra component in reverse registration order, then
    /// navigation, then lifecycle. Saves a state snapshot first if
    /// configured. A failure on one component is caught, logged, and
    /// never aborts the teardown of the peers still pending.
    pub async fn stop(&self) -> Result<(), BusError> {
        *self.status.lock() = CoordinatorStatus::Stopping;

        if self.save_state_on_stop {
            if let Err(error) = self.state.save_snapshot(chrono::Utc::now()).await {
                error!(%error, "service coordinator: failed to save state snapshot on stop");
            }
        }

        let extra: Vec<Arc<ComponentEntry>> = self.extra.lock().clone();
        for entry in extra.iter().rev() {
            if let Err(error) = entry.component.stop().await {
                error!(component = entry.component.name(), %error, "service coordinator: component failed to stop");
            }
            entry.active.store(false, Ordering::Relaxed);
        }
        if let Err(error) = self.navigation.stop().await {
            error!(%error, "service coordinator: navigation failed to stop");
        }
        if let Err(error) = self.lifecycle.stop().await {
            error!(%error, "service coordinator: lifecycle failed to stop");
        }

        *self.status.lock() = CoordinatorStatus::Stopped;
        info!("service coordinator: stopped");
        Ok(())
    }

    pub fn health(&self) -> HealthSnapshot {
        let now = self.clock.epoch_ms();
        let started_at = *self.started_at_epoch_ms.lock();
        let uptime_ms = started_at.map(|s| now.saturating_sub(s)).unwrap_or(0);

        let mut components = vec![
            ComponentHealth {
                name: self.lifecycle.name().to_string(),
                active: *self.status.lock() == CoordinatorStatus::Running,
                stats: Component::stats(self.lifecycle.as_ref()),
            },
            ComponentHealth {
                name: self.navigation.name().to_string(),
                active: *self.status.lock() == CoordinatorStatus::Running,
                stats: Component::stats(self.navigation.as_ref()),
            },
        ];
        for entry in self.extra.lock().iter() {
            components.push(ComponentHealth {
                name: entry.component.name().to_string(),
                active: entry.active.load(Ordering::Relaxed),
                stats: entry.component.stats(),
            });
        }

        HealthSnapshot {
            status: *self.status.lock(),
            uptime_ms,
            started_at_epoch_ms: started_at,
            last_activity_epoch_ms: *self.last_activity_epoch_ms.lock(),
            components,
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
