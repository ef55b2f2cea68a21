//! Install/update/startup/suspend supervision: classifies the host's
//! install reason, opens a designated page on first install, requests a
//! persistent-storage grant, and defers icon-click handling entirely to
//! a user handler once one is registered.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::TabId;
use relay_host::traits::{HostEventBus, IconClickHandler, InstallReason, InstalledEvent, PersistenceApi};
use relay_wire::Broadcast;
use serde_json::Value;
use tracing::{info, warn};

use crate::broadcast::BroadcastBus;
use crate::component::Component;
use crate::error::BusError;

type DynHostEventBus = dyn HostEventBus + Send + Sync;
type DynPersistenceApi = dyn PersistenceApi + Send + Sync;

/// Invoked to open the extension's designated page (a dashboard, a
/// welcome screen — the core does not care which). No-op by default.
pub type PageOpener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LifecycleStats {
    pub installs: u64,
    pub updates: u64,
    pub chrome_updates: u64,
    pub shared_module_updates: u64,
    pub startups: u64,
    pub suspends: u64,
    pub suspend_cancels: u64,
    pub icon_clicks: u64,
}

pub struct LifecycleSupervisor {
    event_bus: Arc<DynHostEventBus>,
    persistence: Arc<DynPersistenceApi>,
    broadcast: BroadcastBus,
    page_opener: PageOpener,
    request_persistence: bool,
    stats: Arc<Mutex<LifecycleStats>>,
    icon_click_handler: Arc<Mutex<Option<IconClickHandler>>>,
}

impl LifecycleSupervisor {
    pub fn new(
        event_bus: Arc<DynHostEventBus>,
        persistence: Arc<DynPersistenceApi>,
        broadcast: BroadcastBus,
        page_opener: PageOpener,
        request_persistence: bool,
    ) -> Self {
        Self {
            event_bus,
            persistence,
            broadcast,
            page_opener,
            request_persistence,
            stats: Arc::new(Mutex::new(LifecycleStats::default())),
            icon_click_handler: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a user icon-click handler. Once one is registered, the
    /// default "open the page" behavior never runs again — this is an
    /// override, not an addition.
    pub fn set_icon_click_handler(&self, handler: IconClickHandler) {
        *self.icon_click_handler.lock() = Some(handler);
    }

    pub fn clear_icon_click_handler(&self) {
        *self.icon_click_handler.lock() = None;
    }

    pub fn stats(&self) -> LifecycleStats {
        *self.stats.lock()
    }

    fn wire_installed(&self) {
        let stats = self.stats.clone();
        let page_opener = self.page_opener.clone();
        self.event_bus.on_installed(Arc::new(move |event: InstalledEvent| {
            {
                let mut stats = stats.lock();
                match event.reason {
                    InstallReason::Install => stats.installs += 1,
                    InstallReason::Update => stats.updates += 1,
                    InstallReason::ChromeUpdate => stats.chrome_updates += 1,
                    InstallReason::SharedModuleUpdate => stats.shared_module_updates += 1,
                }
            }
            // Only a fresh install opens the page; routine browser/extension
            // updates should not interrupt the user every time they happen.
            if event.reason == InstallReason::Install {
                info!("lifecycle: first install, opening designated page");
                page_opener();
            }
        }));
    }

    fn wire_startup(&self) {
        let stats = self.stats.clone();
        self.event_bus.on_startup(Arc::new(move || {
            stats.lock().startups += 1;
        }));
    }

    fn wire_suspend(&self) {
        let stats = self.stats.clone();
        self.event_bus.on_suspend(Arc::new(move || {
            stats.lock().suspends += 1;
        }));
        let stats = self.stats.clone();
        self.event_bus.on_suspend_canceled(Arc::new(move || {
            stats.lock().suspend_cancels += 1;
        }));
    }

    fn wire_icon_click(&self) {
        let stats = self.stats.clone();
        let page_opener = self.page_opener.clone();
        let icon_click_handler = self.icon_click_handler.clone();
        self.event_bus.on_clicked(Arc::new(move |tab_id: TabId| {
            stats.lock().icon_clicks += 1;
            match icon_click_handler.lock().clone() {
                Some(handler) => handler(tab_id),
                None => page_opener(),
            }
        }));
    }

    async fn request_persistent_storage(&self) {
        if !self.request_persistence {
            return;
        }
        match self.persistence.persist().await {
            Ok(true) => {
                info!("lifecycle: persistent storage granted");
                self.broadcast.publish(&Broadcast::new("storage_persisted"));
            }
            Ok(false) => {
                warn!("lifecycle: persistent storage denied");
                self.broadcast.publish(&Broadcast::new("storage_denied"));
            }
            Err(error) => {
                warn!(%error, "lifecycle: persistent-storage request failed");
            }
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Component for LifecycleSupervisor {
    fn name(&self) -> &str {
        "lifecycle"
    }

    async fn start(&self) -> Result<(), BusError> {
        self.wire_installed();
        self.wire_startup();
        self.wire_suspend();
        self.wire_icon_click();
        self.request_persistent_storage().await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), BusError> {
        self.event_bus.clear_handlers();
        Ok(())
    }

    fn stats(&self) -> Option<Value> {
        serde_json::to_value(self.stats()).ok()
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
