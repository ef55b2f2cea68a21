//! Host surface adapters. Every trait here is a thin
//! wrapper over one host API family and is injectable for testing —
//! `relay-host::mock` provides an in-memory double of each, and
//! `relay-host::chrome` (feature `chrome`, `wasm32` only) wires the real
//! `chrome.*` extension APIs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{InjectionWorld, TabId};
use serde_json::Value;

use crate::error::HostError;

// Native builds run adapters across tokio's multi-threaded executor, so
// every trait below needs `Send + Sync`. The `chrome` feature's bindings
// hold raw `JsValue`s, which are `!Send` by construction on wasm32's
// single-threaded model; `MaybeSend` lets the same trait definitions
// carry that bound only where it is satisfiable.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSend for T {}

/// `onInstalled`'s install reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
    ChromeUpdate,
    SharedModuleUpdate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstalledEvent {
    pub reason: InstallReason,
    pub previous_version: Option<String>,
}

pub type AlarmHandler = Arc<dyn Fn(&str) + Send + Sync>;
pub type VoidHandler = Arc<dyn Fn() + Send + Sync>;
pub type InstalledHandler = Arc<dyn Fn(InstalledEvent) + Send + Sync>;
pub type IconClickHandler = Arc<dyn Fn(TabId) + Send + Sync>;

/// Wraps the extension alarm API: `create(name, {periodInMinutes})`,
/// `clear(name)`, `onAlarm({name})`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait AlarmScheduler: MaybeSend {
    async fn create(&self, name: &str, period: Duration) -> Result<(), HostError>;
    async fn clear(&self, name: &str) -> Result<bool, HostError>;
    /// Registers the single process-wide alarm callback. A later call
    /// replaces the former — there is one alarm receiver, matching the
    /// host's single-receiver model.
    fn set_handler(&self, handler: AlarmHandler);
}

/// Wraps the extension runtime/action lifecycle events: `onInstalled`,
/// `onStartup`, `onSuspend`, `onSuspendCanceled`, `onClicked`.
pub trait HostEventBus: MaybeSend {
    fn on_installed(&self, handler: InstalledHandler);
    fn on_startup(&self, handler: VoidHandler);
    fn on_suspend(&self, handler: VoidHandler);
    fn on_suspend_canceled(&self, handler: VoidHandler);
    fn on_clicked(&self, handler: IconClickHandler);
    /// Remove every handler registered above. Called symmetrically on
    /// lifecycle-supervisor stop.
    fn clear_handlers(&self);
}

/// A navigation or tab-removed event, carrying at least
/// `{tabId, frameId, url, timeStamp}`.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationEvent {
    pub tab_id: TabId,
    pub frame_id: i64,
    pub url: String,
    pub timestamp_epoch_ms: u64,
    pub transition_type: Option<String>,
    pub transition_qualifiers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabRemovedEvent {
    pub tab_id: TabId,
    pub is_window_closing: bool,
}

pub type NavigationHandler = Arc<dyn Fn(NavigationEvent) + Send + Sync>;
pub type TabRemovedHandler = Arc<dyn Fn(TabRemovedEvent) + Send + Sync>;

/// Wraps the web-navigation events: `onBeforeNavigate`, `onCommitted`,
/// `onDOMContentLoaded`, `onCompleted`, `onErrorOccurred`,
/// `onHistoryStateUpdated`, plus the tab API's `onRemoved`.
pub trait NavigationEvents: MaybeSend {
    fn on_before_navigate(&self, handler: NavigationHandler);
    fn on_committed(&self, handler: NavigationHandler);
    fn on_dom_content_loaded(&self, handler: NavigationHandler);
    fn on_completed(&self, handler: NavigationHandler);
    fn on_error_occurred(&self, handler: NavigationHandler);
    fn on_history_state_updated(&self, handler: NavigationHandler);
    fn on_removed(&self, handler: TabRemovedHandler);
    fn clear_handlers(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteScriptParams {
    pub tab_id: TabId,
    pub all_frames: bool,
    pub world: InjectionWorld,
    pub files: Vec<String>,
}

/// Wraps `executeScript({target, files, world})`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ScriptInjector: MaybeSend {
    async fn execute_script(&self, params: ExecuteScriptParams) -> Result<(), HostError>;
}

/// Wraps the tab API: `create`, `update`, `query`, `onRemoved`, `sendMessage`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait TabApi: MaybeSend {
    async fn create(&self, url: &str, active: bool) -> Result<TabId, HostError>;
    async fn update_active(&self, tab_id: TabId, active: bool) -> Result<(), HostError>;
    async fn query_by_url(&self, url: &str) -> Result<Vec<TabId>, HostError>;
    async fn close(&self, tab_id: TabId) -> Result<(), HostError>;
    async fn is_open(&self, tab_id: TabId) -> Result<bool, HostError>;
}

/// Wraps `local.get/set/remove/clear`, with an optional `session.*`
/// mirror. One instance per storage area; `relay-state::cache` picks the
/// area per `Config::state.storage_type`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait KvStore: MaybeSend {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, HostError>;
    async fn get_all(&self) -> Result<HashMap<String, Value>, HostError>;
    async fn set(&self, items: HashMap<String, Value>) -> Result<(), HostError>;
    async fn remove(&self, keys: &[String]) -> Result<(), HostError>;
    async fn clear(&self) -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub quota_bytes: u64,
    pub usage_bytes: u64,
}

/// Wraps the storage-persistence request API.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PersistenceApi: MaybeSend {
    async fn persist(&self) -> Result<bool, HostError>;
    async fn persisted(&self) -> Result<bool, HostError>;
    async fn estimate(&self) -> Result<Option<StorageEstimate>, HostError>;
}

/// The channel to the page-side agent injected into a tracked tab. This
/// is the orchestrator's one point of contact with the out-of-scope
/// step-level DOM executor.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PageAgentChannel: MaybeSend {
    /// Send one recorded step's payload to the agent in `tab_id` and
    /// await its boolean success, bounded by `timeout`.
    async fn send_step(
        &self,
        tab_id: TabId,
        step_payload: Value,
        timeout: Duration,
    ) -> Result<bool, HostError>;

    /// Ping the agent in `tab_id` to confirm it is ready to receive
    /// steps after injection.
    async fn ping_ready(&self, tab_id: TabId, timeout: Duration) -> Result<bool, HostError>;
}
