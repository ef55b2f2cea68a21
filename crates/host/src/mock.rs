//! In-memory doubles for every `relay-host` trait, used by this
//! workspace's own tests and available to downstream crates for theirs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::TabId;
use serde_json::Value;

use crate::error::HostError;
use crate::traits::*;

/// Records every alarm `create`/`clear` call and lets a test fire the
/// registered handler manually (standing in for the host's real timer).
#[derive(Default)]
pub struct MockAlarmScheduler {
    alarms: Mutex<HashMap<String, Duration>>,
    handler: Mutex<Option<AlarmHandler>>,
}

impl MockAlarmScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the host firing `name`'s alarm.
    pub fn fire(&self, name: &str) {
        if let Some(handler) = self.handler.lock().clone() {
            handler(name);
        }
    }

    pub fn active_alarms(&self) -> HashMap<String, Duration> {
        self.alarms.lock().clone()
    }
}

#[async_trait]
impl AlarmScheduler for MockAlarmScheduler {
    async fn create(&self, name: &str, period: Duration) -> Result<(), HostError> {
        self.alarms.lock().insert(name.to_string(), period);
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<bool, HostError> {
        Ok(self.alarms.lock().remove(name).is_some())
    }

    fn set_handler(&self, handler: AlarmHandler) {
        *self.handler.lock() = Some(handler);
    }
}

/// A fake host event bus a test can drive by calling `fire_*`.
#[derive(Default)]
pub struct MockHostEventBus {
    installed: Mutex<Option<InstalledHandler>>,
    startup: Mutex<Option<VoidHandler>>,
    suspend: Mutex<Option<VoidHandler>>,
    suspend_canceled: Mutex<Option<VoidHandler>>,
    clicked: Mutex<Option<IconClickHandler>>,
}

impl MockHostEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire_installed(&self, event: InstalledEvent) {
        if let Some(h) = self.installed.lock().clone() {
            h(event);
        }
    }

    pub fn fire_startup(&self) {
        if let Some(h) = self.startup.lock().clone() {
            h();
        }
    }

    pub fn fire_suspend(&self) {
        if let Some(h) = self.suspend.lock().clone() {
            h();
        }
    }

    pub fn fire_suspend_canceled(&self) {
        if let Some(h) = self.suspend_canceled.lock().clone() {
            h();
        }
    }

    pub fn fire_clicked(&self, tab_id: TabId) {
        if let Some(h) = self.clicked.lock().clone() {
            h(tab_id);
        }
    }

    pub fn has_click_handler(&self) -> bool {
        self.clicked.lock().is_some()
    }
}

impl HostEventBus for MockHostEventBus {
    fn on_installed(&self, handler: InstalledHandler) {
        *self.installed.lock() = Some(handler);
    }

    fn on_startup(&self, handler: VoidHandler) {
        *self.startup.lock() = Some(handler);
    }

    fn on_suspend(&self, handler: VoidHandler) {
        *self.suspend.lock() = Some(handler);
    }

    fn on_suspend_canceled(&self, handler: VoidHandler) {
        *self.suspend_canceled.lock() = Some(handler);
    }

    fn on_clicked(&self, handler: IconClickHandler) {
        *self.clicked.lock() = Some(handler);
    }

    fn clear_handlers(&self) {
        *self.installed.lock() = None;
        *self.startup.lock() = None;
        *self.suspend.lock() = None;
        *self.suspend_canceled.lock() = None;
        *self.clicked.lock() = None;
    }
}

/// A fake navigation event source a test drives with `fire_*`.
#[derive(Default)]
pub struct MockNavigationEvents {
    before_navigate: Mutex<Option<NavigationHandler>>,
    committed: Mutex<Option<NavigationHandler>>,
    dom_content_loaded: Mutex<Option<NavigationHandler>>,
    completed: Mutex<Option<NavigationHandler>>,
    error_occurred: Mutex<Option<NavigationHandler>>,
    history_state_updated: Mutex<Option<NavigationHandler>>,
    removed: Mutex<Option<TabRemovedHandler>>,
}

impl MockNavigationEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire_committed(&self, event: NavigationEvent) {
        if let Some(h) = self.committed.lock().clone() {
            h(event);
        }
    }

    pub fn fire_completed(&self, event: NavigationEvent) {
        if let Some(h) = self.completed.lock().clone() {
            h(event);
        }
    }

    pub fn fire_history_state_updated(&self, event: NavigationEvent) {
        if let Some(h) = self.history_state_updated.lock().clone() {
            h(event);
        }
    }

    pub fn fire_removed(&self, event: TabRemovedEvent) {
        if let Some(h) = self.removed.lock().clone() {
            h(event);
        }
    }
}

impl NavigationEvents for MockNavigationEvents {
    fn on_before_navigate(&self, handler: NavigationHandler) {
        *self.before_navigate.lock() = Some(handler);
    }

    fn on_committed(&self, handler: NavigationHandler) {
        *self.committed.lock() = Some(handler);
    }

    fn on_dom_content_loaded(&self, handler: NavigationHandler) {
        *self.dom_content_loaded.lock() = Some(handler);
    }

    fn on_completed(&self, handler: NavigationHandler) {
        *self.completed.lock() = Some(handler);
    }

    fn on_error_occurred(&self, handler: NavigationHandler) {
        *self.error_occurred.lock() = Some(handler);
    }

    fn on_history_state_updated(&self, handler: NavigationHandler) {
        *self.history_state_updated.lock() = Some(handler);
    }

    fn on_removed(&self, handler: TabRemovedHandler) {
        *self.removed.lock() = Some(handler);
    }

    fn clear_handlers(&self) {
        *self.before_navigate.lock() = None;
        *self.committed.lock() = None;
        *self.dom_content_loaded.lock() = None;
        *self.completed.lock() = None;
        *self.error_occurred.lock() = None;
        *self.history_state_updated.lock() = None;
        *self.removed.lock() = None;
    }
}

/// Records every `executeScript` call; `fail_next` makes the next N calls
/// return an injection error.
#[derive(Default)]
pub struct MockScriptInjector {
    calls: Mutex<Vec<ExecuteScriptParams>>,
    fail_next: Mutex<usize>,
}

impl MockScriptInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ExecuteScriptParams> {
        self.calls.lock().clone()
    }

    pub fn fail_next_n(&self, n: usize) {
        *self.fail_next.lock() = n;
    }
}

#[async_trait]
impl ScriptInjector for MockScriptInjector {
    async fn execute_script(&self, params: ExecuteScriptParams) -> Result<(), HostError> {
        self.calls.lock().push(params);
        let mut remaining = self.fail_next.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(HostError::Injection("mock failure".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct TabRecord {
    url: String,
    open: bool,
}

/// In-memory tab table.
#[derive(Default)]
pub struct MockTabApi {
    tabs: Mutex<HashMap<i64, TabRecord>>,
    next_id: Mutex<i64>,
}

impl MockTabApi {
    pub fn new() -> Self {
        Self { tabs: Mutex::new(HashMap::new()), next_id: Mutex::new(1) }
    }

    /// Seed a tab as already open, as if the user had it open before the
    /// coordinator started (used to test `reuseTab`/`existingTabId`).
    pub fn seed_open_tab(&self, tab_id: TabId, url: &str) {
        self.tabs.lock().insert(tab_id.0, TabRecord { url: url.to_string(), open: true });
        let mut next = self.next_id.lock();
        if tab_id.0 >= *next {
            *next = tab_id.0 + 1;
        }
    }
}

#[async_trait]
impl TabApi for MockTabApi {
    async fn create(&self, url: &str, _active: bool) -> Result<TabId, HostError> {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        self.tabs.lock().insert(id, TabRecord { url: url.to_string(), open: true });
        Ok(TabId(id))
    }

    async fn update_active(&self, tab_id: TabId, _active: bool) -> Result<(), HostError> {
        if self.tabs.lock().contains_key(&tab_id.0) {
            Ok(())
        } else {
            Err(HostError::TabNotFound(tab_id.0))
        }
    }

    async fn query_by_url(&self, url: &str) -> Result<Vec<TabId>, HostError> {
        Ok(self
            .tabs
            .lock()
            .iter()
            .filter(|(_, t)| t.open && t.url == url)
            .map(|(id, _)| TabId(*id))
            .collect())
    }

    async fn close(&self, tab_id: TabId) -> Result<(), HostError> {
        match self.tabs.lock().get_mut(&tab_id.0) {
            Some(t) => {
                t.open = false;
                Ok(())
            }
            None => Err(HostError::TabNotFound(tab_id.0)),
        }
    }

    async fn is_open(&self, tab_id: TabId) -> Result<bool, HostError> {
        Ok(self.tabs.lock().get(&tab_id.0).map(|t| t.open).unwrap_or(false))
    }
}

/// In-memory `KvStore`, a stand-in for `chrome.storage.local`.
#[derive(Default)]
pub struct MockKvStore {
    items: Mutex<HashMap<String, Value>>,
    fail_next: Mutex<usize>,
}

impl MockKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_n(&self, n: usize) {
        *self.fail_next.lock() = n;
    }

    fn maybe_fail(&self) -> Result<(), HostError> {
        let mut remaining = self.fail_next.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(HostError::Storage("mock backing-store failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MockKvStore {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, HostError> {
        self.maybe_fail()?;
        let items = self.items.lock();
        Ok(keys.iter().filter_map(|k| items.get(k).map(|v| (k.clone(), v.clone()))).collect())
    }

    async fn get_all(&self) -> Result<HashMap<String, Value>, HostError> {
        self.maybe_fail()?;
        Ok(self.items.lock().clone())
    }

    async fn set(&self, items: HashMap<String, Value>) -> Result<(), HostError> {
        self.maybe_fail()?;
        self.items.lock().extend(items);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), HostError> {
        self.maybe_fail()?;
        let mut items = self.items.lock();
        for k in keys {
            items.remove(k);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), HostError> {
        self.maybe_fail()?;
        self.items.lock().clear();
        Ok(())
    }
}

/// Always grants persistence unless told not to.
pub struct MockPersistenceApi {
    pub grant: bool,
}

impl Default for MockPersistenceApi {
    fn default() -> Self {
        Self { grant: true }
    }
}

#[async_trait]
impl PersistenceApi for MockPersistenceApi {
    async fn persist(&self) -> Result<bool, HostError> {
        Ok(self.grant)
    }

    async fn persisted(&self) -> Result<bool, HostError> {
        Ok(self.grant)
    }

    async fn estimate(&self) -> Result<Option<StorageEstimate>, HostError> {
        Ok(Some(StorageEstimate { quota_bytes: 1 << 30, usage_bytes: 0 }))
    }
}

/// A scripted page agent: returns `true`/`false` per step in the order
/// steps are enqueued, or a host error if the script runs dry.
#[derive(Default)]
pub struct MockPageAgentChannel {
    ready: Mutex<bool>,
    script: Mutex<Vec<bool>>,
    sent: Mutex<Vec<(TabId, Value)>>,
}

impl MockPageAgentChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        *self.ready.lock() = ready;
    }

    pub fn script_outcomes(&self, outcomes: Vec<bool>) {
        *self.script.lock() = outcomes;
    }

    pub fn sent(&self) -> Vec<(TabId, Value)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PageAgentChannel for MockPageAgentChannel {
    async fn send_step(
        &self,
        tab_id: TabId,
        step_payload: Value,
        _timeout: Duration,
    ) -> Result<bool, HostError> {
        self.sent.lock().push((tab_id, step_payload));
        let mut script = self.script.lock();
        if script.is_empty() {
            Ok(true)
        } else {
            Ok(script.remove(0))
        }
    }

    async fn ping_ready(&self, _tab_id: TabId, _timeout: Duration) -> Result<bool, HostError> {
        Ok(*self.ready.lock())
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
