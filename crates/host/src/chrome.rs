//! Real bindings onto the `chrome.*` extension APIs, compiled only when
//! targeting `wasm32` with the `chrome` feature enabled. Everything here
//! is a thin `wasm-bindgen` wrapper that turns a JS callback-or-promise
//! API into the traits in [`crate::traits`].

#![cfg(all(target_arch = "wasm32", feature = "chrome"))]

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect};
use relay_core::TabId;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::error::HostError;
use crate::traits::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = chrome, js_name = alarms)]
    static ALARMS: JsValue;

    #[wasm_bindgen(js_namespace = chrome, js_name = runtime)]
    static RUNTIME: JsValue;

    #[wasm_bindgen(js_namespace = chrome, js_name = webNavigation)]
    static WEB_NAVIGATION: JsValue;

    #[wasm_bindgen(js_namespace = chrome, js_name = tabs)]
    static TABS: JsValue;

    #[wasm_bindgen(js_namespace = chrome, js_name = scripting)]
    static SCRIPTING: JsValue;

    #[wasm_bindgen(js_namespace = chrome, js_name = storage)]
    static STORAGE: JsValue;

    #[wasm_bindgen(js_namespace = navigator, js_name = storage)]
    static NAVIGATOR_STORAGE: JsValue;

    #[wasm_bindgen(js_namespace = chrome, js_name = action)]
    static ACTION: JsValue;
}

fn get_fn(obj: &JsValue, name: &str) -> Result<Function, HostError> {
    Reflect::get(obj, &JsValue::from_str(name))
        .ok()
        .and_then(|v| v.dyn_into::<Function>().ok())
        .ok_or_else(|| HostError::Channel(format!("chrome API missing: {name}")))
}

async fn call_promise(obj: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, HostError> {
    let f = get_fn(obj, method)?;
    let arr = Array::new();
    for a in args {
        arr.push(a);
    }
    let result = f
        .apply(obj, &arr)
        .map_err(|e| HostError::Channel(format!("{method} threw: {e:?}")))?;
    let promise: Promise = result
        .dyn_into()
        .map_err(|_| HostError::Channel(format!("{method} did not return a promise")))?;
    JsFuture::from(promise)
        .await
        .map_err(|e| HostError::Channel(format!("{method} rejected: {e:?}")))
}

/// `chrome.alarms` adapter.
pub struct ChromeAlarmScheduler;

#[async_trait(?Send)]
impl AlarmScheduler for ChromeAlarmScheduler {
    async fn create(&self, name: &str, period: Duration) -> Result<(), HostError> {
        let opts = Object::new();
        let minutes = period.as_secs_f64() / 60.0;
        Reflect::set(&opts, &"periodInMinutes".into(), &minutes.into())
            .map_err(|_| HostError::Channel("failed to build alarm options".to_string()))?;
        call_promise(&ALARMS, "create", &[name.into(), opts.into()]).await?;
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<bool, HostError> {
        let result = call_promise(&ALARMS, "clear", &[name.into()]).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    fn set_handler(&self, handler: AlarmHandler) {
        let closure = Closure::<dyn Fn(JsValue)>::new(move |alarm: JsValue| {
            if let Ok(name) = Reflect::get(&alarm, &"name".into()) {
                if let Some(name) = name.as_string() {
                    handler(&name);
                }
            }
        });
        if let Ok(on_alarm) = Reflect::get(&ALARMS, &"onAlarm".into()) {
            if let Ok(add_listener) = get_fn(&on_alarm, "addListener") {
                let _ = add_listener.call1(&on_alarm, closure.as_ref().unchecked_ref());
            }
        }
        closure.forget();
    }
}

/// `chrome.runtime` lifecycle events plus `chrome.action.onClicked`.
pub struct ChromeHostEventBus;

impl HostEventBus for ChromeHostEventBus {
    fn on_installed(&self, handler: InstalledHandler) {
        let closure = Closure::<dyn Fn(JsValue)>::new(move |details: JsValue| {
            let reason_str = Reflect::get(&details, &"reason".into())
                .ok()
                .and_then(|v| v.as_string())
                .unwrap_or_default();
            let reason = match reason_str.as_str() {
                "update" => InstallReason::Update,
                "chrome_update" => InstallReason::ChromeUpdate,
                "shared_module_update" => InstallReason::SharedModuleUpdate,
                _ => InstallReason::Install,
            };
            let previous_version = Reflect::get(&details, &"previousVersion".into())
                .ok()
                .and_then(|v| v.as_string());
            handler(InstalledEvent { reason, previous_version });
        });
        register(&RUNTIME, "onInstalled", &closure);
        closure.forget();
    }

    fn on_startup(&self, handler: VoidHandler) {
        let closure = Closure::<dyn Fn()>::new(move || handler());
        register(&RUNTIME, "onStartup", &closure);
        closure.forget();
    }

    fn on_suspend(&self, handler: VoidHandler) {
        let closure = Closure::<dyn Fn()>::new(move || handler());
        register(&RUNTIME, "onSuspend", &closure);
        closure.forget();
    }

    fn on_suspend_canceled(&self, handler: VoidHandler) {
        let closure = Closure::<dyn Fn()>::new(move || handler());
        register(&RUNTIME, "onSuspendCanceled", &closure);
        closure.forget();
    }

    fn on_clicked(&self, handler: IconClickHandler) {
        let closure = Closure::<dyn Fn(JsValue)>::new(move |tab: JsValue| {
            if let Some(id) = Reflect::get(&tab, &"id".into()).ok().and_then(|v| v.as_f64()) {
                handler(TabId(id as i64));
            }
        });
        register(&ACTION, "onClicked", &closure);
        closure.forget();
    }

    fn clear_handlers(&self) {
        // chrome.* offers no bulk removeAllListeners; handlers are
        // replaced, not accumulated, by re-registering per `set_handler`
        // semantics above.
    }
}

fn register(namespace: &JsValue, event_name: &str, closure: &Closure<dyn Fn(JsValue)>) {
    if let Ok(event) = Reflect::get(namespace, &event_name.into()) {
        if let Ok(add_listener) = get_fn(&event, "addListener") {
            let _ = add_listener.call1(&event, closure.as_ref().unchecked_ref());
        }
    }
}

/// `chrome.scripting.executeScript`.
pub struct ChromeScriptInjector;

#[async_trait(?Send)]
impl ScriptInjector for ChromeScriptInjector {
    async fn execute_script(&self, params: ExecuteScriptParams) -> Result<(), HostError> {
        let injection = Object::new();
        let target = Object::new();
        Reflect::set(&target, &"tabId".into(), &(params.tab_id.0 as f64).into())
            .map_err(|_| HostError::Injection("failed to build target".to_string()))?;
        Reflect::set(&target, &"allFrames".into(), &params.all_frames.into())
            .map_err(|_| HostError::Injection("failed to build target".to_string()))?;
        Reflect::set(&injection, &"target".into(), &target)
            .map_err(|_| HostError::Injection("failed to build injection".to_string()))?;

        let files = Array::new();
        for f in &params.files {
            files.push(&JsValue::from_str(f));
        }
        Reflect::set(&injection, &"files".into(), &files)
            .map_err(|_| HostError::Injection("failed to build injection".to_string()))?;

        let world = match params.world {
            relay_core::InjectionWorld::Main => "MAIN",
            relay_core::InjectionWorld::Isolated => "ISOLATED",
        };
        Reflect::set(&injection, &"world".into(), &JsValue::from_str(world))
            .map_err(|_| HostError::Injection("failed to build injection".to_string()))?;

        call_promise(&SCRIPTING, "executeScript", &[injection.into()])
            .await
            .map_err(|e| HostError::Injection(e.to_string()))?;
        Ok(())
    }
}

/// `chrome.tabs`.
pub struct ChromeTabApi;

#[async_trait(?Send)]
impl TabApi for ChromeTabApi {
    async fn create(&self, url: &str, active: bool) -> Result<TabId, HostError> {
        let opts = Object::new();
        Reflect::set(&opts, &"url".into(), &url.into()).ok();
        Reflect::set(&opts, &"active".into(), &active.into()).ok();
        let tab = call_promise(&TABS, "create", &[opts.into()]).await?;
        let id = Reflect::get(&tab, &"id".into())
            .ok()
            .and_then(|v| v.as_f64())
            .ok_or_else(|| HostError::Channel("created tab has no id".to_string()))?;
        Ok(TabId(id as i64))
    }

    async fn update_active(&self, tab_id: TabId, active: bool) -> Result<(), HostError> {
        let opts = Object::new();
        Reflect::set(&opts, &"active".into(), &active.into()).ok();
        call_promise(&TABS, "update", &[(tab_id.0 as f64).into(), opts.into()])
            .await
            .map_err(|_| HostError::TabNotFound(tab_id.0))?;
        Ok(())
    }

    async fn query_by_url(&self, url: &str) -> Result<Vec<TabId>, HostError> {
        let opts = Object::new();
        Reflect::set(&opts, &"url".into(), &url.into()).ok();
        let result = call_promise(&TABS, "query", &[opts.into()]).await?;
        let arr: Array = result.dyn_into().map_err(|_| HostError::Channel("query did not return an array".to_string()))?;
        Ok(arr
            .iter()
            .filter_map(|tab| Reflect::get(&tab, &"id".into()).ok().and_then(|v| v.as_f64()))
            .map(|id| TabId(id as i64))
            .collect())
    }

    async fn close(&self, tab_id: TabId) -> Result<(), HostError> {
        call_promise(&TABS, "remove", &[(tab_id.0 as f64).into()])
            .await
            .map_err(|_| HostError::TabNotFound(tab_id.0))?;
        Ok(())
    }

    async fn is_open(&self, tab_id: TabId) -> Result<bool, HostError> {
        match call_promise(&TABS, "get", &[(tab_id.0 as f64).into()]).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// `chrome.storage.local` (or `.session`, chosen by whoever constructs
/// this — `relay-state::cache` holds the area selection).
pub struct ChromeKvStore {
    area: JsValue,
}

impl ChromeKvStore {
    pub fn local() -> Self {
        let area = Reflect::get(&STORAGE, &"local".into()).unwrap_or(JsValue::UNDEFINED);
        Self { area }
    }

    pub fn session() -> Self {
        let area = Reflect::get(&STORAGE, &"session".into()).unwrap_or(JsValue::UNDEFINED);
        Self { area }
    }
}

fn value_to_js(value: &Value) -> JsValue {
    js_sys::JSON::parse(&value.to_string()).unwrap_or(JsValue::NULL)
}

fn js_to_value(js: &JsValue) -> Value {
    js_sys::JSON::stringify(js)
        .ok()
        .and_then(|s| s.as_string())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null)
}

#[async_trait(?Send)]
impl KvStore for ChromeKvStore {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, HostError> {
        let arr = Array::new();
        for k in keys {
            arr.push(&JsValue::from_str(k));
        }
        let result = call_promise(&self.area, "get", &[arr.into()])
            .map_err(|e| HostError::Storage(e.to_string()))
            .await?;
        Ok(object_to_map(&result))
    }

    async fn get_all(&self) -> Result<HashMap<String, Value>, HostError> {
        let result = call_promise(&self.area, "get", &[])
            .map_err(|e| HostError::Storage(e.to_string()))
            .await?;
        Ok(object_to_map(&result))
    }

    async fn set(&self, items: HashMap<String, Value>) -> Result<(), HostError> {
        let obj = Object::new();
        for (k, v) in &items {
            Reflect::set(&obj, &JsValue::from_str(k), &value_to_js(v))
                .map_err(|_| HostError::Storage(format!("failed to set key {k}")))?;
        }
        call_promise(&self.area, "set", &[obj.into()])
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), HostError> {
        let arr = Array::new();
        for k in keys {
            arr.push(&JsValue::from_str(k));
        }
        call_promise(&self.area, "remove", &[arr.into()])
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), HostError> {
        call_promise(&self.area, "clear", &[])
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;
        Ok(())
    }
}

fn object_to_map(js: &JsValue) -> HashMap<String, Value> {
    let value = js_to_value(js);
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => HashMap::new(),
    }
}

/// `navigator.storage` persistence API.
pub struct ChromePersistenceApi;

#[async_trait(?Send)]
impl PersistenceApi for ChromePersistenceApi {
    async fn persist(&self) -> Result<bool, HostError> {
        let result = call_promise(&NAVIGATOR_STORAGE, "persist", &[])
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn persisted(&self) -> Result<bool, HostError> {
        let result = call_promise(&NAVIGATOR_STORAGE, "persisted", &[])
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn estimate(&self) -> Result<Option<StorageEstimate>, HostError> {
        let result = call_promise(&NAVIGATOR_STORAGE, "estimate", &[])
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;
        let quota = Reflect::get(&result, &"quota".into()).ok().and_then(|v| v.as_f64());
        let usage = Reflect::get(&result, &"usage".into()).ok().and_then(|v| v.as_f64());
        Ok(match (quota, usage) {
            (Some(q), Some(u)) => Some(StorageEstimate { quota_bytes: q as u64, usage_bytes: u as u64 }),
            _ => None,
        })
    }
}

/// `chrome.tabs.sendMessage` to the content-script page agent. The host
/// has no native per-call timeout, so a rejected/unanswered message
/// surfaces as a `Channel` error rather than `HostError::Timeout`; the
/// caller's own `Duration` budget is not independently enforced here.
pub struct ChromePageAgentChannel;

#[async_trait(?Send)]
impl PageAgentChannel for ChromePageAgentChannel {
    async fn send_step(
        &self,
        tab_id: TabId,
        step_payload: Value,
        _timeout: Duration,
    ) -> Result<bool, HostError> {
        let message = value_to_js(&step_payload);
        let result = call_promise(&TABS, "sendMessage", &[(tab_id.0 as f64).into(), message])
            .await
            .map_err(|e| HostError::Channel(e.to_string()))?;
        Ok(Reflect::get(&result, &"ok".into())
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn ping_ready(&self, tab_id: TabId, _timeout: Duration) -> Result<bool, HostError> {
        let message = Object::new();
        Reflect::set(&message, &"type".into(), &"ping".into()).ok();
        match call_promise(&TABS, "sendMessage", &[(tab_id.0 as f64).into(), message.into()]).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}
