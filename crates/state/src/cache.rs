//! The write-through, debounced persistent state cache.
//!
//! Shaped like a typed in-memory map with typed accessors over it (see
//! [`crate::wellknown`]), but it's a plain write-through cache rather
//! than an event-sourced projection — there is no log to replay here,
//! only `restore()` from the host's key/value store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relay_core::{Clock, StateConfig, StorageType};
use relay_host::KvStore;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::error::StateError;

/// A type-erased `relay_host::KvStore` backend, explicitly `Send + Sync`
/// so it can be held behind an `Arc` and moved into the debounced flush
/// task spawned by [`PersistentStateCache::schedule_flush`].
pub type DynKvStore = dyn KvStore + Send + Sync;

/// `{key, oldValue, newValue, timestamp}` emitted on every `save`/`delete`.
/// `key` is the caller-facing (unprefixed) key.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub timestamp_epoch_ms: u64,
}

pub type ChangeListener = Arc<dyn Fn(StateChange) + Send + Sync>;

/// Pick the storage backend: local by default, session only when
/// requested *and* a session store is actually available.
pub fn select_backend(
    local: Arc<DynKvStore>,
    session: Option<Arc<DynKvStore>>,
    storage_type: StorageType,
) -> Arc<DynKvStore> {
    match (storage_type, session) {
        (StorageType::Session, Some(session)) => session,
        _ => local,
    }
}

struct Inner<C: Clock> {
    store: Arc<DynKvStore>,
    clock: C,
    prefix: String,
    save_debounce: Duration,
    auto_restore: bool,
    cache: Mutex<HashMap<String, Value>>,
    pending: Mutex<HashMap<String, Value>>,
    flush_handle: Mutex<Option<JoinHandle<()>>>,
    cache_initialized: AtomicBool,
    error_count: AtomicU64,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl<C: Clock> Inner<C> {
    async fn flush_pending(&self) -> Result<(), StateError> {
        let batch: HashMap<String, Value> = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *pending)
        };
        self.store.set(batch).await.map_err(|e| {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            tracing::error!(error = %e, "persistent state cache: backing-store write failed");
            StateError::from(e)
        })
    }
}

/// A cheaply cloneable handle onto one process revival's persisted state:
/// `save`/`load`/`delete`/`clear`/`restore`/`keys`/`flush_pending`, plus
/// change notifications.
#[derive(Clone)]
pub struct PersistentStateCache<C: Clock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> PersistentStateCache<C> {
    pub fn new(store: Arc<DynKvStore>, config: &StateConfig, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                clock,
                prefix: config.key_prefix.clone(),
                save_debounce: Duration::from_millis(config.save_debounce_ms),
                auto_restore: config.auto_restore,
                cache: Mutex::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                flush_handle: Mutex::new(None),
                cache_initialized: AtomicBool::new(false),
                error_count: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    fn full_key(&self, key: &str) -> String {
        if key.starts_with(self.inner.prefix.as_str()) {
            key.to_string()
        } else {
            format!("{}{}", self.inner.prefix, key)
        }
    }

    fn user_key<'a>(&self, full: &'a str) -> &'a str {
        full.strip_prefix(self.inner.prefix.as_str()).unwrap_or(full)
    }

    /// Register a listener invoked on every `save`/`delete` change event.
    /// Listeners run synchronously in registration order.
    pub fn on_change(&self, listener: ChangeListener) {
        self.inner.listeners.lock().push(listener);
    }

    fn emit_change(&self, key: &str, old_value: Option<Value>, new_value: Option<Value>) {
        let change = StateChange {
            key: key.to_string(),
            old_value,
            new_value,
            timestamp_epoch_ms: self.inner.clock.epoch_ms(),
        };
        for listener in self.inner.listeners.lock().iter() {
            listener(change.clone());
        }
    }

    /// Write `value` at `key`. Visible to a subsequent [`Self::load`] on
    /// this cache before the backing-store write resolves. With
    /// `save_debounce_ms == 0` the write is issued immediately; otherwise
    /// it is coalesced with any other pending write into a single
    /// debounced backing-store `set`.
    pub async fn save(&self, key: &str, value: Value) -> Result<(), StateError> {
        let full = self.full_key(key);
        let old_value = {
            let mut cache = self.inner.cache.lock();
            let old = cache.insert(full.clone(), value.clone());
            self.inner.pending.lock().insert(full.clone(), value.clone());
            old
        };
        self.emit_change(key, old_value, Some(value));

        if self.inner.save_debounce.is_zero() {
            self.inner.flush_pending().await
        } else {
            self.schedule_flush();
            Ok(())
        }
    }

    fn schedule_flush(&self) {
        let mut handle = self.inner.flush_handle.lock();
        if let Some(existing) = handle.take() {
            existing.abort();
        }
        let inner = self.inner.clone();
        let debounce = self.inner.save_debounce;
        *handle = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _ = inner.flush_pending().await;
        }));
    }

    /// Batch every pending write into one backing-store `set` and clear
    /// the pending map. Reentrant-safe: a second call with nothing
    /// pending is a no-op.
    pub async fn flush_pending(&self) -> Result<(), StateError> {
        self.inner.flush_pending().await
    }

    /// Read a value synchronously from the in-memory cache. Returns
    /// `None` if absent or if it fails to deserialize as `T`.
    pub fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.load_raw(key).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Read the raw JSON value at `key` from the in-memory cache.
    pub fn load_raw(&self, key: &str) -> Option<Value> {
        let full = self.full_key(key);
        self.inner.cache.lock().get(&full).cloned()
    }

    /// Remove `key` from the cache and the backing store.
    pub async fn delete(&self, key: &str) -> Result<(), StateError> {
        let full = self.full_key(key);
        let old_value = {
            let mut cache = self.inner.cache.lock();
            let old = cache.remove(&full);
            self.inner.pending.lock().remove(&full);
            old
        };
        self.inner
            .store
            .remove(std::slice::from_ref(&full))
            .await
            .map_err(|e| {
                self.inner.error_count.fetch_add(1, Ordering::Relaxed);
                StateError::from(e)
            })?;
        self.emit_change(key, old_value, None);
        Ok(())
    }

    /// Remove every key this cache owns (i.e. every key under its
    /// prefix) from both the cache and the backing store. Never touches
    /// keys outside the prefix, even if the backend's own `clear()`
    /// would.
    pub async fn clear(&self) -> Result<(), StateError> {
        let full_keys: Vec<String> = {
            let mut cache = self.inner.cache.lock();
            let keys: Vec<String> = cache.keys().cloned().collect();
            cache.clear();
            self.inner.pending.lock().clear();
            keys
        };
        if full_keys.is_empty() {
            return Ok(());
        }
        self.inner.store.remove(&full_keys).await.map_err(|e| {
            self.inner.error_count.fetch_add(1, Ordering::Relaxed);
            StateError::from(e)
        })
    }

    /// Load every prefixed entry from the backing store into the cache.
    /// A no-op if `state.autoRestore == false`.
    pub async fn restore(&self) -> Result<(), StateError> {
        if !self.inner.auto_restore {
            return Ok(());
        }
        let all = self.inner.store.get_all().await.map_err(|e| {
            self.inner.error_count.fetch_add(1, Ordering::Relaxed);
            StateError::from(e)
        })?;
        let mut cache = self.inner.cache.lock();
        cache.clear();
        for (k, v) in all {
            if k.starts_with(self.inner.prefix.as_str()) {
                cache.insert(k, v);
            }
        }
        self.inner.cache_initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_restored(&self) -> bool {
        self.inner.cache_initialized.load(Ordering::SeqCst)
    }

    /// User-facing (unprefixed) keys currently in the cache.
    pub fn keys(&self) -> Vec<String> {
        self.inner.cache.lock().keys().map(|k| self.user_key(k).to_string()).collect()
    }

    pub fn error_count(&self) -> u64 {
        self.inner.error_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
