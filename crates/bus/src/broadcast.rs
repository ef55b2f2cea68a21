//! One-to-many event delivery: every subscriber of a `type`, plus every
//! `'*'` subscriber, is invoked in registration order. A subscriber that
//! fails never blocks the ones after it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use relay_wire::Broadcast;
use tracing::error;

pub const WILDCARD: &str = "*";

pub type BroadcastSubscriber = Arc<dyn Fn(&Broadcast) -> Result<(), String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct BroadcastBus {
    subscribers: Arc<Mutex<HashMap<String, Vec<BroadcastSubscriber>>>>,
}

impl BroadcastBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one `event_type`, or [`WILDCARD`] to receive every
    /// broadcast regardless of type.
    pub fn subscribe(&self, event_type: impl Into<String>, subscriber: BroadcastSubscriber) {
        self.subscribers.lock().entry(event_type.into()).or_default().push(subscriber);
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscribers.lock().get(event_type).map(Vec::len).unwrap_or(0)
    }

    /// Deliver `broadcast` to its type's subscribers, then the wildcard
    /// subscribers, both in registration order.
    pub fn publish(&self, broadcast: &Broadcast) {
        let (typed, wildcard) = {
            let subscribers = self.subscribers.lock();
            (
                subscribers.get(&broadcast.event_type).cloned().unwrap_or_default(),
                subscribers.get(WILDCARD).cloned().unwrap_or_default(),
            )
        };
        for subscriber in typed.iter().chain(wildcard.iter()) {
            if let Err(error) = subscriber(broadcast) {
                error!(event_type = %broadcast.event_type, %error, "broadcast bus: subscriber failed");
            }
        }
    }

    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
