//! Periodic no-op driven by a host alarm, keeping the coordinator
//! process resident between external events.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::Clock;
use relay_host::traits::AlarmScheduler;
use relay_wire::Broadcast;
use serde_json::Value;
use tracing::debug;

use crate::broadcast::BroadcastBus;
use crate::component::Component;
use crate::error::BusError;

type DynAlarmScheduler = dyn AlarmScheduler + Send + Sync;

pub const ALARM_NAME: &str = "relay-keepalive";
pub const TICK_EVENT: &str = "keepalive_tick";

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct KeepaliveHealth {
    pub keepalive_active: bool,
    pub time_since_heartbeat_ms: u64,
    pub uptime_ms: u64,
    pub healthy: bool,
}

pub struct Keepalive<C: Clock> {
    scheduler: Arc<DynAlarmScheduler>,
    broadcast: BroadcastBus,
    clock: C,
    interval: Duration,
    last_heartbeat_epoch_ms: Arc<AtomicU64>,
    started_at_epoch_ms: AtomicU64,
    ticks: Arc<AtomicU64>,
    active: AtomicBool,
}

impl<C: Clock> Keepalive<C> {
    pub fn new(scheduler: Arc<DynAlarmScheduler>, broadcast: BroadcastBus, clock: C, interval_minutes: f64) -> Self {
        Self {
            scheduler,
            broadcast,
            clock,
            interval: Duration::from_secs_f64((interval_minutes * 60.0).max(0.0)),
            last_heartbeat_epoch_ms: Arc::new(AtomicU64::new(0)),
            started_at_epoch_ms: AtomicU64::new(0),
            ticks: Arc::new(AtomicU64::new(0)),
            active: AtomicBool::new(false),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// `healthy = (coordinator is ready) AND (time since last heartbeat
    /// < 2x the configured interval)`. `ready` is passed in by the
    /// service coordinator, which is the only thing that knows the
    /// process-wide status.
    pub fn health(&self, ready: bool) -> KeepaliveHealth {
        let now = self.clock.epoch_ms();
        let last = self.last_heartbeat_epoch_ms.load(Ordering::Relaxed);
        let since = if last == 0 { u64::MAX } else { now.saturating_sub(last) };
        let started = self.started_at_epoch_ms.load(Ordering::Relaxed);
        let uptime = if started == 0 { 0 } else { now.saturating_sub(started) };
        let threshold = (self.interval.as_millis() as u64).saturating_mul(2);
        KeepaliveHealth {
            keepalive_active: self.active.load(Ordering::Relaxed),
            time_since_heartbeat_ms: since,
            uptime_ms: uptime,
            healthy: ready && since < threshold,
        }
    }

    fn tick(last_heartbeat: &Arc<AtomicU64>, ticks: &Arc<AtomicU64>, clock: &C, broadcast: &BroadcastBus) {
        let now = clock.epoch_ms();
        last_heartbeat.store(now, Ordering::Relaxed);
        let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(tick = n, "keepalive: heartbeat");
        broadcast.publish(&Broadcast::with_data(TICK_EVENT, serde_json::json!({ "tick": n, "epoch_ms": now })));
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<C: Clock> Component for Keepalive<C> {
    fn name(&self) -> &str {
        "keepalive"
    }

    async fn start(&self) -> Result<(), BusError> {
        self.started_at_epoch_ms.store(self.clock.epoch_ms(), Ordering::Relaxed);
        let last_heartbeat = self.last_heartbeat_epoch_ms.clone();
        let ticks = self.ticks.clone();
        let clock = self.clock.clone();
        let broadcast = self.broadcast.clone();
        self.scheduler.set_handler(Arc::new(move |name: &str| {
            if name == ALARM_NAME {
                Self::tick(&last_heartbeat, &ticks, &clock, &broadcast);
            }
        }));
        self.scheduler.create(ALARM_NAME, self.interval).await.map_err(BusError::from)?;
        self.active.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BusError> {
        self.scheduler.clear(ALARM_NAME).await.map_err(BusError::from)?;
        self.active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn stats(&self) -> Option<Value> {
        serde_json::to_value(self.health(true)).ok()
    }
}

#[cfg(test)]
#[path = "keepalive_tests.rs"]
mod tests;
