//! Cooperative pause: a gate entered at step boundaries. `pause()` never
//! interrupts in-flight work — it only affects the next `wait_if_paused()`
//! call, which is placed at the same boundaries [`crate::stop::StopController::checkpoint`]
//! is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct PauseController {
    paused: Arc<AtomicBool>,
    reason: Arc<Mutex<Option<String>>>,
    notify: Arc<Notify>,
}

impl PauseController {
    pub fn new() -> Self {
        Self {
            paused: Arc::new(AtomicBool::new(false)),
            reason: Arc::new(Mutex::new(None)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn pause(&self, reason: impl Into<String>) {
        *self.reason.lock() = Some(reason.into());
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Clear the pause flag and release every current waiter in one shot.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        *self.reason.lock() = None;
        self.notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Returns immediately if not paused. Otherwise awaits `resume()`.
    /// Registers interest in the notification *before* re-checking the
    /// flag, so a `resume()` racing with this call can never be missed.
    pub async fn wait_if_paused(&self) {
        loop {
            if !self.is_paused() {
                return;
            }
            let notified = self.notify.notified();
            if !self.is_paused() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for PauseController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "pause_tests.rs"]
mod tests;
