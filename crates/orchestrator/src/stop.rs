//! Synchronous run/stop flags, checked at every natural loop boundary.
//! `stop()` flips both flags and aborts the cancellation token *before*
//! any `.await` — so `shouldStop()` is `true` the instant `stop()`
//! returns, with no further yield needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::StopRequestedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    UserRequested,
    MaxErrors,
    Completed,
    Error,
}

impl StopReason {
    fn as_str(&self) -> &'static str {
        match self {
            StopReason::UserRequested => "user_requested",
            StopReason::MaxErrors => "max_errors",
            StopReason::Completed => "completed",
            StopReason::Error => "error",
        }
    }
}

struct Inner {
    is_running: AtomicBool,
    stop_requested: AtomicBool,
    reason: Mutex<Option<(StopReason, String)>>,
    token: Mutex<CancellationToken>,
}

/// Two synchronous booleans plus a [`CancellationToken`] handle offered
/// to cancellable collaborator calls (e.g. a host channel send). The
/// booleans are the source of truth; the token is purely an integration
/// point — nothing about the synchronous semantics is hidden behind it.
#[derive(Clone)]
pub struct StopController {
    inner: Arc<Inner>,
}

impl StopController {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                is_running: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                reason: Mutex::new(None),
                token: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// Reset both flags and mint a fresh cancellation token for a new run.
    pub fn start(&self) {
        self.inner.is_running.store(true, Ordering::SeqCst);
        self.inner.stop_requested.store(false, Ordering::SeqCst);
        *self.inner.reason.lock() = None;
        *self.inner.token.lock() = CancellationToken::new();
    }

    /// Request a stop. Sets both flags and cancels the token before any
    /// `.await` — synchronous and immediate from the caller's point of
    /// view.
    pub fn stop(&self, reason: StopReason, message: impl Into<String>) {
        self.inner.stop_requested.store(true, Ordering::SeqCst);
        self.inner.is_running.store(false, Ordering::SeqCst);
        *self.inner.reason.lock() = Some((reason, message.into()));
        self.inner.token.lock().cancel();
    }

    pub fn should_continue(&self) -> bool {
        self.inner.is_running.load(Ordering::SeqCst) && !self.inner.stop_requested.load(Ordering::SeqCst)
    }

    pub fn should_stop(&self) -> bool {
        self.inner.stop_requested.load(Ordering::SeqCst) || !self.inner.is_running.load(Ordering::SeqCst)
    }

    pub fn stop_reason(&self) -> Option<(StopReason, String)> {
        self.inner.reason.lock().clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.lock().clone()
    }

    /// Raise [`StopRequestedError`] if a stop has been requested or the
    /// controller was never started. Call this at every loop boundary:
    /// between rows, between steps, and before every delay.
    pub fn checkpoint(&self) -> Result<(), StopRequestedError> {
        if self.should_stop() {
            let (reason, message) = self
                .stop_reason()
                .unwrap_or((StopReason::UserRequested, "stop requested".to_string()));
            Err(StopRequestedError { reason: reason.as_str().to_string(), message })
        } else {
            Ok(())
        }
    }
}

impl Default for StopController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "stop_tests.rs"]
mod tests;
