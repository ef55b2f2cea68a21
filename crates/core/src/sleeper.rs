//! Injectable delay primitive. Every cancellable wait in this workspace
//! (the retry sender's backoff delay, the orchestrator's sliced
//! inter-row/inter-step delays) goes through a [`Sleeper`] rather than
//! calling `tokio::time::sleep` directly, so tests can run instantly
//! instead of burning real wall-clock time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

#[async_trait]
pub trait Sleeper: Send + Sync + 'static {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps for real, backed by the tokio timer.
#[derive(Debug, Clone, Default)]
pub struct RealSleeper;

#[async_trait]
impl Sleeper for RealSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records every requested duration and returns immediately, so tests can
/// assert on the *schedule* (how long a delay was asked for) without
/// waiting for it.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    requested: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.requested.lock().push(duration);
    }
}

#[cfg(test)]
#[path = "sleeper_tests.rs"]
mod tests;
