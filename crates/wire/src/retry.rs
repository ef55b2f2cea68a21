//! Sender-side retry helper for the action protocol: retries transport
//! failures under a jittered backoff policy up to a bounded attempt count.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use relay_core::{BackoffPolicy, Sleeper};

use crate::error::WireError;
use crate::message::{ActionRequest, ActionResponse};

/// The host channel a sender issues an [`ActionRequest`] over. A timeout,
/// a dropped connection, or "no receiver registered" are all transient —
/// the caller signals them by returning `Err`.
#[async_trait]
pub trait ActionTransport: Send + Sync {
    async fn send(&self, request: &ActionRequest) -> Result<ActionResponse, WireError>;
}

/// Wraps an [`ActionTransport`] with the retry law: on transient failure,
/// retry up to `policy.max_attempts - 1` more times, sleeping
/// `min(base * 2^attempt, max) + jitter` between attempts.
pub struct RetrySender<T: ActionTransport> {
    transport: T,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<T: ActionTransport> RetrySender<T> {
    pub fn new(transport: T, policy: BackoffPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { transport, policy, sleeper }
    }

    /// Send `request`, retrying transient failures per the configured
    /// policy. Returns the last error, wrapped as
    /// [`WireError::RetriesExhausted`], once attempts are exhausted.
    pub async fn send(&self, request: &ActionRequest) -> Result<ActionResponse, WireError> {
        let mut rng = rand::rng();
        let mut last_err = None;
        for attempt in 0..self.policy.max_attempts {
            match self.transport.send(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!(action = %request.action, attempt, error = %e, "send failed");
                    last_err = Some(e);
                    let is_last = attempt + 1 == self.policy.max_attempts;
                    if is_last {
                        break;
                    }
                    let delay_ms = self.policy.sample_delay_ms(attempt, &mut rng);
                    self.sleeper.sleep(std::time::Duration::from_millis(delay_ms)).await;
                }
            }
        }
        Err(WireError::RetriesExhausted {
            attempts: self.policy.max_attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
