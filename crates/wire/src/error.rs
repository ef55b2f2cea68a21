use thiserror::Error;

/// Transport failure and invalid-message kinds for the action protocol.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WireError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out waiting for response")]
    Timeout,

    #[error("no receiver registered for this channel")]
    NoReceiver,

    #[error("retries exhausted after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}
