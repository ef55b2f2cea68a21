use thiserror::Error;

/// Errors surfaced by the message bus and its supervised components that
/// aren't already caught and converted into an [`relay_wire::ActionResponse`]
/// failure. Handler failures are deliberately *not* a variant here — the bus
/// catches and converts them, it never propagates them as a `BusError`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BusError {
    #[error("lifecycle transition violation: {0}")]
    LifecycleViolation(String),

    #[error("component '{0}' failed to start: {1}")]
    ComponentStartFailed(String, String),

    #[error("component '{0}' failed to stop: {1}")]
    ComponentStopFailed(String, String),

    #[error("state error: {0}")]
    State(#[from] relay_state::StateError),

    #[error("host error: {0}")]
    Host(#[from] relay_host::HostError),
}
