use thiserror::Error;

/// Errors surfaced by a host surface adapter: storage failures, injection
/// failures, and transport failures all arrive this way from the host
/// side of the trait boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    #[error("host storage error: {0}")]
    Storage(String),

    #[error("script injection failed: {0}")]
    Injection(String),

    #[error("tab not found: {0}")]
    TabNotFound(i64),

    #[error("host channel error: {0}")]
    Channel(String),

    #[error("timed out waiting for the page agent")]
    Timeout,
}
