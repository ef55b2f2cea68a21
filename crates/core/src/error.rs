use thiserror::Error;

/// Errors raised validating or constructing a [`crate::config::Config`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("keepalive.intervalMinutes must be > 0, got {0}")]
    InvalidKeepaliveInterval(String),

    #[error("retry.base must be > 0, got {0}ms")]
    InvalidRetryBase(u64),

    #[error("retry.max ({max}ms) must be >= retry.base ({base}ms)")]
    InvalidRetryMax { base: u64, max: u64 },

    #[error("retry.maxAttempts must be >= 1, got {0}")]
    InvalidRetryAttempts(u32),

    #[error("retry.jitter must be within [0, 1], got {0}")]
    InvalidJitter(String),

    #[error("injection.navigationDelay must be > 0, got {0}ms")]
    InvalidNavigationDelay(u64),
}
