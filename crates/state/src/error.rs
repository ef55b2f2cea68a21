use thiserror::Error;

/// Backing-store failure, plus the snapshot-version rejection kind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("backing store error: {0}")]
    Backend(String),

    #[error(
        "rejected snapshot version {found} (expected <= {current}); treating as cold start"
    )]
    UnsupportedSnapshotVersion { found: u32, current: u32 },
}

impl From<relay_host::HostError> for StateError {
    fn from(e: relay_host::HostError) -> Self {
        StateError::Backend(e.to_string())
    }
}
