//! Tracked-tab and navigation record types shared by the navigation
//! supervisor and the test orchestrator.

use serde::{Deserialize, Serialize};

/// A host tab identifier. Opaque beyond equality/ordering; the host
/// assigns these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub i64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Navigation/load status of a tracked tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabStatus {
    Navigating,
    Loading,
    Complete,
    Error,
}

/// A browser tab the coordinator is currently tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTab {
    pub tab_id: TabId,
    pub url: String,
    pub script_injected: bool,
    pub injection_pending: bool,
    pub status: TabStatus,
    pub last_injection_epoch_ms: Option<u64>,
}

impl TrackedTab {
    pub fn new(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            url: url.into(),
            script_injected: false,
            injection_pending: false,
            status: TabStatus::Navigating,
            last_injection_epoch_ms: None,
        }
    }
}
