//! Full-state snapshot persisted under the `persistedState` well-known
//! key, versioned the same way a local snapshot file would be, but
//! without `.bak` rotation — the backing store here is the injected
//! `KvStore`, not a local file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wellknown::{PersistedTrackedTab, RecordingState};

/// Snapshot migration is unsupported: an out-of-range version is
/// **rejected**, never migrated — `restore()` treats it as absent
/// (cold start) and logs a warning.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub version: u32,
    #[serde(rename = "openedTabId")]
    pub opened_tab_id: Option<i64>,
    #[serde(rename = "trackedTabs")]
    pub tracked_tabs: Vec<PersistedTrackedTab>,
    #[serde(rename = "activeProjectId")]
    pub active_project_id: Option<String>,
    #[serde(rename = "recordingState")]
    pub recording_state: Option<RecordingState>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

impl PersistedSnapshot {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            opened_tab_id: None,
            tracked_tabs: Vec::new(),
            active_project_id: None,
            recording_state: None,
            last_updated: now,
        }
    }

    /// `None` if `raw`'s version is `0` or greater than
    /// [`CURRENT_SNAPSHOT_VERSION`] — the caller should log a warning and
    /// treat this as a cold start rather than attempt to coerce it.
    pub fn accept(raw: PersistedSnapshot) -> Option<PersistedSnapshot> {
        if raw.version == 0 || raw.version > CURRENT_SNAPSHOT_VERSION {
            tracing::warn!(
                found = raw.version,
                current = CURRENT_SNAPSHOT_VERSION,
                "rejecting persisted snapshot with unsupported version, starting cold"
            );
            None
        } else {
            Some(raw)
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
