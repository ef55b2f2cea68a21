//! Typed accessors over [`crate::cache::PersistentStateCache`] for the
//! well-known keys in the persisted state layout.

use chrono::{DateTime, Utc};
use relay_core::{Clock, ProjectId, TabId};
use serde::{Deserialize, Serialize};

use crate::cache::PersistentStateCache;
use crate::error::StateError;
use crate::snapshot::PersistedSnapshot;

const KEY_OPENED_TAB_ID: &str = "openedTabId";
const KEY_TRACKED_TABS: &str = "trackedTabs";
const KEY_ACTIVE_PROJECT: &str = "activeProject";
const KEY_RECORDING_STATE: &str = "recordingState";
const KEY_PERSISTED_STATE: &str = "persistedState";
const KEY_LAST_UPDATED: &str = "lastUpdated";

/// The persisted `trackedTabs` row shape: `{tabId, projectId?, url,
/// injected, trackedAt}`. Distinct from `relay_core::TrackedTab`, which
/// is the navigation supervisor's richer *runtime* record — this is the
/// flat shape actually persisted to the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTrackedTab {
    #[serde(rename = "tabId")]
    pub tab_id: i64,
    #[serde(rename = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub url: String,
    pub injected: bool,
    #[serde(rename = "trackedAt")]
    pub tracked_at: DateTime<Utc>,
}

/// The persisted `recordingState` row shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingState {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "tabId")]
    pub tab_id: i64,
    #[serde(rename = "isRecording")]
    pub is_recording: bool,
    #[serde(rename = "stepCount")]
    pub step_count: u32,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

impl<C: Clock> PersistentStateCache<C> {
    pub async fn set_opened_tab_id(&self, tab_id: Option<TabId>) -> Result<(), StateError> {
        self.save(KEY_OPENED_TAB_ID, serde_json::json!(tab_id.map(|t| t.0))).await
    }

    pub fn opened_tab_id(&self) -> Option<TabId> {
        self.load::<Option<i64>>(KEY_OPENED_TAB_ID).flatten().map(TabId)
    }

    pub async fn set_tracked_tabs(&self, tabs: &[PersistedTrackedTab]) -> Result<(), StateError> {
        self.save(KEY_TRACKED_TABS, serde_json::to_value(tabs).unwrap_or_default()).await
    }

    pub fn tracked_tabs(&self) -> Vec<PersistedTrackedTab> {
        self.load(KEY_TRACKED_TABS).unwrap_or_default()
    }

    pub async fn set_active_project_id(&self, project_id: Option<ProjectId>) -> Result<(), StateError> {
        self.save(KEY_ACTIVE_PROJECT, serde_json::json!(project_id.map(|p| p.0))).await
    }

    pub fn active_project_id(&self) -> Option<ProjectId> {
        self.load::<Option<String>>(KEY_ACTIVE_PROJECT).flatten().map(ProjectId::from_string)
    }

    pub async fn set_recording_state(&self, state: Option<&RecordingState>) -> Result<(), StateError> {
        match state {
            Some(state) => self.save(KEY_RECORDING_STATE, serde_json::to_value(state).unwrap_or_default()).await,
            None => self.delete(KEY_RECORDING_STATE).await,
        }
    }

    pub fn recording_state(&self) -> Option<RecordingState> {
        self.load(KEY_RECORDING_STATE)
    }

    pub async fn set_last_updated(&self, when: DateTime<Utc>) -> Result<(), StateError> {
        self.save(KEY_LAST_UPDATED, serde_json::json!(when)).await
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.load(KEY_LAST_UPDATED)
    }

    /// Build the full snapshot from the current cache contents and
    /// persist it under `persistedState`.
    pub async fn save_snapshot(&self, now: DateTime<Utc>) -> Result<(), StateError> {
        let snapshot = PersistedSnapshot {
            version: PersistedSnapshot::new(now).version,
            opened_tab_id: self.opened_tab_id().map(|t| t.0),
            tracked_tabs: self.tracked_tabs(),
            active_project_id: self.active_project_id().map(|p| p.0),
            recording_state: self.recording_state(),
            last_updated: now,
        };
        self.save(KEY_PERSISTED_STATE, serde_json::to_value(&snapshot).unwrap_or_default()).await?;
        self.set_last_updated(now).await
    }

    /// Read and validate the persisted snapshot, rejecting (and
    /// returning `None` for) an out-of-range version per
    /// [`PersistedSnapshot::accept`].
    pub fn load_snapshot(&self) -> Option<PersistedSnapshot> {
        let raw: PersistedSnapshot = self.load(KEY_PERSISTED_STATE)?;
        PersistedSnapshot::accept(raw)
    }

    /// Restore cache fields from an already-accepted snapshot, as the
    /// service coordinator does on `start()`.
    pub async fn apply_snapshot(&self, snapshot: &PersistedSnapshot) -> Result<(), StateError> {
        self.set_opened_tab_id(snapshot.opened_tab_id.map(TabId)).await?;
        self.set_tracked_tabs(&snapshot.tracked_tabs).await?;
        self.set_active_project_id(snapshot.active_project_id.clone().map(ProjectId::from_string)).await?;
        self.set_recording_state(snapshot.recording_state.as_ref()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wellknown_tests.rs"]
mod tests;
