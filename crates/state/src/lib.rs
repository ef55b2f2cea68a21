#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-state: the persistent, prefix-scoped, debounced key/value cache,
//! its snapshot schema, and typed accessors for the well-known keys the
//! coordinator and orchestrator both read/write.

pub mod cache;
pub mod error;
pub mod snapshot;
pub mod wellknown;

pub use cache::{select_backend, ChangeListener, DynKvStore, PersistentStateCache, StateChange};
pub use error::StateError;
pub use snapshot::{PersistedSnapshot, CURRENT_SNAPSHOT_VERSION};
pub use wellknown::{PersistedTrackedTab, RecordingState};
