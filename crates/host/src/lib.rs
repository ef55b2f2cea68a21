#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-host: the adapter traits over the browser-extension host
//! surfaces, an in-memory double of each for tests, and (`chrome`
//! feature, `wasm32` only) real `chrome.*` bindings.

pub mod error;
pub mod traits;

#[cfg(not(target_arch = "wasm32"))]
pub mod mock;

#[cfg(all(target_arch = "wasm32", feature = "chrome"))]
pub mod chrome;

pub use error::HostError;
pub use traits::{
    AlarmHandler, AlarmScheduler, ExecuteScriptParams, HostEventBus, IconClickHandler,
    InstallReason, InstalledEvent, InstalledHandler, KvStore, MaybeSend, NavigationEvent,
    NavigationEvents, NavigationHandler, PageAgentChannel, PersistenceApi, ScriptInjector,
    StorageEstimate, TabApi, TabRemovedEvent, TabRemovedHandler, VoidHandler,
};

#[cfg(not(target_arch = "wasm32"))]
pub use mock::{
    MockAlarmScheduler, MockHostEventBus, MockKvStore, MockNavigationEvents, MockPageAgentChannel,
    MockPersistenceApi, MockScriptInjector, MockTabApi,
};

#[cfg(all(target_arch = "wasm32", feature = "chrome"))]
pub use chrome::{
    ChromeAlarmScheduler, ChromeHostEventBus, ChromeKvStore, ChromePageAgentChannel,
    ChromePersistenceApi, ChromeScriptInjector, ChromeTabApi,
};
