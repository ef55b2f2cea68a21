#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-bus: the message bus (action/broadcast protocols), the
//! lifecycle and navigation supervisors, the keepalive alarm, and the
//! service coordinator that sequences all of the above.

pub mod action_bus;
pub mod broadcast;
pub mod component;
pub mod coordinator;
pub mod error;
pub mod keepalive;
pub mod lifecycle;
pub mod navigation;

pub use action_bus::{ActionBus, ActionHandler, DispatchOutcome, HandlerOutcome, Responder};
pub use broadcast::{BroadcastBus, BroadcastSubscriber, WILDCARD};
pub use component::Component;
pub use coordinator::{ComponentHealth, CoordinatorStatus, HealthSnapshot, ServiceCoordinator};
pub use error::BusError;
pub use keepalive::{Keepalive, KeepaliveHealth, ALARM_NAME, TICK_EVENT};
pub use lifecycle::{LifecycleStats, LifecycleSupervisor, PageOpener};
pub use navigation::{InjectionCallback, NavigationStats, NavigationSupervisor, TabRemovedCallback};
