#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-wire: the action (request/response) and broadcast wire formats,
//! plus the sender-side retry helper built on top of them.

pub mod error;
pub mod message;
pub mod retry;

pub use error::WireError;
pub use message::{ActionRequest, ActionResponse, Broadcast};
pub use retry::{ActionTransport, RetrySender};
