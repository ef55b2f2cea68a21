//! The unit the service coordinator sequences: a named thing with an
//! ordered start/stop and an optional health/stats snapshot.

use async_trait::async_trait;
use relay_host::MaybeSend;
use serde_json::Value;

use crate::error::BusError;

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Component: MaybeSend {
    fn name(&self) -> &str;
    async fn start(&self) -> Result<(), BusError>;
    async fn stop(&self) -> Result<(), BusError>;
    fn stats(&self) -> Option<Value> {
        None
    }
}
