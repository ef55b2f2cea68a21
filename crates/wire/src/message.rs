//! Wire formats: the action (request/response) protocol and the
//! broadcast protocol, multiplexed on the host's single receiver by
//! `relay-bus::action_bus` / `relay-bus::broadcast`.

use serde::{Deserialize, Serialize};

/// `{action, payload?}` — a request sent through the action protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self { action: action.into(), payload: None }
    }

    pub fn with_payload(action: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { action: action.into(), payload: Some(payload) }
    }
}

/// `{success, data?, error?, id?, tabId?}` — the action protocol's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "tabId")]
    pub tab_id: Option<i64>,
}

impl ActionResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self { success: true, data: Some(data), error: None, id: None, tab_id: None }
    }

    pub fn ok_empty() -> Self {
        Self { success: true, data: None, error: None, id: None, tab_id: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()), id: None, tab_id: None }
    }

    pub fn unknown_action(action: &str) -> Self {
        Self::failure(format!("Unknown action: {action}"))
    }

    pub fn invalid_message_format() -> Self {
        Self::failure("Invalid message format")
    }
}

/// `{type, data?}` — a one-to-many broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Broadcast {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self { event_type: event_type.into(), data: None }
    }

    pub fn with_data(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self { event_type: event_type.into(), data: Some(data) }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
