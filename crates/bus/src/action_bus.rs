//! Single-receiver action dispatch: one registration table keyed by
//! action name, multiplexed on whatever channel the host hands the
//! coordinator its messages through.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use relay_wire::{ActionRequest, ActionResponse};
use serde_json::Value;
use tracing::warn;

/// A boxed, owned future resolving to the eventual response — the
/// "handler returned a promise" branch of the dispatch contract.
pub type PendingResponse = Pin<Box<dyn Future<Output = Result<ActionResponse, String>> + Send>>;

/// A callback a handler can stash and invoke later, out of band, when it
/// answers `AsyncHandled` — the "I will call sendResponse asynchronously"
/// branch.
pub type Responder = Arc<dyn Fn(ActionResponse) + Send + Sync>;

/// What a handler hands back to the bus for one request.
pub enum HandlerOutcome {
    /// The handler already has the answer.
    Sync(ActionResponse),
    /// The handler will invoke the [`Responder`] it was given, later, on
    /// its own schedule. The bus does not wait for it.
    AsyncHandled,
    /// The handler's answer is a future the bus should await.
    Pending(PendingResponse),
}

pub type ActionHandler = Arc<dyn Fn(Option<Value>, Responder) -> HandlerOutcome + Send + Sync>;

/// The bus's two possible outcomes for one dispatched request: either it
/// has a response in hand now, or the handler took the async branch and
/// will deliver one later through the [`Responder`] it was given.
pub enum DispatchOutcome {
    Response(ActionResponse),
    Deferred,
}

/// Request/response dispatch by action name. Registration is
/// last-writer-wins within one action name; a second registration for
/// the same action replaces the first and logs a warning.
#[derive(Clone, Default)]
pub struct ActionBus {
    handlers: Arc<Mutex<HashMap<String, ActionHandler>>>,
}

impl ActionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, action: impl Into<String>, handler: ActionHandler) {
        let action = action.into();
        let mut handlers = self.handlers.lock();
        if handlers.contains_key(&action) {
            warn!(action = %action, "action bus: replacing an existing handler registration");
        }
        handlers.insert(action, handler);
    }

    pub fn unregister(&self, action: &str) {
        self.handlers.lock().remove(action);
    }

    pub fn is_registered(&self, action: &str) -> bool {
        self.handlers.lock().contains_key(action)
    }

    /// Dispatch one request. `respond` is handed to the matched handler
    /// for the [`HandlerOutcome::AsyncHandled`] branch; it is ignored for
    /// the other two branches. A handler's rejected future is caught and
    /// converted to a failure response — it never propagates out of
    /// `dispatch`, and the handler stays registered for the next call.
    pub async fn dispatch(&self, request: ActionRequest, respond: Responder) -> DispatchOutcome {
        let handler = self.handlers.lock().get(&request.action).cloned();
        match handler {
            None => DispatchOutcome::Response(ActionResponse::unknown_action(&request.action)),
            Some(handler) => match handler(request.payload.clone(), respond) {
                HandlerOutcome::Sync(response) => DispatchOutcome::Response(response),
                HandlerOutcome::AsyncHandled => DispatchOutcome::Deferred,
                HandlerOutcome::Pending(future) => {
                    let response = match future.await {
                        Ok(response) => response,
                        Err(error) => {
                            warn!(action = %request.action, error = %error, "action bus: handler failed");
                            ActionResponse::failure(error)
                        }
                    };
                    DispatchOutcome::Response(response)
                }
            },
        }
    }

    /// Parse a raw `{action, payload?}` message and dispatch it, or
    /// return `Invalid message format` if `action` is missing.
    pub async fn dispatch_raw(&self, message: &Value, respond: Responder) -> DispatchOutcome {
        let Some(action) = message.get("action").and_then(Value::as_str) else {
            return DispatchOutcome::Response(ActionResponse::invalid_message_format());
        };
        let request = ActionRequest {
            action: action.to_string(),
            payload: message.get("payload").cloned(),
        };
        self.dispatch(request, respond).await
    }
}

#[cfg(test)]
#[path = "action_bus_tests.rs"]
mod tests;
