use super::*;
use parking_lot::Mutex as PLMutex;
use std::sync::Arc;

fn noop_responder() -> Responder {
    Arc::new(|_| {})
}

#[tokio::test]
async fn unknown_action_yields_a_failure_response() {
    let bus = ActionBus::new();
    let outcome = bus.dispatch(ActionRequest::new("no_such_action"), noop_responder()).await;
    match outcome {
        DispatchOutcome::Response(r) => {
            assert!(!r.success);
            assert_eq!(r.error.as_deref(), Some("Unknown action: no_such_action"));
        }
        DispatchOutcome::Deferred => panic!("expected an immediate response"),
    }
}

#[tokio::test]
async fn sync_handler_answer_is_forwarded_directly() {
    let bus = ActionBus::new();
    bus.register(
        "ping",
        Arc::new(|_payload, _respond| HandlerOutcome::Sync(ActionResponse::ok(serde_json::json!("pong")))),
    );
    let outcome = bus.dispatch(ActionRequest::new("ping"), noop_responder()).await;
    match outcome {
        DispatchOutcome::Response(r) => {
            assert!(r.success);
            assert_eq!(r.data, Some(serde_json::json!("pong")));
        }
        DispatchOutcome::Deferred => panic!("expected an immediate response"),
    }
}

#[tokio::test]
async fn pending_handler_future_is_awaited_and_forwarded() {
    let bus = ActionBus::new();
    bus.register(
        "slow",
        Arc::new(|_payload, _respond| {
            HandlerOutcome::Pending(Box::pin(async {
                Ok(ActionResponse::ok(serde_json::json!(42)))
            }))
        }),
    );
    let outcome = bus.dispatch(ActionRequest::new("slow"), noop_responder()).await;
    match outcome {
        DispatchOutcome::Response(r) => {
            assert!(r.success);
            assert_eq!(r.data, Some(serde_json::json!(42)));
        }
        DispatchOutcome::Deferred => panic!("expected an immediate response"),
    }
}

#[tokio::test]
async fn pending_handler_rejection_is_caught_and_converted() {
    let bus = ActionBus::new();
    bus.register(
        "flaky",
        Arc::new(|_payload, _respond| {
            HandlerOutcome::Pending(Box::pin(async { Err("boom".to_string()) }))
        }),
    );
    let outcome = bus.dispatch(ActionRequest::new("flaky"), noop_responder()).await;
    match outcome {
        DispatchOutcome::Response(r) => {
            assert!(!r.success);
            assert_eq!(r.error.as_deref(), Some("boom"));
        }
        DispatchOutcome::Deferred => panic!("expected an immediate response"),
    }
    // The handler stays registered after failing.
    assert!(bus.is_registered("flaky"));
}

#[tokio::test]
async fn async_handled_defers_and_invokes_the_responder_later() {
    let bus = ActionBus::new();
    bus.register(
        "deferred",
        Arc::new(|_payload, respond| {
            respond(ActionResponse::ok_empty());
            HandlerOutcome::AsyncHandled
        }),
    );
    let captured: Arc<PLMutex<Option<ActionResponse>>> = Arc::new(PLMutex::new(None));
    let sink = captured.clone();
    let respond: Responder = Arc::new(move |r| *sink.lock() = Some(r));

    let outcome = bus.dispatch(ActionRequest::new("deferred"), respond).await;
    assert!(matches!(outcome, DispatchOutcome::Deferred));
    assert_eq!(captured.lock().as_ref().map(|r| r.success), Some(true));
}

#[tokio::test]
async fn registering_a_second_handler_for_the_same_action_replaces_the_first() {
    let bus = ActionBus::new();
    bus.register("ping", Arc::new(|_p, _r| HandlerOutcome::Sync(ActionResponse::ok(serde_json::json!("first")))));
    bus.register("ping", Arc::new(|_p, _r| HandlerOutcome::Sync(ActionResponse::ok(serde_json::json!("second")))));

    let outcome = bus.dispatch(ActionRequest::new("ping"), noop_responder()).await;
    match outcome {
        DispatchOutcome::Response(r) => assert_eq!(r.data, Some(serde_json::json!("second"))),
        DispatchOutcome::Deferred => panic!("expected an immediate response"),
    }
}

#[tokio::test]
async fn dispatch_raw_rejects_a_message_with_no_action_field() {
    let bus = ActionBus::new();
    let message = serde_json::json!({"payload": {"x": 1}});
    let outcome = bus.dispatch_raw(&message, noop_responder()).await;
    match outcome {
        DispatchOutcome::Response(r) => {
            assert!(!r.success);
            assert_eq!(r.error.as_deref(), Some("Invalid message format"));
        }
        DispatchOutcome::Deferred => panic!("expected an immediate response"),
    }
}

#[tokio::test]
async fn dispatch_raw_routes_by_action_and_forwards_payload() {
    let bus = ActionBus::new();
    bus.register(
        "echo",
        Arc::new(|payload, _respond| HandlerOutcome::Sync(ActionResponse::ok(payload.unwrap_or(Value::Null)))),
    );
    let message = serde_json::json!({"action": "echo", "payload": {"x": 1}});
    let outcome = bus.dispatch_raw(&message, noop_responder()).await;
    match outcome {
        DispatchOutcome::Response(r) => assert_eq!(r.data, Some(serde_json::json!({"x": 1}))),
        DispatchOutcome::Deferred => panic!("expected an immediate response"),
    }
}
