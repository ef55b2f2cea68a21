use super::*;
use parking_lot::Mutex as PLMutex;

fn recorder() -> (Arc<PLMutex<Vec<String>>>, BroadcastSubscriber) {
    let seen = Arc::new(PLMutex::new(Vec::new()));
    let sink = seen.clone();
    let subscriber: BroadcastSubscriber = Arc::new(move |b| {
        sink.lock().push(b.event_type.clone());
        Ok(())
    });
    (seen, subscriber)
}

#[test]
fn subscribers_of_the_matching_type_are_invoked() {
    let bus = BroadcastBus::new();
    let (seen, subscriber) = recorder();
    bus.subscribe("row_completed", subscriber);
    bus.publish(&Broadcast::new("row_completed"));
    bus.publish(&Broadcast::new("row_started"));
    assert_eq!(*seen.lock(), vec!["row_completed".to_string()]);
}

#[test]
fn wildcard_subscribers_receive_every_broadcast() {
    let bus = BroadcastBus::new();
    let (seen, subscriber) = recorder();
    bus.subscribe(WILDCARD, subscriber);
    bus.publish(&Broadcast::new("row_completed"));
    bus.publish(&Broadcast::new("row_started"));
    assert_eq!(*seen.lock(), vec!["row_completed".to_string(), "row_started".to_string()]);
}

#[test]
fn typed_subscribers_run_before_wildcard_subscribers() {
    let bus = BroadcastBus::new();
    let order = Arc::new(PLMutex::new(Vec::new()));
    let typed_order = order.clone();
    bus.subscribe("x", Arc::new(move |_| {
        typed_order.lock().push("typed");
        Ok(())
    }));
    let wildcard_order = order.clone();
    bus.subscribe(WILDCARD, Arc::new(move |_| {
        wildcard_order.lock().push("wildcard");
        Ok(())
    }));
    bus.publish(&Broadcast::new("x"));
    assert_eq!(*order.lock(), vec!["typed", "wildcard"]);
}

#[test]
fn subscribers_are_invoked_in_registration_order() {
    let bus = BroadcastBus::new();
    let order = Arc::new(PLMutex::new(Vec::new()));
    for i in 0..3 {
        let order = order.clone();
        bus.subscribe("x", Arc::new(move |_| {
            order.lock().push(i);
            Ok(())
        }));
    }
    bus.publish(&Broadcast::new("x"));
    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[test]
fn a_failing_subscriber_never_blocks_the_next_one() {
    let bus = BroadcastBus::new();
    bus.subscribe("x", Arc::new(|_| Err("boom".to_string())));
    let (seen, subscriber) = recorder();
    bus.subscribe("x", subscriber);
    bus.publish(&Broadcast::new("x"));
    assert_eq!(*seen.lock(), vec!["x".to_string()]);
}

#[test]
fn clear_removes_every_subscription() {
    let bus = BroadcastBus::new();
    let (seen, subscriber) = recorder();
    bus.subscribe("x", subscriber);
    bus.clear();
    bus.publish(&Broadcast::new("x"));
    assert!(seen.lock().is_empty());
}
