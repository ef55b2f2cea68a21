use super::*;

#[test]
fn property_8_synchronous_stop_is_observed_without_any_await() {
    let controller = StopController::new();
    controller.start();
    assert!(controller.should_continue());

    controller.stop(StopReason::UserRequested, "user clicked stop");

    assert!(controller.should_stop());
    assert!(!controller.should_continue());
}

#[test]
fn checkpoint_is_ok_while_running() {
    let controller = StopController::new();
    controller.start();
    assert!(controller.checkpoint().is_ok());
}

#[test]
fn checkpoint_raises_stop_requested_error_after_stop() {
    let controller = StopController::new();
    controller.start();
    controller.stop(StopReason::MaxErrors, "too many failures");

    let err = controller.checkpoint().unwrap_err();
    assert_eq!(err.reason, "max_errors");
    assert_eq!(err.message, "too many failures");
}

#[test]
fn checkpoint_fails_before_start_is_ever_called() {
    let controller = StopController::new();
    assert!(controller.checkpoint().is_err());
}

#[test]
fn start_resets_flags_and_reason_for_a_new_run() {
    let controller = StopController::new();
    controller.start();
    controller.stop(StopReason::UserRequested, "stop");
    assert!(controller.should_stop());

    controller.start();
    assert!(controller.checkpoint().is_ok());
    assert!(controller.stop_reason().is_none());
}

#[tokio::test]
async fn stop_cancels_the_cancellation_token() {
    let controller = StopController::new();
    controller.start();
    let token = controller.cancellation_token();
    assert!(!token.is_cancelled());

    controller.stop(StopReason::UserRequested, "stop");
    assert!(token.is_cancelled());
}
