use super::*;
use parking_lot::Mutex;
use relay_core::RecordingSleeper;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FlakyTransport {
    fail_count: AtomicUsize,
    calls: AtomicUsize,
    responses_after: Mutex<Vec<ActionResponse>>,
}

impl FlakyTransport {
    fn failing_n_times(n: usize) -> Self {
        Self {
            fail_count: AtomicUsize::new(n),
            calls: AtomicUsize::new(0),
            responses_after: Mutex::new(vec![ActionResponse::ok_empty()]),
        }
    }

    fn always_failing() -> Self {
        Self {
            fail_count: AtomicUsize::new(usize::MAX),
            calls: AtomicUsize::new(0),
            responses_after: Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl ActionTransport for FlakyTransport {
    async fn send(&self, _request: &ActionRequest) -> Result<ActionResponse, WireError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            if n == 0 {
                None
            } else {
                Some(n - 1)
            }
        });
        if remaining.is_ok() {
            return Err(WireError::Transport("channel closed".to_string()));
        }
        Ok(self.responses_after.lock()[0].clone())
    }
}

fn s2_policy() -> BackoffPolicy {
    BackoffPolicy { base_ms: 100, max_ms: 10_000, max_attempts: 3, jitter_factor: 0.0 }
}

#[tokio::test]
async fn scenario_s2_retry_with_backoff() {
    let transport = FlakyTransport::failing_n_times(2);
    let sleeper = Arc::new(RecordingSleeper::new());
    let sender = RetrySender::new(transport, s2_policy(), sleeper.clone());

    let response = sender.send(&ActionRequest::new("start_replay")).await.unwrap();
    assert!(response.success);
    assert_eq!(sender.transport.calls.load(Ordering::SeqCst), 3);

    let delays = sleeper.requested();
    assert_eq!(delays, vec![std::time::Duration::from_millis(100), std::time::Duration::from_millis(200)]);
    let total: std::time::Duration = delays.iter().sum();
    assert_eq!(total, std::time::Duration::from_millis(300));
}

#[tokio::test]
async fn exhausting_all_attempts_surfaces_retries_exhausted() {
    let transport = FlakyTransport::always_failing();
    let sleeper = Arc::new(RecordingSleeper::new());
    let sender = RetrySender::new(transport, s2_policy(), sleeper);

    let err = sender.send(&ActionRequest::new("start_replay")).await.unwrap_err();
    assert_eq!(err, WireError::RetriesExhausted { attempts: 3, last_error: "transport error: channel closed".to_string() });
    assert_eq!(sender.transport.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn success_on_first_attempt_never_sleeps() {
    let transport = FlakyTransport::failing_n_times(0);
    let sleeper = Arc::new(RecordingSleeper::new());
    let sender = RetrySender::new(transport, s2_policy(), sleeper.clone());

    sender.send(&ActionRequest::new("ping")).await.unwrap();
    assert!(sleeper.requested().is_empty());
    assert_eq!(sender.transport.calls.load(Ordering::SeqCst), 1);
}
