use super::*;
use std::time::Duration;

#[tokio::test]
async fn real_sleeper_actually_waits() {
    let sleeper = RealSleeper;
    let start = std::time::Instant::now();
    sleeper.sleep(Duration::from_millis(5)).await;
    assert!(start.elapsed() >= Duration::from_millis(5));
}

#[tokio::test]
async fn recording_sleeper_returns_immediately_and_records_the_request() {
    let sleeper = RecordingSleeper::new();
    let start = std::time::Instant::now();
    sleeper.sleep(Duration::from_secs(30)).await;
    assert!(start.elapsed() < Duration::from_millis(50));
    assert_eq!(sleeper.requested(), vec![Duration::from_secs(30)]);
}

#[tokio::test]
async fn recording_sleeper_accumulates_multiple_requests_in_order() {
    let sleeper = RecordingSleeper::new();
    sleeper.sleep(Duration::from_millis(1)).await;
    sleeper.sleep(Duration::from_millis(2)).await;
    assert_eq!(
        sleeper.requested(),
        vec![Duration::from_millis(1), Duration::from_millis(2)]
    );
}
