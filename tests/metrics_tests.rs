//! End-to-end scenarios for the time-bucketed metrics tracker.

#![cfg(feature = "test")]

use chrono::{DateTime, Duration};
use driftq::{
    metrics::{InMemoryMetricsTracker, MetricsStore},
    queue::test::MockClock,
};

#[tokio::test]
async fn test_tracked_values_come_back_in_bucket_order() {
    let clock = MockClock::new();
    clock.set_time(DateTime::from_timestamp_millis(1000).unwrap());
    let tracker = InMemoryMetricsTracker::with_clock(clock.clone());

    tracker.track("test", 1.0).await.unwrap();
    clock.advance(Duration::milliseconds(1000));
    tracker.track("test", 2.0).await.unwrap();

    let data = tracker.range("test").await.unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0].timestamp, DateTime::from_timestamp(1, 0).unwrap());
    assert_eq!(data[0].value, 1.0);
    assert_eq!(data[1].timestamp, DateTime::from_timestamp(2, 0).unwrap());
    assert_eq!(data[1].value, 2.0);
}

#[tokio::test]
async fn test_tracking_the_same_value_twice_keeps_both_buckets() {
    let clock = MockClock::new();
    clock.set_time(DateTime::from_timestamp_millis(1000).unwrap());
    let tracker = InMemoryMetricsTracker::with_clock(clock.clone());

    tracker.track("test", 1.0).await.unwrap();
    clock.advance(Duration::milliseconds(1000));
    tracker.track("test", 1.0).await.unwrap();

    let data = tracker.range("test").await.unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0].timestamp, DateTime::from_timestamp(1, 0).unwrap());
    assert_eq!(data[1].timestamp, DateTime::from_timestamp(2, 0).unwrap());
    assert_eq!(data[0].value, 1.0);
    assert_eq!(data[1].value, 1.0);
}

#[tokio::test]
async fn test_series_are_independent() {
    let clock = MockClock::new();
    let tracker = InMemoryMetricsTracker::with_clock(clock.clone());

    tracker.track("enqueued", 10.0).await.unwrap();
    tracker.track("claimed", 3.0).await.unwrap();

    assert_eq!(tracker.range("enqueued").await.unwrap().len(), 1);
    assert_eq!(tracker.range("claimed").await.unwrap().len(), 1);
    assert!(tracker.range("other").await.unwrap().is_empty());
}
