//! Integration tests for the keyed timer registry.
//!
//! Every test runs with `start_paused = true`: the Tokio clock only moves
//! when all tasks are idle, so sleeps resolve instantly and in order.

use std::time::Duration;

use riddlehall_timer::{TimerRegistry, TimerToken};
use tokio::sync::mpsc;
use tokio::time;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Warning,
    Timeout,
}

/// Arms `key` so that its firing lands on `tx` as `(key, token)`.
fn arm(
    timers: &mut TimerRegistry<Key>,
    tx: &mpsc::UnboundedSender<(Key, TimerToken)>,
    key: Key,
    secs: u64,
) -> TimerToken {
    let tx = tx.clone();
    timers.schedule(key, Duration::from_secs(secs), move |token| async move {
        let _ = tx.send((key, token));
    })
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_timer_fires_after_delay() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timers = TimerRegistry::new("test");
    let token = arm(&mut timers, &tx, Key::Timeout, 180);

    let start = time::Instant::now();
    let (key, fired) = rx.recv().await.unwrap();
    assert_eq!(key, Key::Timeout);
    assert_eq!(fired, token);
    assert_eq!(start.elapsed(), Duration::from_secs(180));
    assert!(timers.claim(&key, fired));
    assert!(timers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timers_fire_in_deadline_order() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timers = TimerRegistry::new("test");
    arm(&mut timers, &tx, Key::Timeout, 180);
    arm(&mut timers, &tx, Key::Warning, 150);

    assert_eq!(rx.recv().await.unwrap().0, Key::Warning);
    assert_eq!(rx.recv().await.unwrap().0, Key::Timeout);
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timers = TimerRegistry::new("test");
    arm(&mut timers, &tx, Key::Timeout, 30);

    assert!(timers.cancel(&Key::Timeout));
    assert!(!timers.is_armed(&Key::Timeout));

    let result = time::timeout(Duration::from_secs(60), rx.recv()).await;
    assert!(result.is_err(), "cancelled timer should not fire");
    assert_eq!(timers.metrics().cancelled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_replacing_aborts_previous_timer() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timers = TimerRegistry::new("test");
    arm(&mut timers, &tx, Key::Warning, 10);
    let second = arm(&mut timers, &tx, Key::Warning, 20);

    let start = time::Instant::now();
    let (_, token) = rx.recv().await.unwrap();
    assert_eq!(token, second);
    assert_eq!(start.elapsed(), Duration::from_secs(20));
    assert_eq!(timers.metrics().replaced, 1);
}

#[tokio::test(start_paused = true)]
async fn test_firing_queued_before_cancel_is_stale() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timers = TimerRegistry::new("test");
    arm(&mut timers, &tx, Key::Timeout, 5);

    // Let the callback run, then cancel before looking at its message.
    time::sleep(Duration::from_secs(6)).await;
    assert!(timers.cancel(&Key::Timeout));

    let (key, token) = rx.recv().await.unwrap();
    assert!(!timers.claim(&key, token));
    assert_eq!(timers.metrics().stale, 1);
    assert_eq!(timers.metrics().fired, 0);
}

#[tokio::test(start_paused = true)]
async fn test_claim_is_single_use() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timers = TimerRegistry::new("test");
    arm(&mut timers, &tx, Key::Warning, 1);

    let (key, token) = rx.recv().await.unwrap();
    assert!(timers.claim(&key, token));
    assert!(!timers.claim(&key, token));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_stops_everything() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timers = TimerRegistry::new("test");
    arm(&mut timers, &tx, Key::Warning, 150);
    arm(&mut timers, &tx, Key::Timeout, 180);

    assert_eq!(timers.len(), 2);
    assert_eq!(timers.cancel_all(), 2);

    let result = time::timeout(Duration::from_secs(300), rx.recv()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_drop_aborts_armed_timers() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    {
        let mut timers = TimerRegistry::new("test");
        arm(&mut timers, &tx, Key::Timeout, 10);
    }
    drop(tx);

    // The only other sender lived in the aborted task, so the channel
    // closes instead of delivering.
    let result = time::timeout(Duration::from_secs(30), rx.recv()).await;
    assert_eq!(result.unwrap(), None);
}
