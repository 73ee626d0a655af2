//! Unit tests for the cancellable repeating timer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use posture_coach::timer::{RepeatingTimer, Tick};

#[tokio::test]
async fn timer_ticks_at_its_period() {
    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);
    let timer = RepeatingTimer::spawn(
        "tick_counter",
        Duration::from_millis(10),
        CancellationToken::new(),
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Tick::Continue
            }
        },
    );

    tokio::time::sleep(Duration::from_millis(120)).await;
    timer.await_completion().await;
    let ticks = count.load(Ordering::SeqCst);
    assert!(ticks >= 5, "expected several ticks, got {ticks}");
}

#[tokio::test]
async fn callback_stop_ends_the_loop() {
    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);
    let timer = RepeatingTimer::spawn(
        "self_stopping",
        Duration::from_millis(10),
        CancellationToken::new(),
        move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                    Tick::Stop
                } else {
                    Tick::Continue
                }
            }
        },
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(timer.is_finished(), "timer should stop itself");
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn cancellation_stops_ticking() {
    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);
    let cancel = CancellationToken::new();
    let timer = RepeatingTimer::spawn(
        "cancellable",
        Duration::from_millis(10),
        cancel.clone(),
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Tick::Continue
            }
        },
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    timer.await_completion().await;

    let after_cancel = count.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        count.load(Ordering::SeqCst),
        after_cancel,
        "no ticks may land after cancellation"
    );
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn dropping_the_handle_cancels_the_task() {
    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);
    let timer = RepeatingTimer::spawn(
        "dropped",
        Duration::from_millis(10),
        CancellationToken::new(),
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Tick::Continue
            }
        },
    );
    assert_eq!(timer.name(), "dropped");

    tokio::time::sleep(Duration::from_millis(40)).await;
    drop(timer);
    // An in-flight tick may still land; after that the count must freeze.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let settled = count.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        count.load(Ordering::SeqCst),
        settled,
        "a dropped handle leaks its timer"
    );
}
