//! Unit tests for the pose gate and its hold accumulator.
//!
//! Validates the no-partial-credit law: a gate resolves iff a contiguous
//! run of satisfying samples covers the full hold window.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use posture_coach::collab::PoseSource;
use posture_coach::gate::{HoldAccumulator, PoseGate};
use posture_coach::models::pose::{BodyPart, Landmark, PoseSample};

/// Source that replays a frame script in a cycle.
struct CyclicSource {
    frames: Vec<Option<PoseSample>>,
    index: AtomicUsize,
}

impl CyclicSource {
    fn new(frames: Vec<Option<PoseSample>>) -> Arc<Self> {
        Arc::new(Self {
            frames,
            index: AtomicUsize::new(0),
        })
    }
}

impl PoseSource for CyclicSource {
    fn is_ready(&self) -> bool {
        true
    }

    fn current_pose(&self) -> Option<PoseSample> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        self.frames[i % self.frames.len()].clone()
    }
}

fn marked_pose(x: f64) -> PoseSample {
    PoseSample::new().with_landmark(BodyPart::Nose, Landmark::new(x, 0.0, 0.9))
}

fn good() -> Option<PoseSample> {
    Some(marked_pose(1.0))
}

fn bad() -> Option<PoseSample> {
    Some(marked_pose(0.0))
}

fn satisfied(sample: &PoseSample) -> bool {
    sample
        .landmark(BodyPart::Nose)
        .is_some_and(|nose| nose.x > 0.5)
}

fn at(base: Instant, ms: u64) -> Instant {
    base + Duration::from_millis(ms)
}

// ── HoldAccumulator (pure) ───────────────────────────────────────────────

#[test]
fn accumulator_confirms_after_unbroken_window() {
    let base = Instant::now();
    let hold = Duration::from_millis(300);
    let mut acc = HoldAccumulator::new();

    assert!(acc.observe(true, at(base, 0), hold).is_none());
    assert!(acc.observe(true, at(base, 100), hold).is_none());
    assert!(acc.observe(true, at(base, 200), hold).is_none());
    let confirmation = acc
        .observe(true, at(base, 300), hold)
        .expect("window complete");
    assert_eq!(confirmation.held_for(), Duration::from_millis(300));
}

#[test]
fn failing_sample_resets_the_accumulator() {
    let base = Instant::now();
    let hold = Duration::from_millis(300);
    let mut acc = HoldAccumulator::new();

    assert!(acc.observe(true, at(base, 0), hold).is_none());
    assert!(acc.observe(true, at(base, 100), hold).is_none());
    assert!(acc.observe(false, at(base, 200), hold).is_none());
    // The hold clock restarts from the first satisfying sample after the
    // reset — no credit for the earlier run.
    assert!(acc.observe(true, at(base, 300), hold).is_none());
    assert!(acc.observe(true, at(base, 500), hold).is_none());
    let confirmation = acc
        .observe(true, at(base, 600), hold)
        .expect("full window after reset");
    assert_eq!(confirmation.hold_started, at(base, 300));
}

#[test]
fn shorter_satisfying_runs_never_confirm() {
    let base = Instant::now();
    let hold = Duration::from_millis(300);
    let mut acc = HoldAccumulator::new();

    // Repeated 200 ms runs, each broken before the window completes.
    for cycle in 0..5_u64 {
        let offset = cycle * 300;
        assert!(acc.observe(true, at(base, offset), hold).is_none());
        assert!(acc.observe(true, at(base, offset + 100), hold).is_none());
        assert!(acc.observe(true, at(base, offset + 200), hold).is_none());
        assert!(acc.observe(false, at(base, offset + 250), hold).is_none());
    }
}

#[test]
fn accumulator_confirms_exactly_once() {
    let base = Instant::now();
    let hold = Duration::from_millis(100);
    let mut acc = HoldAccumulator::new();

    assert!(acc.observe(true, at(base, 0), hold).is_none());
    assert!(acc.observe(true, at(base, 100), hold).is_some());
    assert!(acc.observe(true, at(base, 200), hold).is_none());
    assert!(acc.observe(true, at(base, 300), hold).is_none());
}

// ── PoseGate (async) ─────────────────────────────────────────────────────

#[tokio::test]
async fn watch_resolves_after_sustained_compliance() {
    let source = CyclicSource::new(vec![good()]);
    let gate = PoseGate::new(source, Duration::from_millis(10));
    let cancel = CancellationToken::new();

    let confirmation = tokio::time::timeout(
        Duration::from_secs(2),
        gate.watch(satisfied, Duration::from_millis(50), &cancel),
    )
    .await
    .expect("gate should resolve before timeout")
    .expect("gate should confirm, not abandon");

    assert!(confirmation.held_for() >= Duration::from_millis(50));
}

#[tokio::test]
async fn watch_never_resolves_on_broken_runs() {
    // Four satisfying samples then a break: at a 10 ms cadence no
    // contiguous run covers the 60 ms hold.
    let source = CyclicSource::new(vec![good(), good(), good(), good(), bad()]);
    let gate = PoseGate::new(source, Duration::from_millis(10));
    let cancel = CancellationToken::new();

    let outcome = tokio::time::timeout(
        Duration::from_millis(400),
        gate.watch(satisfied, Duration::from_millis(60), &cancel),
    )
    .await;
    assert!(outcome.is_err(), "broken runs must never confirm");
}

#[tokio::test]
async fn missing_pose_data_resets_the_hold() {
    let source = CyclicSource::new(vec![good(), good(), good(), None]);
    let gate = PoseGate::new(source, Duration::from_millis(10));
    let cancel = CancellationToken::new();

    let outcome = tokio::time::timeout(
        Duration::from_millis(400),
        gate.watch(satisfied, Duration::from_millis(50), &cancel),
    )
    .await;
    assert!(outcome.is_err(), "a missing sample must reset the hold");
}

#[tokio::test]
async fn watch_abandoned_on_cancel_resolves_nothing() {
    let source = CyclicSource::new(vec![good()]);
    let gate = PoseGate::new(source, Duration::from_millis(10));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        gate.watch(satisfied, Duration::from_secs(60), &cancel),
    )
    .await
    .expect("abandonment should end the wait promptly");
    assert!(outcome.is_none(), "abandoned watch must not confirm");
}
