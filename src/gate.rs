//! Sustained-compliance pose gate.
//!
//! A gate samples a predicate at fixed cadence and resolves only after the
//! predicate has held on every sample for an unbroken stretch of the hold
//! window. Any failing sample — including one with no pose data — resets
//! the accumulator to zero; there is no partial credit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::collab::PoseSource;
use crate::models::pose::PoseSample;

/// Proof that a hold was sustained for the full window.
#[derive(Debug, Clone, Copy)]
pub struct HoldConfirmation {
    /// First satisfying sample of the unbroken run.
    pub hold_started: Instant,
    /// Sample at which the window was complete.
    pub confirmed_at: Instant,
}

impl HoldConfirmation {
    /// Duration from start-of-hold to confirmation.
    #[must_use]
    pub fn held_for(&self) -> Duration {
        self.confirmed_at.saturating_duration_since(self.hold_started)
    }
}

/// Hold-window accumulator. Confirms at most once.
#[derive(Debug, Default)]
pub struct HoldAccumulator {
    correct_since: Option<Instant>,
    confirmed: bool,
}

impl HoldAccumulator {
    /// Fresh accumulator with no credit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sample. Returns the confirmation exactly once, on the
    /// first sample that completes an unbroken window of `hold`.
    pub fn observe(
        &mut self,
        satisfied: bool,
        now: Instant,
        hold: Duration,
    ) -> Option<HoldConfirmation> {
        if !satisfied {
            self.correct_since = None;
            return None;
        }
        let since = *self.correct_since.get_or_insert(now);
        if self.confirmed || now.saturating_duration_since(since) < hold {
            return None;
        }
        self.confirmed = true;
        Some(HoldConfirmation {
            hold_started: since,
            confirmed_at: now,
        })
    }

    /// Start of the current unbroken run, if one is in progress.
    #[must_use]
    pub fn correct_since(&self) -> Option<Instant> {
        self.correct_since
    }
}

/// Fixed-cadence sustained-compliance detector over a pose source.
pub struct PoseGate {
    pose: Arc<dyn PoseSource>,
    sample_period: Duration,
}

impl PoseGate {
    /// Construct a gate sampling the source at `sample_period`.
    #[must_use]
    pub fn new(pose: Arc<dyn PoseSource>, sample_period: Duration) -> Self {
        Self {
            pose,
            sample_period,
        }
    }

    /// Wait until `predicate` holds on every sample for an unbroken
    /// stretch of `hold`.
    ///
    /// Resolves exactly once with the confirmation, or returns `None`
    /// without resolving when `cancel` fires mid-wait — abandonment on
    /// cleanup is not an error. A sample the source cannot produce counts
    /// as non-satisfying and resets the accumulator. No timeout bounds
    /// the wait; only the caller's cancellation ends it early.
    pub async fn watch<P>(
        &self,
        predicate: P,
        hold: Duration,
        cancel: &CancellationToken,
    ) -> Option<HoldConfirmation>
    where
        P: Fn(&PoseSample) -> bool + Send + Sync,
    {
        let mut accumulator = HoldAccumulator::new();
        let mut interval = tokio::time::interval(self.sample_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("pose gate abandoned mid-wait");
                    return None;
                }
                _ = interval.tick() => {}
            }

            let satisfied = match self.pose.current_pose() {
                Some(sample) => predicate(&sample),
                None => {
                    trace!("no pose data, hold accumulator reset");
                    false
                }
            };

            if let Some(confirmation) = accumulator.observe(satisfied, Instant::now(), hold) {
                debug!(
                    held_ms = confirmation.held_for().as_millis(),
                    "hold confirmed"
                );
                return Some(confirmation);
            }
        }
    }
}
