//! Breathing-hold meditation program.
//!
//! After an averaged calibration and a short stabilization delay, the
//! meditation loop runs two independent repeating timers over shared
//! guarded state: a 1 s clock check against the pausable clock, and a
//! 200 ms posture watchdog that opens correction episodes when the live
//! posture metric deviates past tolerance for longer than the grace
//! window. The timers never assume anything about each other's
//! interleaving; every decision reads the guard flags under one lock.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use crate::clock::{CorrectionEpisode, PausableClock};
use crate::calibration::CalibrationStage;
use crate::collab::{Cue, CuePlayer, PoseSource};
use crate::config::CoachConfig;
use crate::metrics::{self, MetricKind};
use crate::models::session::{ProgramId, ProgramOutcome, SessionResult};
use crate::programs::{ExerciseProgram, Flow, ProgramCore, ProgramState};
use crate::timer::{RepeatingTimer, Tick};
use crate::Result;

/// Mutable state shared by the clock check and the posture watchdog.
struct MeditationState {
    clock: PausableClock,
    deviating_since: Option<Instant>,
    correction: Option<CorrectionEpisode>,
    user_paused: bool,
    deviation_count: u32,
    total_correction: Duration,
}

impl MeditationState {
    fn new(now: Instant) -> Self {
        Self {
            clock: PausableClock::start(now),
            deviating_since: None,
            correction: None,
            user_paused: false,
            deviation_count: 0,
            total_correction: Duration::ZERO,
        }
    }
}

type SharedState = Arc<Mutex<MeditationState>>;

/// Audio follow-up decided by a watchdog tick, executed after the lock is
/// released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchdogAction {
    None,
    EnterCorrection,
    ExitCorrection,
}

/// Breathing-hold meditation gated on the posture-height metric.
pub struct BreathingHoldProgram {
    core: ProgramCore,
    shared: Mutex<Option<SharedState>>,
}

impl BreathingHoldProgram {
    /// Construct the program with its injected collaborators.
    #[must_use]
    pub fn new(
        pose: Arc<dyn PoseSource>,
        cues: Arc<dyn CuePlayer>,
        config: Arc<CoachConfig>,
    ) -> Self {
        Self {
            core: ProgramCore::new(pose, cues, config),
            shared: Mutex::new(None),
        }
    }

    fn live_state(&self) -> Option<SharedState> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_live_state(&self, state: Option<SharedState>) {
        *self.shared.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    async fn stages(&self) -> Result<(ProgramOutcome, bool)> {
        let core = &self.core;
        let stopped = ProgramOutcome::Meditation {
            deviation_count: 0,
            total_correction: Duration::ZERO,
        };

        let intro = [Cue::Welcome, Cue::BreathingIntro, Cue::CalibrationIntro];
        if core.play_cues(&intro).await? == Flow::Cancelled {
            return Ok((stopped, false));
        }

        let calibration = CalibrationStage::new(Arc::clone(&core.pose), Arc::clone(&core.config));
        let Some(baseline) = calibration
            .capture_averaged(MetricKind::PostureHeight, &core.cancel)
            .await?
        else {
            return Ok((stopped, false));
        };
        let baseline_metric = baseline.metric();
        core.set_baseline(baseline);

        // Let the user settle before the watchdog starts judging posture.
        if core.delay(core.config.timing.stabilization()).await == Flow::Cancelled {
            return Ok((stopped, false));
        }

        let (outcome, completed) = self.meditation_loop(baseline_metric).await;

        if completed && core.play_cues(&[Cue::SessionComplete]).await? == Flow::Cancelled {
            return Ok((outcome, false));
        }
        Ok((outcome, completed))
    }

    /// Run the two meditation timers until the target elapses or the
    /// program is stopped. Returns the accumulated outcome and whether
    /// the target was reached.
    async fn meditation_loop(&self, baseline_metric: f64) -> (ProgramOutcome, bool) {
        let core = &self.core;
        let timing = &core.config.timing;

        let shared: SharedState = Arc::new(Mutex::new(MeditationState::new(Instant::now())));
        self.set_live_state(Some(Arc::clone(&shared)));
        let done = Arc::new(Notify::new());
        let loop_cancel = core.cancel.child_token();

        core.resource_acquired();
        let clock_timer = RepeatingTimer::spawn("clock_check", timing.clock_tick(), loop_cancel.clone(), {
            let shared = Arc::clone(&shared);
            let done = Arc::clone(&done);
            let target = timing.meditation_target();
            move || {
                let shared = Arc::clone(&shared);
                let done = Arc::clone(&done);
                async move {
                    let elapsed = shared
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clock
                        .elapsed(Instant::now());
                    trace!(elapsed_ms = elapsed.as_millis(), "meditation clock check");
                    if elapsed >= target {
                        done.notify_one();
                        Tick::Stop
                    } else {
                        Tick::Continue
                    }
                }
            }
        });

        core.resource_acquired();
        let watchdog = RepeatingTimer::spawn("posture_watchdog", timing.watchdog(), loop_cancel.clone(), {
            let shared = Arc::clone(&shared);
            let pose = Arc::clone(&core.pose);
            let cues = Arc::clone(&core.cues);
            let deviation_threshold = core.config.thresholds.posture_deviation;
            let min_confidence = core.config.min_confidence;
            let grace = timing.grace();
            move || {
                let shared = Arc::clone(&shared);
                let pose = Arc::clone(&pose);
                let cues = Arc::clone(&cues);
                async move {
                    let action = watchdog_tick(
                        &shared,
                        pose.as_ref(),
                        baseline_metric,
                        deviation_threshold,
                        min_confidence,
                        grace,
                    );
                    match action {
                        WatchdogAction::EnterCorrection => {
                            info!("posture deviation persisted past grace, correction started");
                            if let Err(err) = cues.start_loop(Cue::PostureReminder).await {
                                warn!(%err, "failed to start correction cue loop");
                            }
                        }
                        WatchdogAction::ExitCorrection => {
                            info!("posture recovered, correction ended");
                            if let Err(err) = cues.stop_loop().await {
                                warn!(%err, "failed to stop correction cue loop");
                            }
                        }
                        WatchdogAction::None => {}
                    }
                    Tick::Continue
                }
            }
        });

        let completed = tokio::select! {
            () = core.cancel.cancelled() => false,
            () = done.notified() => true,
        };

        // Both timers go down together on every exit path.
        loop_cancel.cancel();
        clock_timer.await_completion().await;
        core.resource_released();
        watchdog.await_completion().await;
        core.resource_released();

        let (deviation_count, total_correction, correction_open) = {
            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let open = state.correction.is_some();
            if let Some(mut episode) = state.correction.take() {
                let span = episode.finish(now);
                state.total_correction += span;
                state.clock.resume(now);
            }
            (state.deviation_count, state.total_correction, open)
        };
        if correction_open {
            if let Err(err) = core.cues.stop_loop().await {
                warn!(%err, "failed to stop correction cue loop on exit");
            }
        }
        self.set_live_state(None);

        (
            ProgramOutcome::Meditation {
                deviation_count,
                total_correction,
            },
            completed,
        )
    }
}

/// One watchdog evaluation. All clock and flag mutation happens under the
/// shared lock, so a correction exit resumes the clock before any later
/// clock tick can read elapsed — paused time is never double-counted.
fn watchdog_tick(
    shared: &SharedState,
    pose: &dyn PoseSource,
    baseline_metric: f64,
    deviation_threshold: f64,
    min_confidence: f64,
    grace: Duration,
) -> WatchdogAction {
    let reading = pose
        .current_pose()
        .and_then(|sample| metrics::read_metric(MetricKind::PostureHeight, &sample))
        .filter(|reading| reading.confidence >= min_confidence);

    let now = Instant::now();
    let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);

    if state.user_paused {
        return WatchdogAction::None;
    }

    let Some(reading) = reading else {
        // One unreadable sample must not kill the loop; skip and keep
        // sampling.
        trace!("posture sample unavailable, watchdog tick skipped");
        return WatchdogAction::None;
    };

    let deviation = metrics::relative_change(baseline_metric, reading.value).abs();

    if state.correction.is_some() {
        if deviation <= deviation_threshold {
            if let Some(mut episode) = state.correction.take() {
                let span = episode.finish(now);
                state.total_correction += span;
                debug!(span_ms = span.as_millis(), "correction episode closed");
            }
            state.clock.resume(now);
            return WatchdogAction::ExitCorrection;
        }
        return WatchdogAction::None;
    }

    if deviation > deviation_threshold {
        match state.deviating_since {
            None => {
                state.deviating_since = Some(now);
                debug!(deviation, "posture deviation detected, grace window armed");
            }
            Some(since) if now.saturating_duration_since(since) >= grace => {
                state.deviating_since = None;
                state.clock.pause(now);
                state.correction = Some(CorrectionEpisode::begin(now));
                state.deviation_count += 1;
                return WatchdogAction::EnterCorrection;
            }
            Some(_) => {}
        }
    } else {
        state.deviating_since = None;
    }
    WatchdogAction::None
}

#[async_trait]
impl ExerciseProgram for BreathingHoldProgram {
    fn id(&self) -> ProgramId {
        ProgramId::BreathingHold
    }

    fn state(&self) -> ProgramState {
        self.core.state()
    }

    fn active_resources(&self) -> usize {
        self.core.active_resources()
    }

    async fn initialize(&self) -> Result<()> {
        self.core.ensure_ready()?;
        self.core.set_state(ProgramState::Ready);
        Ok(())
    }

    async fn run(&self) -> Result<SessionResult> {
        let started_at = Utc::now();
        self.core.set_state(ProgramState::Running);

        match self.stages().await {
            Ok((outcome, completed)) => {
                self.core.set_state(ProgramState::Completed);
                Ok(SessionResult {
                    started_at,
                    ended_at: Utc::now(),
                    completed,
                    error: None,
                    outcome,
                })
            }
            Err(err) => {
                self.core.set_state(ProgramState::Error);
                self.core.release_all().await;
                Err(err)
            }
        }
    }

    /// Suspend the meditation clock unless a correction episode already
    /// holds it paused.
    async fn pause(&self) {
        self.core.mark_paused();
        if let Some(shared) = self.live_state() {
            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.correction.is_none() && !state.user_paused {
                state.user_paused = true;
                state.deviating_since = None;
                state.clock.pause(Instant::now());
            }
        }
    }

    async fn resume(&self) {
        self.core.mark_resumed();
        if let Some(shared) = self.live_state() {
            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.user_paused {
                state.user_paused = false;
                state.clock.resume(Instant::now());
            }
        }
    }

    async fn stop(&self) {
        self.core.cancel.cancel();
    }

    async fn cleanup(&self) {
        self.core.release_all().await;
    }
}
