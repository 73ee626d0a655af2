//! Exercise programs and their shared pipeline plumbing.
//!
//! Each program runs the same stage pipeline — cues, calibration, a
//! program-specific loop, completion — as awaited suspension points. The
//! two repetition programs differ only by configuration table; the
//! meditation program adds the pausable clock and posture watchdog.

pub mod breathing_hold;
pub mod lateral_turn;
pub mod phase_runner;
pub mod vertical_tilt;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::collab::{Cue, CuePlayer, PoseSource};
use crate::config::CoachConfig;
use crate::models::baseline::Baseline;
use crate::models::session::{ProgramId, SessionResult};
use crate::{AppError, Result};

pub use breathing_hold::BreathingHoldProgram;
pub use lateral_turn::LateralTurnProgram;
pub use vertical_tilt::VerticalTiltProgram;

/// Internal lifecycle state of a program.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgramState {
    /// Constructed, collaborators not yet verified.
    Idle,
    /// Collaborators verified, pipeline not started.
    Ready,
    /// Pipeline running.
    Running,
    /// Paused by the user.
    Paused,
    /// Pipeline finished (naturally or stopped).
    Completed,
    /// Pipeline aborted on error.
    Error,
}

/// Whether a pipeline stage should proceed or the run was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Continue with the next stage.
    Proceed,
    /// Cancellation fired; unwind quietly.
    Cancelled,
}

/// One posture-coaching exercise program.
///
/// Implementations are driven by the orchestrator: `initialize`, then
/// `run` on a background task, with `pause`/`resume`/`stop` arriving
/// concurrently and `cleanup` guaranteed on every exit path.
#[async_trait]
pub trait ExerciseProgram: Send + Sync {
    /// Which program this is.
    fn id(&self) -> ProgramId;

    /// Current internal lifecycle state.
    fn state(&self) -> ProgramState;

    /// Count of live timers and audio loops held by the program.
    fn active_resources(&self) -> usize;

    /// Verify collaborators and prepare to run.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotReady` when the pose source or cue player is
    /// not initialized.
    async fn initialize(&self) -> Result<()>;

    /// Run the full stage pipeline to completion, stop, or error.
    ///
    /// # Errors
    ///
    /// Propagates the first stage failure after local cleanup.
    async fn run(&self) -> Result<SessionResult>;

    /// Best-effort pause; a no-op outside an active hold.
    async fn pause(&self);

    /// Best-effort resume.
    async fn resume(&self);

    /// Abandon the pipeline. Idempotent.
    async fn stop(&self);

    /// Release timers, audio, and the baseline. Idempotent; never fails.
    async fn cleanup(&self);
}

/// Construct the program for an id, wiring the shared collaborators.
#[must_use]
pub fn build(
    id: ProgramId,
    pose: Arc<dyn PoseSource>,
    cues: Arc<dyn CuePlayer>,
    config: Arc<CoachConfig>,
) -> Arc<dyn ExerciseProgram> {
    match id {
        ProgramId::LateralTurn => Arc::new(LateralTurnProgram::new(pose, cues, config)),
        ProgramId::VerticalTilt => Arc::new(VerticalTiltProgram::new(pose, cues, config)),
        ProgramId::BreathingHold => Arc::new(BreathingHoldProgram::new(pose, cues, config)),
    }
}

/// Collaborators and control state shared by every program.
pub(crate) struct ProgramCore {
    pub(crate) pose: Arc<dyn PoseSource>,
    pub(crate) cues: Arc<dyn CuePlayer>,
    pub(crate) config: Arc<CoachConfig>,
    pub(crate) cancel: CancellationToken,
    state: Mutex<ProgramState>,
    paused: AtomicBool,
    baseline: Mutex<Option<Baseline>>,
    resources: AtomicUsize,
}

impl ProgramCore {
    pub(crate) fn new(
        pose: Arc<dyn PoseSource>,
        cues: Arc<dyn CuePlayer>,
        config: Arc<CoachConfig>,
    ) -> Self {
        Self {
            pose,
            cues,
            config,
            cancel: CancellationToken::new(),
            state: Mutex::new(ProgramState::Idle),
            paused: AtomicBool::new(false),
            baseline: Mutex::new(None),
            resources: AtomicUsize::new(0),
        }
    }

    pub(crate) fn state(&self) -> ProgramState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, next: ProgramState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Verify both collaborators are initialized.
    pub(crate) fn ensure_ready(&self) -> Result<()> {
        if !self.pose.is_ready() {
            return Err(AppError::NotReady("pose source not ready".into()));
        }
        if !self.cues.is_ready() {
            return Err(AppError::NotReady("cue player not ready".into()));
        }
        Ok(())
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Flag a user pause and reflect it in the program state.
    pub(crate) fn mark_paused(&self) {
        if self.state() == ProgramState::Running {
            self.set_state(ProgramState::Paused);
        }
        self.set_paused(true);
    }

    /// Clear a user pause and reflect it in the program state.
    pub(crate) fn mark_resumed(&self) {
        self.set_paused(false);
        if self.state() == ProgramState::Paused {
            self.set_state(ProgramState::Running);
        }
    }

    /// Hold here while the user has the session paused.
    ///
    /// Polls at 50 ms; pauses land between phases, never mid-hold, so the
    /// coarse poll is invisible to the user.
    pub(crate) async fn wait_while_paused(&self) {
        while self.paused.load(Ordering::SeqCst) {
            tokio::select! {
                () = self.cancel.cancelled() => return,
                () = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }
    }

    /// Play a scripted cue sequence, each cue awaited to completion.
    ///
    /// # Errors
    ///
    /// Propagates the first playback failure.
    pub(crate) async fn play_cues(&self, cues: &[Cue]) -> Result<Flow> {
        for cue in cues {
            self.wait_while_paused().await;
            if self.cancel.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
            tokio::select! {
                () = self.cancel.cancelled() => return Ok(Flow::Cancelled),
                res = self.cues.play(*cue) => res?,
            }
        }
        Ok(Flow::Proceed)
    }

    /// Cancellable fixed delay (the meditation stabilization pause).
    pub(crate) async fn delay(&self, duration: Duration) -> Flow {
        tokio::select! {
            () = self.cancel.cancelled() => Flow::Cancelled,
            () = tokio::time::sleep(duration) => Flow::Proceed,
        }
    }

    pub(crate) fn set_baseline(&self, baseline: Baseline) {
        *self
            .baseline
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(baseline);
    }

    pub(crate) fn baseline_metric(&self) -> Option<f64> {
        self.baseline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Baseline::metric)
    }

    pub(crate) fn resource_acquired(&self) {
        self.resources.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn resource_released(&self) {
        let _ = self
            .resources
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub(crate) fn active_resources(&self) -> usize {
        self.resources.load(Ordering::SeqCst)
    }

    /// Release everything the program may hold. Each step is individually
    /// guarded so one failure cannot block the rest; safe to call twice.
    pub(crate) async fn release_all(&self) {
        self.cancel.cancel();
        if let Err(err) = self.cues.stop_all().await {
            warn!(%err, "cue release failed during cleanup");
        }
        *self
            .baseline
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.resources.store(0, Ordering::SeqCst);
    }
}
