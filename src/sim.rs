//! Simulated collaborators for running the engine without hardware.
//!
//! The simulated pose source holds a neutral pose through the intro and
//! calibration window, then sweeps through the posture variants so every
//! directional gate eventually sees a sustained compliant stretch. The
//! console cue player narrates cues to the log with nominal durations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

use crate::collab::{Cue, CueFuture, CuePlayer, PoseSource};
use crate::models::pose::{BodyPart, Landmark, PoseSample};

#[derive(Debug, Clone, Copy)]
enum Stance {
    Neutral,
    TurnedLeft,
    TurnedRight,
    TiltedUp,
    TiltedDown,
    Slouched,
}

/// Sweep order. Neutral spacers keep the posture watchdog quiet between
/// variants; the slouch dwell outlasts the correction grace window.
const SWEEP: [Stance; 10] = [
    Stance::Neutral,
    Stance::TurnedLeft,
    Stance::Neutral,
    Stance::TurnedRight,
    Stance::Neutral,
    Stance::TiltedUp,
    Stance::Neutral,
    Stance::TiltedDown,
    Stance::Slouched,
    Stance::Neutral,
];

fn pose_for(stance: Stance) -> PoseSample {
    let mut nose = (0.50, 0.35);
    let mut shoulder_y = 0.62;
    match stance {
        Stance::Neutral => {}
        Stance::TurnedLeft => nose.0 = 0.54,
        Stance::TurnedRight => nose.0 = 0.46,
        Stance::TiltedUp => nose.1 = 0.31,
        Stance::TiltedDown => nose.1 = 0.39,
        Stance::Slouched => shoulder_y = 0.56,
    }
    PoseSample::new()
        .with_landmark(BodyPart::Nose, Landmark::new(nose.0, nose.1, 0.95))
        .with_landmark(BodyPart::LeftEar, Landmark::new(0.42, 0.36, 0.95))
        .with_landmark(BodyPart::RightEar, Landmark::new(0.58, 0.36, 0.95))
        .with_landmark(BodyPart::LeftShoulder, Landmark::new(0.40, shoulder_y, 0.95))
        .with_landmark(BodyPart::RightShoulder, Landmark::new(0.60, shoulder_y, 0.95))
}

/// Pose source that sweeps through scripted stances on a fixed dwell.
pub struct SimulatedPoseSource {
    started: Instant,
    neutral_hold: Duration,
    dwell: Duration,
}

impl SimulatedPoseSource {
    /// Neutral for 15 s (intro cues + calibration), then 5 s per stance.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timing(Duration::from_secs(15), Duration::from_secs(5))
    }

    /// Source with custom neutral-hold and dwell durations.
    #[must_use]
    pub fn with_timing(neutral_hold: Duration, dwell: Duration) -> Self {
        Self {
            started: Instant::now(),
            neutral_hold,
            dwell,
        }
    }
}

impl Default for SimulatedPoseSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseSource for SimulatedPoseSource {
    fn is_ready(&self) -> bool {
        true
    }

    fn current_pose(&self) -> Option<PoseSample> {
        let elapsed = self.started.elapsed();
        let stance = if elapsed < self.neutral_hold {
            Stance::Neutral
        } else {
            let since_sweep = elapsed - self.neutral_hold;
            let slot = since_sweep.as_millis() / self.dwell.as_millis().max(1);
            #[allow(clippy::cast_possible_truncation)] // bounded by SWEEP.len()
            let index = (slot % SWEEP.len() as u128) as usize;
            SWEEP[index]
        };
        Some(pose_for(stance))
    }
}

/// Cue player that narrates playback to the log.
pub struct ConsoleCuePlayer {
    looping: Mutex<Option<Cue>>,
    paused: AtomicBool,
}

impl ConsoleCuePlayer {
    /// Construct a ready player.
    #[must_use]
    pub fn new() -> Self {
        Self {
            looping: Mutex::new(None),
            paused: AtomicBool::new(false),
        }
    }

    fn nominal_duration(cue: Cue) -> Duration {
        match cue {
            Cue::ConfirmTone => Duration::from_millis(300),
            _ => Duration::from_millis(1200),
        }
    }
}

impl Default for ConsoleCuePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl CuePlayer for ConsoleCuePlayer {
    fn is_ready(&self) -> bool {
        true
    }

    fn play(&self, cue: Cue) -> CueFuture<'_> {
        Box::pin(async move {
            info!(%cue, "♪ cue");
            tokio::time::sleep(Self::nominal_duration(cue)).await;
            Ok(())
        })
    }

    fn start_loop(&self, cue: Cue) -> CueFuture<'_> {
        Box::pin(async move {
            info!(%cue, "♪ cue loop started");
            *self.looping.lock().unwrap_or_else(PoisonError::into_inner) = Some(cue);
            Ok(())
        })
    }

    fn stop_loop(&self) -> CueFuture<'_> {
        Box::pin(async move {
            let stopped = self
                .looping
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(cue) = stopped {
                info!(%cue, "♪ cue loop stopped");
            }
            Ok(())
        })
    }

    fn pause_all(&self) -> CueFuture<'_> {
        Box::pin(async move {
            self.paused.store(true, Ordering::SeqCst);
            info!("♪ audio paused");
            Ok(())
        })
    }

    fn resume_all(&self) -> CueFuture<'_> {
        Box::pin(async move {
            self.paused.store(false, Ordering::SeqCst);
            info!("♪ audio resumed");
            Ok(())
        })
    }

    fn stop_all(&self) -> CueFuture<'_> {
        Box::pin(async move {
            self.paused.store(false, Ordering::SeqCst);
            let stopped = self
                .looping
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(cue) = stopped {
                info!(%cue, "♪ cue loop stopped");
            }
            Ok(())
        })
    }
}
