//! Collaborator contracts consumed by the engine.
//!
//! The [`PoseSource`] and [`CuePlayer`] traits decouple the orchestration
//! core from camera/CV acquisition and audio playback. Both are injected
//! as `Arc` singletons at construction — never reached as globals — so
//! tests substitute fakes through the same seam the production wiring
//! uses.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::metrics::{self, MetricKind};
use crate::models::baseline::BaselineValue;
use crate::models::pose::PoseSample;
use crate::Result;

/// Audio cue identifiers the engine sequences.
///
/// Mapping a cue to an actual audio asset is the player's concern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Session greeting.
    Welcome,
    /// Lateral-turn exercise introduction.
    TurnIntro,
    /// Vertical-tilt exercise introduction.
    TiltIntro,
    /// Breathing/meditation introduction.
    BreathingIntro,
    /// "Sit straight and hold still" calibration instruction.
    CalibrationIntro,
    /// "Turn your head to the left."
    TurnLeft,
    /// "Turn your head to the right."
    TurnRight,
    /// "Tilt your head up."
    TiltUp,
    /// "Tilt your head down."
    TiltDown,
    /// First-repetition orientation: "return to face forward".
    FaceForward,
    /// First-repetition orientation: "bring your chin level".
    ChinLevel,
    /// Short confirmation tone after a hold is accepted.
    ConfirmTone,
    /// Looping posture-correction reminder during meditation.
    PostureReminder,
    /// Session completion message.
    SessionComplete,
}

impl std::fmt::Display for Cue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Welcome => "welcome",
            Self::TurnIntro => "turn_intro",
            Self::TiltIntro => "tilt_intro",
            Self::BreathingIntro => "breathing_intro",
            Self::CalibrationIntro => "calibration_intro",
            Self::TurnLeft => "turn_left",
            Self::TurnRight => "turn_right",
            Self::TiltUp => "tilt_up",
            Self::TiltDown => "tilt_down",
            Self::FaceForward => "face_forward",
            Self::ChinLevel => "chin_level",
            Self::ConfirmTone => "confirm_tone",
            Self::PostureReminder => "posture_reminder",
            Self::SessionComplete => "session_complete",
        };
        write!(f, "{name}")
    }
}

/// Boxed future returned by [`CuePlayer`] operations.
pub type CueFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Source of live pose samples.
///
/// Implementations wrap the camera/CV pipeline; a read returns the most
/// recent frame's landmarks, or `None` when no body is detected.
pub trait PoseSource: Send + Sync {
    /// Whether the source is initialized and producing frames.
    fn is_ready(&self) -> bool;

    /// The most recent pose sample, if a body is currently detected.
    fn current_pose(&self) -> Option<PoseSample>;

    /// One instantaneous baseline reading for the given metric.
    ///
    /// The calibration stage owns settling, windowing, and averaging; this
    /// method only extracts the raw value(s) from the current pose.
    fn capture_baseline(&self, kind: MetricKind) -> Option<BaselineValue> {
        let sample = self.current_pose()?;
        metrics::baseline_value(kind, &sample)
    }
}

/// Audio cue playback collaborator.
///
/// `play` resolves when playback of the cue finishes, which is what makes
/// cue stages awaitable suspension points.
pub trait CuePlayer: Send + Sync {
    /// Whether the player is initialized and able to play cues.
    fn is_ready(&self) -> bool;

    /// Play a cue to completion.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Cue`](crate::AppError::Cue) if playback fails.
    fn play(&self, cue: Cue) -> CueFuture<'_>;

    /// Start looping a cue until [`stop_loop`](Self::stop_loop) is called.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Cue`](crate::AppError::Cue) if playback fails.
    fn start_loop(&self, cue: Cue) -> CueFuture<'_>;

    /// Stop the looping cue, if any. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Cue`](crate::AppError::Cue) if the player
    /// rejects the request.
    fn stop_loop(&self) -> CueFuture<'_>;

    /// Suspend all audio activity.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Cue`](crate::AppError::Cue) if the player
    /// rejects the request.
    fn pause_all(&self) -> CueFuture<'_>;

    /// Resume previously suspended audio activity.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Cue`](crate::AppError::Cue) if the player
    /// rejects the request.
    fn resume_all(&self) -> CueFuture<'_>;

    /// Stop all audio activity, including loops. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Cue`](crate::AppError::Cue) if the player
    /// rejects the request.
    fn stop_all(&self) -> CueFuture<'_>;
}
