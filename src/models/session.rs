//! Session model, lifecycle state machine, and result types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one of the three built-in exercise programs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProgramId {
    /// Left/right head-turn repetitions.
    LateralTurn,
    /// Up/down head-tilt repetitions.
    VerticalTilt,
    /// Breathing-hold meditation with posture watchdog.
    BreathingHold,
}

impl std::fmt::Display for ProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LateralTurn => "lateral_turn",
            Self::VerticalTilt => "vertical_tilt",
            Self::BreathingHold => "breathing_hold",
        };
        write!(f, "{name}")
    }
}

/// Top-level lifecycle state of the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session active.
    Idle,
    /// Program selected, collaborators being wired.
    Initializing,
    /// Program pipeline running.
    Running,
    /// Session paused by the user.
    Paused,
    /// Program pipeline finished.
    Completed,
    /// Program pipeline aborted on error.
    Error,
}

impl SessionState {
    /// Determine whether a lifecycle transition is permitted.
    ///
    /// Requests outside this table are rejected by the orchestrator:
    /// logged, no error, state unchanged.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Initializing)
                | (Self::Initializing, Self::Running | Self::Error)
                | (Self::Running, Self::Paused | Self::Completed | Self::Error)
                | (Self::Paused, Self::Running | Self::Completed | Self::Error)
                | (Self::Completed | Self::Error, Self::Idle)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// A single coaching session. At most one live session per orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Program this session runs.
    pub program_id: ProgramId,
    /// Current lifecycle state (mirrors the orchestrator FSM).
    pub state: SessionState,
    /// Session start timestamp.
    pub started_at: DateTime<Utc>,
    /// Session end timestamp, set on completion or error.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Construct a new session for the given program with a generated id.
    #[must_use]
    pub fn new(program_id: ProgramId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            program_id,
            state: SessionState::Initializing,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// Program-specific half of a session result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramOutcome {
    /// Outcome of a repetition-based program (lateral turn, vertical tilt).
    Repetition {
        /// Repetitions fully completed (both phases confirmed).
        completed_reps: u32,
        /// Sum of hold durations, measured from start-of-hold to
        /// confirmation — not phase wall time.
        total_hold: Duration,
    },
    /// Outcome of the breathing-hold meditation program.
    Meditation {
        /// Correction episodes entered.
        deviation_count: u32,
        /// Total time spent inside correction episodes.
        total_correction: Duration,
    },
}

/// Exit contract of a program run, consumed by downstream persistence and
/// analytics layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    /// When the program pipeline started.
    pub started_at: DateTime<Utc>,
    /// When the program pipeline ended.
    pub ended_at: DateTime<Utc>,
    /// Whether the program ran to natural completion.
    pub completed: bool,
    /// Error marker when the session failed mid-way.
    pub error: Option<String>,
    /// Program-specific counters.
    pub outcome: ProgramOutcome,
}

impl SessionResult {
    /// Short human-readable summary for the completion event.
    #[must_use]
    pub fn summary(&self) -> String {
        if let Some(ref err) = self.error {
            return format!("session failed: {err}");
        }
        match self.outcome {
            ProgramOutcome::Repetition {
                completed_reps,
                total_hold,
            } => format!(
                "{} of session complete: {completed_reps} repetitions, {:.1}s held",
                if self.completed { "all" } else { "part" },
                total_hold.as_secs_f64()
            ),
            ProgramOutcome::Meditation {
                deviation_count,
                total_correction,
            } => format!(
                "meditation {}: {deviation_count} posture corrections, {:.1}s correcting",
                if self.completed { "complete" } else { "stopped early" },
                total_correction.as_secs_f64()
            ),
        }
    }
}
