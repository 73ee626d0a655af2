//! Error types shared across the engine.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
///
/// Rejected state-machine transitions are deliberately absent: they are
/// logged no-ops, not errors.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// A required collaborator (pose source, cue player) is not initialized.
    NotReady(String),
    /// A session is already active on this orchestrator.
    AlreadyRunning(String),
    /// No pose sample reached minimum confidence within the capture window.
    CalibrationFailed(String),
    /// Cue playback or loop control failure.
    Cue(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::NotReady(msg) => write!(f, "not ready: {msg}"),
            Self::AlreadyRunning(msg) => write!(f, "already running: {msg}"),
            Self::CalibrationFailed(msg) => write!(f, "calibration failed: {msg}"),
            Self::Cue(msg) => write!(f, "cue: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
