//! Events emitted by the orchestrator for downstream consumers.
//!
//! Delivered on a `tokio::sync::mpsc` channel injected at construction —
//! UI and analytics subscribe to the channel instead of a global event
//! bus.

use chrono::{DateTime, Utc};

use crate::models::session::{ProgramId, SessionResult, SessionState};

/// Orchestrator lifecycle event.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A state-machine transition was accepted.
    StateChanged {
        /// Previous state.
        from: SessionState,
        /// New state.
        to: SessionState,
        /// Program of the session, when one is selected.
        program_id: Option<ProgramId>,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },
    /// The session finished — naturally, stopped, or failed. A failed
    /// session still emits this event with the error marker set in the
    /// result, so downstream state is never left ambiguously running.
    Completed {
        /// Program that ran.
        program_id: ProgramId,
        /// Exit contract for persistence/analytics.
        result: SessionResult,
        /// Short human-readable summary.
        message: String,
    },
}

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Program of the active session, if any.
    pub program_id: Option<ProgramId>,
    /// Whether a program instance is currently wired.
    pub has_active_program: bool,
    /// Timers and audio loops held by the active program.
    pub active_resources: usize,
}
