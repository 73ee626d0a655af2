//! Top-level session state machine and lifecycle management.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::collab::{CuePlayer, PoseSource};
use crate::config::CoachConfig;
use crate::models::session::{ProgramId, ProgramOutcome, Session, SessionResult, SessionState};
use crate::orchestrator::events::{SessionEvent, StateSnapshot};
use crate::programs::{self, ExerciseProgram};
use crate::{AppError, Result};

struct Inner {
    state: SessionState,
    session: Option<Session>,
    program: Option<Arc<dyn ExerciseProgram>>,
    pipeline: Option<JoinHandle<()>>,
}

/// State shared between the orchestrator's public surface and the
/// background pipeline task.
struct Shared {
    inner: Mutex<Inner>,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition_to(&self, to: SessionState) -> bool {
        let mut inner = self.lock_inner();
        self.apply_transition(&mut inner, to)
    }

    /// Transition only when the current state matches `from` exactly.
    fn transition_from(&self, from: SessionState, to: SessionState) -> bool {
        let mut inner = self.lock_inner();
        if inner.state != from {
            warn!(state = %inner.state, requested = %to, "state transition rejected");
            return false;
        }
        self.apply_transition(&mut inner, to)
    }

    /// Apply a transition under the lock; rejected requests are logged
    /// and leave state unchanged.
    fn apply_transition(&self, inner: &mut Inner, to: SessionState) -> bool {
        let from = inner.state;
        if !from.can_transition_to(to) {
            warn!(%from, %to, "state transition rejected");
            return false;
        }
        inner.state = to;
        if let Some(session) = inner.session.as_mut() {
            session.state = to;
            if matches!(to, SessionState::Completed | SessionState::Error) {
                session.ended_at = Some(Utc::now());
            }
        }
        let program_id = inner.session.as_ref().map(|s| s.program_id);
        if let Err(err) = self.event_tx.try_send(SessionEvent::StateChanged {
            from,
            to,
            program_id,
            timestamp: Utc::now(),
        }) {
            debug!(%err, "state event dropped");
        }
        true
    }

    /// Return to idle and release the session. Every step is guarded;
    /// calling this twice is safe.
    fn finish_to_idle(&self) {
        let mut inner = self.lock_inner();
        if inner.state != SessionState::Idle {
            self.apply_transition(&mut inner, SessionState::Idle);
        }
        inner.session = None;
        inner.program = None;
        inner.pipeline = None;
    }

    /// Completion-equivalent result for a session that failed mid-way.
    fn failed_result(&self, program_id: ProgramId, err: &AppError) -> SessionResult {
        let started_at = self
            .lock_inner()
            .session
            .as_ref()
            .map_or_else(Utc::now, |session| session.started_at);
        let outcome = match program_id {
            ProgramId::BreathingHold => ProgramOutcome::Meditation {
                deviation_count: 0,
                total_correction: Duration::ZERO,
            },
            ProgramId::LateralTurn | ProgramId::VerticalTilt => ProgramOutcome::Repetition {
                completed_reps: 0,
                total_hold: Duration::ZERO,
            },
        };
        SessionResult {
            started_at,
            ended_at: Utc::now(),
            completed: false,
            error: Some(err.to_string()),
            outcome,
        }
    }

    /// Run the program pipeline to its end and tear the session down.
    async fn drive(self: Arc<Self>, program: Arc<dyn ExerciseProgram>) {
        let program_id = program.id();
        let result = match program.run().await {
            Ok(result) => {
                self.transition_to(SessionState::Completed);
                result
            }
            Err(err) => {
                error!(%err, %program_id, "program pipeline failed");
                self.transition_to(SessionState::Error);
                self.failed_result(program_id, &err)
            }
        };

        let message = result.summary();
        info!(%program_id, completed = result.completed, %message, "session finished");
        if self
            .event_tx
            .send(SessionEvent::Completed {
                program_id,
                result,
                message,
            })
            .await
            .is_err()
        {
            debug!("completion event dropped, no receiver");
        }

        program.cleanup().await;
        self.finish_to_idle();
    }
}

/// Owns at most one active session and the top-level state machine.
///
/// The pose source and cue player are shared singletons injected here;
/// the single-active-session rule — not locking — is what prevents their
/// concurrent misuse.
pub struct SessionOrchestrator {
    pose: Arc<dyn PoseSource>,
    cues: Arc<dyn CuePlayer>,
    config: Arc<CoachConfig>,
    shared: Arc<Shared>,
}

impl SessionOrchestrator {
    /// Construct an idle orchestrator around the shared collaborators.
    #[must_use]
    pub fn new(
        pose: Arc<dyn PoseSource>,
        cues: Arc<dyn CuePlayer>,
        config: Arc<CoachConfig>,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            pose,
            cues,
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: SessionState::Idle,
                    session: None,
                    program: None,
                    pipeline: None,
                }),
                event_tx,
            }),
        }
    }

    /// Point-in-time state view.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.shared.lock_inner();
        StateSnapshot {
            state: inner.state,
            program_id: inner.session.as_ref().map(|s| s.program_id),
            has_active_program: inner.program.is_some(),
            active_resources: inner
                .program
                .as_ref()
                .map_or(0, |program| program.active_resources()),
        }
    }

    /// The active session, if any.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.shared.lock_inner().session.clone()
    }

    /// Start a session for the given program.
    ///
    /// The program pipeline runs on a background task; completion is
    /// reported as a [`SessionEvent::Completed`] on the event channel.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyRunning` when a session is active, or
    /// `AppError::NotReady` when a collaborator is not initialized; in
    /// both cases the orchestrator state is unchanged. Initialization
    /// failures propagate after best-effort cleanup.
    pub async fn start(&self, program_id: ProgramId) -> Result<()> {
        {
            let mut inner = self.shared.lock_inner();
            if inner.state != SessionState::Idle {
                return Err(AppError::AlreadyRunning(format!(
                    "session already active in state {}",
                    inner.state
                )));
            }
            if !self.pose.is_ready() {
                return Err(AppError::NotReady("pose source not ready".into()));
            }
            if !self.cues.is_ready() {
                return Err(AppError::NotReady("cue player not ready".into()));
            }
            inner.session = Some(Session::new(program_id));
            self.shared
                .apply_transition(&mut inner, SessionState::Initializing);
        }
        info!(%program_id, "session initializing");

        let program = programs::build(
            program_id,
            Arc::clone(&self.pose),
            Arc::clone(&self.cues),
            Arc::clone(&self.config),
        );

        if let Err(err) = program.initialize().await {
            error!(%err, %program_id, "program initialization failed");
            program.cleanup().await;
            self.shared.transition_to(SessionState::Error);
            self.shared.finish_to_idle();
            return Err(err);
        }

        {
            let mut inner = self.shared.lock_inner();
            inner.program = Some(Arc::clone(&program));
        }
        self.shared.transition_to(SessionState::Running);

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(shared.drive(program));
        self.shared.lock_inner().pipeline = Some(handle);
        Ok(())
    }

    /// Pause the running session: forwarded to the program, and all audio
    /// activity is suspended. Rejected (logged, no-op) outside `running`.
    pub async fn pause(&self) {
        if !self
            .shared
            .transition_from(SessionState::Running, SessionState::Paused)
        {
            return;
        }
        if let Some(program) = self.current_program() {
            program.pause().await;
        }
        if let Err(err) = self.cues.pause_all().await {
            warn!(%err, "audio pause failed");
        }
        info!("session paused");
    }

    /// Resume a paused session. Rejected (logged, no-op) outside `paused`.
    pub async fn resume(&self) {
        if !self
            .shared
            .transition_from(SessionState::Paused, SessionState::Running)
        {
            return;
        }
        if let Some(program) = self.current_program() {
            program.resume().await;
        }
        if let Err(err) = self.cues.resume_all().await {
            warn!(%err, "audio resume failed");
        }
        info!("session resumed");
    }

    /// Stop the active session and wait for its teardown. Idempotent —
    /// a second call finds the orchestrator idle and is a logged no-op.
    pub async fn stop(&self) {
        let (program, pipeline) = {
            let mut inner = self.shared.lock_inner();
            if inner.state == SessionState::Idle {
                warn!("stop requested while idle, transition rejected");
                return;
            }
            (inner.program.clone(), inner.pipeline.take())
        };
        info!("stopping session");

        if let Some(program) = program {
            program.stop().await;
        }
        if let Some(handle) = pipeline {
            // The pipeline task performs cleanup and returns the
            // orchestrator to idle as it unwinds.
            if let Err(err) = handle.await {
                warn!(%err, "pipeline task join failed");
                self.shared.finish_to_idle();
            }
        }
    }

    fn current_program(&self) -> Option<Arc<dyn ExerciseProgram>> {
        self.shared.lock_inner().program.clone()
    }
}
