//! Lateral head-turn repetition program.

use std::sync::Arc;

use async_trait::async_trait;

use crate::collab::{Cue, CuePlayer, PoseSource};
use crate::config::CoachConfig;
use crate::metrics::{HoldTarget, MetricKind};
use crate::models::session::{ProgramId, SessionResult};
use crate::programs::phase_runner::{run_repetition_pipeline, PhaseSpec, RepetitionPlan};
use crate::programs::{ExerciseProgram, ProgramCore, ProgramState};
use crate::Result;

const PLAN: RepetitionPlan = RepetitionPlan {
    id: ProgramId::LateralTurn,
    intro_cues: &[Cue::Welcome, Cue::TurnIntro, Cue::CalibrationIntro],
    metric: MetricKind::TurnRatio,
    phases: [
        PhaseSpec {
            name: "turn_left",
            target: HoldTarget::TurnLeft,
            orientation_cue: Some(Cue::FaceForward),
        },
        PhaseSpec {
            name: "turn_right",
            target: HoldTarget::TurnRight,
            orientation_cue: Some(Cue::FaceForward),
        },
    ],
};

/// Left/right head-turn repetitions gated on the turn-ratio metric.
pub struct LateralTurnProgram {
    core: ProgramCore,
}

impl LateralTurnProgram {
    /// Construct the program with its injected collaborators.
    #[must_use]
    pub fn new(
        pose: Arc<dyn PoseSource>,
        cues: Arc<dyn CuePlayer>,
        config: Arc<CoachConfig>,
    ) -> Self {
        Self {
            core: ProgramCore::new(pose, cues, config),
        }
    }
}

#[async_trait]
impl ExerciseProgram for LateralTurnProgram {
    fn id(&self) -> ProgramId {
        ProgramId::LateralTurn
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
        run_repetition_pipeline(&self.core, PLAN).await
    }

    async fn pause(&self) {
        self.core.mark_paused();
    }

    async fn resume(&self) {
        self.core.mark_resumed();
    }

    async fn stop(&self) {
        self.core.cancel.cancel();
    }

    async fn cleanup(&self) {
        self.core.release_all().await;
    }
}
