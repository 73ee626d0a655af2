//! Vertical head-tilt repetition program.

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
    id: ProgramId::VerticalTilt,
    intro_cues: &[Cue::Welcome, Cue::TiltIntro, Cue::CalibrationIntro],
    metric: MetricKind::TiltDistance,
    phases: [
        PhaseSpec {
            name: "tilt_up",
            target: HoldTarget::TiltUp,
            orientation_cue: Some(Cue::ChinLevel),
        },
        PhaseSpec {
            name: "tilt_down",
            target: HoldTarget::TiltDown,
            orientation_cue: Some(Cue::ChinLevel),
        },
    ],
};

/// Up/down head-tilt repetitions gated on the tilt-distance metric.
///
/// The tilt threshold is two orders of magnitude tighter than the turn
/// threshold: a 0.5% change of the nose↔shoulder distance is already a
/// visible tilt.
pub struct VerticalTiltProgram {
    core: ProgramCore,
}

impl VerticalTiltProgram {
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
impl ExerciseProgram for VerticalTiltProgram {
    fn id(&self) -> ProgramId {
        ProgramId::VerticalTilt
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
