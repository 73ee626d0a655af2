//! Generic phase loop shared by the repetition-based programs.
//!
//! A repetition is two directional phases; a phase is directional cue →
//! pose gate → confirmation tone, with an extra orientation cue on the
//! first repetition only. The two programs supply nothing but their phase
//! table and threshold.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::calibration::CalibrationStage;
use crate::collab::Cue;
use crate::config::CoachConfig;
use crate::gate::PoseGate;
use crate::metrics::{self, HoldTarget, MetricKind};
use crate::models::session::{ProgramId, ProgramOutcome, SessionResult};
use crate::programs::{Flow, ProgramCore, ProgramState};
use crate::{AppError, Result};

/// Everything that distinguishes one repetition-based program from the
/// other: the programs themselves carry no control flow.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RepetitionPlan {
    /// Program identity.
    pub id: ProgramId,
    /// Scripted cue stage played before calibration.
    pub intro_cues: &'static [Cue],
    /// Metric the baseline and hold predicates are evaluated on.
    pub metric: MetricKind,
    /// The two directional phases of each repetition.
    pub phases: [PhaseSpec; 2],
}

impl RepetitionPlan {
    /// Hold threshold for this plan's metric.
    pub(crate) fn threshold(&self, config: &CoachConfig) -> f64 {
        match self.metric {
            MetricKind::TurnRatio => config.thresholds.turn_ratio_change,
            MetricKind::TiltDistance | MetricKind::PostureHeight => {
                config.thresholds.tilt_change
            }
        }
    }
}

/// Full pipeline of a repetition-based program: cues → snapshot
/// calibration → phase loop → completion cue.
///
/// Stage errors mark the program `Error`, run local cleanup, and
/// propagate; a stop mid-pipeline resolves with `completed = false`.
pub(crate) async fn run_repetition_pipeline(
    core: &ProgramCore,
    plan: RepetitionPlan,
) -> Result<SessionResult> {
    let started_at = Utc::now();
    core.set_state(ProgramState::Running);
    info!(program = %plan.id, "repetition pipeline started");

    match repetition_stages(core, plan).await {
        Ok((outcome, completed)) => {
            core.set_state(ProgramState::Completed);
            Ok(SessionResult {
                started_at,
                ended_at: Utc::now(),
                completed,
                error: None,
                outcome,
            })
        }
        Err(err) => {
            core.set_state(ProgramState::Error);
            core.release_all().await;
            Err(err)
        }
    }
}

async fn repetition_stages(
    core: &ProgramCore,
    plan: RepetitionPlan,
) -> Result<(ProgramOutcome, bool)> {
    let stopped = ProgramOutcome::Repetition {
        completed_reps: 0,
        total_hold: Duration::ZERO,
    };

    if core.play_cues(plan.intro_cues).await? == Flow::Cancelled {
        return Ok((stopped, false));
    }

    let calibration = CalibrationStage::new(Arc::clone(&core.pose), Arc::clone(&core.config));
    let Some(baseline) = calibration.capture_snapshot(plan.metric, &core.cancel).await? else {
        return Ok((stopped, false));
    };
    core.set_baseline(baseline);

    let rep = run_rep_loop(core, plan.threshold(&core.config), plan.phases).await?;
    let outcome = ProgramOutcome::Repetition {
        completed_reps: rep.completed_reps,
        total_hold: rep.total_hold,
    };

    if rep.completed && core.play_cues(&[Cue::SessionComplete]).await? == Flow::Cancelled {
        return Ok((outcome, false));
    }

    Ok((outcome, rep.completed))
}

/// One directional sub-step of a repetition.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PhaseSpec {
    /// Phase name for logging.
    pub name: &'static str,
    /// Directional hold target; also selects the directional cue.
    pub target: HoldTarget,
    /// Extra orientation cue played after the first-repetition tone.
    pub orientation_cue: Option<Cue>,
}

/// Accumulated result of a repetition loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RepLoopOutcome {
    /// Repetitions with both phases confirmed.
    pub completed_reps: u32,
    /// Summed start-of-hold→confirmation durations.
    pub total_hold: Duration,
    /// Whether all repetitions ran (false when stopped mid-loop).
    pub completed: bool,
}

/// Run `max_reps` repetitions over the two phases.
///
/// Resolves early with `completed = false` when the program is stopped;
/// any stage error halts the loop and propagates.
pub(crate) async fn run_rep_loop(
    core: &ProgramCore,
    threshold: f64,
    phases: [PhaseSpec; 2],
) -> Result<RepLoopOutcome> {
    let baseline_metric = core.baseline_metric().ok_or_else(|| {
        AppError::CalibrationFailed("baseline missing before repetition loop".into())
    })?;
    let gate = PoseGate::new(Arc::clone(&core.pose), core.config.timing.gate_sample());

    let mut outcome = RepLoopOutcome {
        completed_reps: 0,
        total_hold: Duration::ZERO,
        completed: false,
    };

    for rep in 1..=core.config.max_reps {
        let mut rep_hold = Duration::ZERO;
        for spec in &phases {
            match run_phase(core, &gate, baseline_metric, threshold, spec, rep == 1).await? {
                Some(held) => rep_hold += held,
                None => return Ok(outcome),
            }
        }
        outcome.completed_reps += 1;
        outcome.total_hold += rep_hold;
        info!(rep, held_ms = rep_hold.as_millis(), "repetition complete");
    }

    outcome.completed = true;
    Ok(outcome)
}

/// Run one phase: cue, gate, tone, optional first-rep orientation cue.
///
/// Returns the confirmed hold duration, or `None` when abandoned.
async fn run_phase(
    core: &ProgramCore,
    gate: &PoseGate,
    baseline_metric: f64,
    threshold: f64,
    spec: &PhaseSpec,
    first_rep: bool,
) -> Result<Option<Duration>> {
    core.wait_while_paused().await;
    if core.cancel.is_cancelled() {
        return Ok(None);
    }

    debug!(phase = spec.name, "phase started");
    tokio::select! {
        () = core.cancel.cancelled() => return Ok(None),
        res = core.cues.play(spec.target.cue()) => res?,
    }

    let min_confidence = core.config.min_confidence;
    let target = spec.target;
    core.resource_acquired();
    let confirmation = gate
        .watch(
            move |sample| {
                metrics::hold_satisfied(target, baseline_metric, sample, threshold, min_confidence)
            },
            core.config.timing.hold(),
            &core.cancel,
        )
        .await;
    core.resource_released();

    let Some(confirmation) = confirmation else {
        return Ok(None);
    };

    tokio::select! {
        () = core.cancel.cancelled() => return Ok(None),
        res = core.cues.play(Cue::ConfirmTone) => res?,
    }

    if first_rep {
        if let Some(cue) = spec.orientation_cue {
            tokio::select! {
                () = core.cancel.cancelled() => return Ok(None),
                res = core.cues.play(cue) => res?,
            }
        }
    }

    debug!(phase = spec.name, held_ms = confirmation.held_for().as_millis(), "phase confirmed");
    Ok(Some(confirmation.held_for()))
}
