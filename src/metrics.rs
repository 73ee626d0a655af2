//! Pose metric extraction and hold predicates.
//!
//! All comparisons are relative changes against a calibration baseline.
//! The thresholds are empirical tuning constants supplied by
//! [`CoachConfig`](crate::config::CoachConfig), not derived values.

use crate::collab::Cue;
use crate::models::baseline::BaselineValue;
use crate::models::pose::{BodyPart, PoseSample};

/// Metric a program compares live samples against its baseline with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Ratio of the nose↔left-ear to nose↔right-ear distance. Turning the
    /// head left lengthens the left reference and shortens the right one,
    /// so the ratio rises; turning right lowers it.
    TurnRatio,
    /// Nose↔shoulder-midpoint distance. Tilting up lengthens it, tilting
    /// down shortens it.
    TiltDistance,
    /// Ear-midpoint↔shoulder-midpoint distance; shrinks when the user
    /// slouches. Used by the meditation posture watchdog.
    PostureHeight,
}

/// One confidence-qualified metric value extracted from a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricReading {
    /// The metric value.
    pub value: f64,
    /// Minimum confidence across the landmarks involved.
    pub confidence: f64,
}

fn midpoint(sample: &PoseSample, a: BodyPart, b: BodyPart) -> Option<(f64, f64, f64)> {
    let la = sample.landmark(a)?;
    let lb = sample.landmark(b)?;
    Some((
        (la.x + lb.x) / 2.0,
        (la.y + lb.y) / 2.0,
        la.confidence.min(lb.confidence),
    ))
}

fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

/// Extract a metric reading from a sample.
///
/// Returns `None` when a required landmark is missing or the geometry is
/// degenerate (a zero reference distance).
#[must_use]
pub fn read_metric(kind: MetricKind, sample: &PoseSample) -> Option<MetricReading> {
    match kind {
        MetricKind::TurnRatio => {
            let nose = sample.landmark(BodyPart::Nose)?;
            let left = sample.landmark(BodyPart::LeftEar)?;
            let right = sample.landmark(BodyPart::RightEar)?;
            let left_dist = nose.distance_to(left);
            let right_dist = nose.distance_to(right);
            if right_dist <= f64::EPSILON {
                return None;
            }
            Some(MetricReading {
                value: left_dist / right_dist,
                confidence: nose
                    .confidence
                    .min(left.confidence)
                    .min(right.confidence),
            })
        }
        MetricKind::TiltDistance => {
            let nose = sample.landmark(BodyPart::Nose)?;
            let (mx, my, mconf) =
                midpoint(sample, BodyPart::LeftShoulder, BodyPart::RightShoulder)?;
            Some(MetricReading {
                value: distance(nose.x, nose.y, mx, my),
                confidence: nose.confidence.min(mconf),
            })
        }
        MetricKind::PostureHeight => {
            let (ex, ey, econf) = midpoint(sample, BodyPart::LeftEar, BodyPart::RightEar)?;
            let (sx, sy, sconf) =
                midpoint(sample, BodyPart::LeftShoulder, BodyPart::RightShoulder)?;
            Some(MetricReading {
                value: distance(ex, ey, sx, sy),
                confidence: econf.min(sconf),
            })
        }
    }
}

/// Extract raw baseline value(s) for a metric from a sample.
///
/// Turn baselines keep the left/right distance pair; the other metrics are
/// plain scalars.
#[must_use]
pub fn baseline_value(kind: MetricKind, sample: &PoseSample) -> Option<BaselineValue> {
    match kind {
        MetricKind::TurnRatio => {
            let nose = sample.landmark(BodyPart::Nose)?;
            let left = sample.landmark(BodyPart::LeftEar)?;
            let right = sample.landmark(BodyPart::RightEar)?;
            let right_dist = nose.distance_to(right);
            if right_dist <= f64::EPSILON {
                return None;
            }
            Some(BaselineValue::PairedDistance {
                left: nose.distance_to(left),
                right: right_dist,
            })
        }
        MetricKind::TiltDistance | MetricKind::PostureHeight => {
            let reading = read_metric(kind, sample)?;
            Some(BaselineValue::Scalar {
                value: reading.value,
            })
        }
    }
}

/// Signed relative change of a live value against a baseline.
#[must_use]
pub fn relative_change(baseline: f64, live: f64) -> f64 {
    (live - baseline) / baseline
}

/// Directional hold target for the repetition programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldTarget {
    /// Head turned left: turn ratio up by at least the threshold.
    TurnLeft,
    /// Head turned right: turn ratio down by at least the threshold.
    TurnRight,
    /// Head tilted up: tilt distance up by at least the threshold.
    TiltUp,
    /// Head tilted down: tilt distance down by at least the threshold.
    TiltDown,
}

impl HoldTarget {
    /// Metric this target is evaluated on.
    #[must_use]
    pub fn metric(self) -> MetricKind {
        match self {
            Self::TurnLeft | Self::TurnRight => MetricKind::TurnRatio,
            Self::TiltUp | Self::TiltDown => MetricKind::TiltDistance,
        }
    }

    /// Directional cue announcing this target.
    #[must_use]
    pub fn cue(self) -> Cue {
        match self {
            Self::TurnLeft => Cue::TurnLeft,
            Self::TurnRight => Cue::TurnRight,
            Self::TiltUp => Cue::TiltUp,
            Self::TiltDown => Cue::TiltDown,
        }
    }
}

/// Whether a sample satisfies a directional hold target.
///
/// The sign of the relative change selects the direction; its magnitude
/// must meet `threshold`. A missing or low-confidence reading never
/// satisfies — the gate treats it as a reset, not an error.
#[must_use]
pub fn hold_satisfied(
    target: HoldTarget,
    baseline_metric: f64,
    sample: &PoseSample,
    threshold: f64,
    min_confidence: f64,
) -> bool {
    let Some(reading) = read_metric(target.metric(), sample) else {
        return false;
    };
    if reading.confidence < min_confidence {
        return false;
    }
    let change = relative_change(baseline_metric, reading.value);
    match target {
        HoldTarget::TurnLeft | HoldTarget::TiltUp => change >= threshold,
        HoldTarget::TurnRight | HoldTarget::TiltDown => change <= -threshold,
    }
}
