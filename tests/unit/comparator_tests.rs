//! Unit tests for metric extraction and the directional hold predicates.

use posture_coach::metrics::{
    baseline_value, hold_satisfied, read_metric, relative_change, HoldTarget, MetricKind,
};
use posture_coach::models::baseline::BaselineValue;
use posture_coach::models::pose::{BodyPart, Landmark, PoseSample};

/// Nose at the origin with ears at the given reference distances.
fn turn_pose(left: f64, right: f64, confidence: f64) -> PoseSample {
    PoseSample::new()
        .with_landmark(BodyPart::Nose, Landmark::new(0.0, 0.0, confidence))
        .with_landmark(BodyPart::LeftEar, Landmark::new(left, 0.0, confidence))
        .with_landmark(BodyPart::RightEar, Landmark::new(-right, 0.0, confidence))
}

/// Nose at the origin, shoulder midpoint at the given distance below it.
fn tilt_pose(distance: f64, confidence: f64) -> PoseSample {
    PoseSample::new()
        .with_landmark(BodyPart::Nose, Landmark::new(0.0, 0.0, confidence))
        .with_landmark(
            BodyPart::LeftShoulder,
            Landmark::new(-3.0, distance, confidence),
        )
        .with_landmark(
            BodyPart::RightShoulder,
            Landmark::new(3.0, distance, confidence),
        )
}

#[test]
fn turn_ratio_reads_left_over_right() {
    let sample = turn_pose(1.2, 1.0, 0.9);
    let reading = read_metric(MetricKind::TurnRatio, &sample).expect("reading");
    assert!((reading.value - 1.2).abs() < 1e-9);
    assert!((reading.confidence - 0.9).abs() < 1e-9);
}

#[test]
fn twenty_percent_ratio_rise_confirms_left_turn_only() {
    // Baseline ratio 1.0, live ratio 1.20: past the 15% threshold leftward.
    let sample = turn_pose(1.2, 1.0, 0.9);
    assert!(hold_satisfied(HoldTarget::TurnLeft, 1.0, &sample, 0.15, 0.5));
    assert!(!hold_satisfied(HoldTarget::TurnRight, 1.0, &sample, 0.15, 0.5));
}

#[test]
fn ratio_change_at_exact_threshold_still_confirms() {
    let sample = turn_pose(1.15, 1.0, 0.9);
    assert!(hold_satisfied(HoldTarget::TurnLeft, 1.0, &sample, 0.15, 0.5));
}

#[test]
fn ratio_drop_confirms_right_turn_only() {
    let sample = turn_pose(0.8, 1.0, 0.9);
    assert!(hold_satisfied(HoldTarget::TurnRight, 1.0, &sample, 0.15, 0.5));
    assert!(!hold_satisfied(HoldTarget::TurnLeft, 1.0, &sample, 0.15, 0.5));
}

#[test]
fn small_tilt_decrease_confirms_down_only() {
    // Baseline distance 100, live 99.4: a 0.6% decrease against the 0.5%
    // threshold.
    let sample = tilt_pose(99.4, 0.9);
    assert!(hold_satisfied(HoldTarget::TiltDown, 100.0, &sample, 0.005, 0.5));
    assert!(!hold_satisfied(HoldTarget::TiltUp, 100.0, &sample, 0.005, 0.5));
}

#[test]
fn sub_threshold_tilt_confirms_neither_direction() {
    let sample = tilt_pose(99.7, 0.9);
    assert!(!hold_satisfied(HoldTarget::TiltDown, 100.0, &sample, 0.005, 0.5));
    assert!(!hold_satisfied(HoldTarget::TiltUp, 100.0, &sample, 0.005, 0.5));
}

#[test]
fn low_confidence_reading_never_satisfies() {
    let sample = turn_pose(2.0, 1.0, 0.3);
    assert!(!hold_satisfied(HoldTarget::TurnLeft, 1.0, &sample, 0.15, 0.5));
}

#[test]
fn missing_landmarks_read_as_no_metric() {
    let empty = PoseSample::new();
    assert!(read_metric(MetricKind::TurnRatio, &empty).is_none());
    assert!(read_metric(MetricKind::TiltDistance, &empty).is_none());
    assert!(read_metric(MetricKind::PostureHeight, &empty).is_none());
}

#[test]
fn degenerate_right_reference_reads_as_no_metric() {
    // Right ear on top of the nose: zero reference distance.
    let sample = turn_pose(1.0, 0.0, 0.9);
    assert!(read_metric(MetricKind::TurnRatio, &sample).is_none());
}

#[test]
fn turn_baseline_keeps_the_distance_pair() {
    let sample = turn_pose(1.2, 1.0, 0.9);
    let value = baseline_value(MetricKind::TurnRatio, &sample).expect("baseline value");
    match value {
        BaselineValue::PairedDistance { left, right } => {
            assert!((left - 1.2).abs() < 1e-9);
            assert!((right - 1.0).abs() < 1e-9);
            assert!((value.metric() - 1.2).abs() < 1e-9);
        }
        BaselineValue::Scalar { .. } => panic!("turn baseline must keep the pair"),
    }
}

#[test]
fn relative_change_is_signed() {
    assert!((relative_change(50.0, 60.0) - 0.2).abs() < 1e-9);
    assert!((relative_change(100.0, 99.4) + 0.006).abs() < 1e-9);
}

#[test]
fn posture_height_is_ear_to_shoulder_midpoint_distance() {
    let sample = PoseSample::new()
        .with_landmark(BodyPart::LeftEar, Landmark::new(-1.0, 0.0, 0.9))
        .with_landmark(BodyPart::RightEar, Landmark::new(1.0, 0.0, 0.9))
        .with_landmark(BodyPart::LeftShoulder, Landmark::new(-1.0, 50.0, 0.9))
        .with_landmark(BodyPart::RightShoulder, Landmark::new(1.0, 50.0, 0.9));
    let reading = read_metric(MetricKind::PostureHeight, &sample).expect("reading");
    assert!((reading.value - 50.0).abs() < 1e-9);
}
