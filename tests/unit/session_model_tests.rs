//! Unit tests for the session model and lifecycle state machine.

use std::time::Duration;

use posture_coach::models::session::{
    ProgramId, ProgramOutcome, Session, SessionResult, SessionState,
};

use SessionState::{Completed, Error, Idle, Initializing, Paused, Running};

#[test]
fn transition_allow_list_accepts_lifecycle_paths() {
    let allowed = [
        (Idle, Initializing),
        (Initializing, Running),
        (Initializing, Error),
        (Running, Paused),
        (Running, Completed),
        (Running, Error),
        (Paused, Running),
        (Paused, Completed),
        (Paused, Error),
        (Completed, Idle),
        (Error, Idle),
    ];
    for (from, to) in allowed {
        assert!(
            from.can_transition_to(to),
            "expected {from} -> {to} to be allowed"
        );
    }
}

#[test]
fn transition_allow_list_rejects_everything_else() {
    let states = [Idle, Initializing, Running, Paused, Completed, Error];
    let allowed = [
        (Idle, Initializing),
        (Initializing, Running),
        (Initializing, Error),
        (Running, Paused),
        (Running, Completed),
        (Running, Error),
        (Paused, Running),
        (Paused, Completed),
        (Paused, Error),
        (Completed, Idle),
        (Error, Idle),
    ];
    for from in states {
        for to in states {
            let expected = allowed.contains(&(from, to));
            assert_eq!(
                from.can_transition_to(to),
                expected,
                "transition table mismatch for {from} -> {to}"
            );
        }
    }
}

#[test]
fn session_state_serializes_to_snake_case() {
    let json = serde_json::to_string(&Initializing).expect("serialize");
    assert_eq!(json, "\"initializing\"");
}

#[test]
fn program_id_round_trips_through_serde() {
    for id in [
        ProgramId::LateralTurn,
        ProgramId::VerticalTilt,
        ProgramId::BreathingHold,
    ] {
        let json = serde_json::to_string(&id).expect("serialize");
        let back: ProgramId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}

#[test]
fn program_id_rejects_unknown_value() {
    let result: Result<ProgramId, _> = serde_json::from_str("\"shoulder_roll\"");
    assert!(result.is_err(), "unknown program id should fail");
}

#[test]
fn new_session_starts_initializing_with_unique_id() {
    let a = Session::new(ProgramId::LateralTurn);
    let b = Session::new(ProgramId::LateralTurn);
    assert_eq!(a.state, Initializing);
    assert!(a.ended_at.is_none());
    assert_ne!(a.id, b.id);
}

#[test]
fn repetition_summary_reports_reps_and_hold() {
    let result = SessionResult {
        started_at: chrono::Utc::now(),
        ended_at: chrono::Utc::now(),
        completed: true,
        error: None,
        outcome: ProgramOutcome::Repetition {
            completed_reps: 7,
            total_hold: Duration::from_secs(21),
        },
    };
    let summary = result.summary();
    assert!(summary.contains('7'), "summary should mention reps: {summary}");
    assert!(summary.contains("21.0"), "summary should mention hold time: {summary}");
}

#[test]
fn failed_summary_carries_error_marker() {
    let result = SessionResult {
        started_at: chrono::Utc::now(),
        ended_at: chrono::Utc::now(),
        completed: false,
        error: Some("calibration failed: no confident pose".into()),
        outcome: ProgramOutcome::Meditation {
            deviation_count: 0,
            total_correction: Duration::ZERO,
        },
    };
    let summary = result.summary();
    assert!(
        summary.contains("calibration failed"),
        "summary should surface the error: {summary}"
    );
}
