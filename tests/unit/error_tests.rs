//! Unit tests for the error enumeration.

use posture_coach::AppError;

#[test]
fn display_prefixes_the_failure_domain() {
    let cases = [
        (AppError::Config("bad value".into()), "config: bad value"),
        (
            AppError::NotReady("pose source not ready".into()),
            "not ready: pose source not ready",
        ),
        (
            AppError::AlreadyRunning("session active".into()),
            "already running: session active",
        ),
        (
            AppError::CalibrationFailed("no confident pose".into()),
            "calibration failed: no confident pose",
        ),
        (AppError::Cue("playback device lost".into()), "cue: playback device lost"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn toml_errors_convert_to_config_errors() {
    let toml_err = toml::from_str::<toml::Value>("=").expect_err("invalid toml");
    let err: AppError = toml_err.into();
    assert!(matches!(err, AppError::Config(_)));
    assert!(err.to_string().starts_with("config:"));
}

#[test]
fn errors_implement_std_error() {
    let err: Box<dyn std::error::Error> = Box::new(AppError::Cue("gone".into()));
    assert!(err.source().is_none());
}
