//! Unit tests for configuration parsing, defaults, and validation.

use std::io::Write;

use posture_coach::config::CoachConfig;
use posture_coach::AppError;

#[test]
fn empty_toml_yields_the_field_defaults() {
    let config = CoachConfig::from_toml_str("").expect("empty config is valid");
    assert_eq!(config.max_reps, 7);
    assert!((config.min_confidence - 0.5).abs() < 1e-9);
    assert!((config.thresholds.turn_ratio_change - 0.15).abs() < 1e-9);
    assert!((config.thresholds.tilt_change - 0.005).abs() < 1e-9);
    assert!((config.thresholds.posture_deviation - 0.05).abs() < 1e-9);
    assert_eq!(config.timing.hold_ms, 3000);
    assert_eq!(config.timing.grace_ms, 2000);
    assert_eq!(config.timing.gate_sample_ms, 100);
    assert_eq!(config.timing.watchdog_ms, 200);
    assert_eq!(config.timing.clock_tick_ms, 1000);
    assert_eq!(config.timing.stabilization_ms, 2000);
    assert_eq!(config.timing.meditation_target_ms, 180_000);
}

#[test]
fn default_impl_matches_empty_toml() {
    let parsed = CoachConfig::from_toml_str("").expect("valid");
    assert_eq!(parsed, CoachConfig::default());
}

#[test]
fn overrides_replace_defaults_only_where_given() {
    let toml = r"
max_reps = 3

[timing]
hold_ms = 500

[thresholds]
turn_ratio_change = 0.2
";
    let config = CoachConfig::from_toml_str(toml).expect("valid");
    assert_eq!(config.max_reps, 3);
    assert_eq!(config.timing.hold_ms, 500);
    assert_eq!(config.timing.grace_ms, 2000);
    assert!((config.thresholds.turn_ratio_change - 0.2).abs() < 1e-9);
    assert!((config.thresholds.tilt_change - 0.005).abs() < 1e-9);
}

#[test]
fn zero_reps_fails_validation() {
    let result = CoachConfig::from_toml_str("max_reps = 0");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn out_of_range_confidence_fails_validation() {
    for toml in ["min_confidence = 0.0", "min_confidence = 1.5"] {
        let result = CoachConfig::from_toml_str(toml);
        assert!(matches!(result, Err(AppError::Config(_))), "for {toml}");
    }
}

#[test]
fn non_positive_threshold_fails_validation() {
    let result = CoachConfig::from_toml_str("[thresholds]\ntilt_change = 0.0");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn zero_cadence_fails_validation() {
    let result = CoachConfig::from_toml_str("[timing]\nwatchdog_ms = 0");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn malformed_toml_reports_a_config_error() {
    let result = CoachConfig::from_toml_str("max_reps = [");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn load_from_path_reads_a_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "max_reps = 2").expect("write config");

    let config = CoachConfig::load_from_path(file.path()).expect("valid file");
    assert_eq!(config.max_reps, 2);
}

#[test]
fn load_from_missing_path_reports_a_config_error() {
    let result = CoachConfig::load_from_path("/nonexistent/coach.toml");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn duration_accessors_reflect_the_millisecond_fields() {
    let config = CoachConfig::default();
    assert_eq!(config.timing.hold().as_millis(), 3000);
    assert_eq!(config.timing.grace().as_millis(), 2000);
    assert_eq!(config.timing.gate_sample().as_millis(), 100);
    assert_eq!(config.timing.watchdog().as_millis(), 200);
    assert_eq!(config.timing.clock_tick().as_millis(), 1000);
    assert_eq!(config.timing.meditation_target().as_secs(), 180);
}
