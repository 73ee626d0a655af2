//! Engine configuration parsing and validation.
//!
//! Every threshold and cadence in this file is an empirical tuning value
//! carried over from field use; they are defaults, deliberately not
//! re-derived.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Relative-change thresholds for the hold predicates and the posture
/// watchdog.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ThresholdConfig {
    /// Relative turn-ratio change confirming a lateral turn.
    #[serde(default = "default_turn_ratio_change")]
    pub turn_ratio_change: f64,
    /// Relative tilt-distance change confirming a vertical tilt.
    #[serde(default = "default_tilt_change")]
    pub tilt_change: f64,
    /// Relative posture-metric deviation that arms the correction grace
    /// window during meditation.
    #[serde(default = "default_posture_deviation")]
    pub posture_deviation: f64,
}

fn default_turn_ratio_change() -> f64 {
    0.15
}

fn default_tilt_change() -> f64 {
    0.005
}

fn default_posture_deviation() -> f64 {
    0.05
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            turn_ratio_change: default_turn_ratio_change(),
            tilt_change: default_tilt_change(),
            posture_deviation: default_posture_deviation(),
        }
    }
}

/// Timer cadences and windows (milliseconds unless noted).
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimingConfig {
    /// Unbroken hold required before a pose gate confirms.
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
    /// Grace window between first posture deviation and correction entry.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    /// Pose-gate sampling cadence.
    #[serde(default = "default_gate_sample_ms")]
    pub gate_sample_ms: u64,
    /// Meditation posture-watchdog cadence.
    #[serde(default = "default_watchdog_ms")]
    pub watchdog_ms: u64,
    /// Meditation clock-check cadence.
    #[serde(default = "default_clock_tick_ms")]
    pub clock_tick_ms: u64,
    /// Settle delay before a snapshot baseline is read.
    #[serde(default = "default_calibration_settle_ms")]
    pub calibration_settle_ms: u64,
    /// Sampling window for baseline capture.
    #[serde(default = "default_calibration_window_ms")]
    pub calibration_window_ms: u64,
    /// Fixed delay between calibration and the meditation loop.
    #[serde(default = "default_stabilization_ms")]
    pub stabilization_ms: u64,
    /// Meditation target duration.
    #[serde(default = "default_meditation_target_ms")]
    pub meditation_target_ms: u64,
}

fn default_hold_ms() -> u64 {
    3000
}

fn default_grace_ms() -> u64 {
    2000
}

fn default_gate_sample_ms() -> u64 {
    100
}

fn default_watchdog_ms() -> u64 {
    200
}

fn default_clock_tick_ms() -> u64 {
    1000
}

fn default_calibration_settle_ms() -> u64 {
    1000
}

fn default_calibration_window_ms() -> u64 {
    4000
}

fn default_stabilization_ms() -> u64 {
    2000
}

fn default_meditation_target_ms() -> u64 {
    180_000
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hold_ms: default_hold_ms(),
            grace_ms: default_grace_ms(),
            gate_sample_ms: default_gate_sample_ms(),
            watchdog_ms: default_watchdog_ms(),
            clock_tick_ms: default_clock_tick_ms(),
            calibration_settle_ms: default_calibration_settle_ms(),
            calibration_window_ms: default_calibration_window_ms(),
            stabilization_ms: default_stabilization_ms(),
            meditation_target_ms: default_meditation_target_ms(),
        }
    }
}

impl TimingConfig {
    /// Hold window as a duration.
    #[must_use]
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Grace window as a duration.
    #[must_use]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Gate sampling cadence as a duration.
    #[must_use]
    pub fn gate_sample(&self) -> Duration {
        Duration::from_millis(self.gate_sample_ms)
    }

    /// Watchdog cadence as a duration.
    #[must_use]
    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    /// Clock-check cadence as a duration.
    #[must_use]
    pub fn clock_tick(&self) -> Duration {
        Duration::from_millis(self.clock_tick_ms)
    }

    /// Calibration settle delay as a duration.
    #[must_use]
    pub fn calibration_settle(&self) -> Duration {
        Duration::from_millis(self.calibration_settle_ms)
    }

    /// Calibration sampling window as a duration.
    #[must_use]
    pub fn calibration_window(&self) -> Duration {
        Duration::from_millis(self.calibration_window_ms)
    }

    /// Stabilization delay as a duration.
    #[must_use]
    pub fn stabilization(&self) -> Duration {
        Duration::from_millis(self.stabilization_ms)
    }

    /// Meditation target duration.
    #[must_use]
    pub fn meditation_target(&self) -> Duration {
        Duration::from_millis(self.meditation_target_ms)
    }
}

/// Engine configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CoachConfig {
    /// Repetitions per repetition-based program.
    #[serde(default = "default_max_reps")]
    pub max_reps: u32,
    /// Minimum landmark confidence for a reading to count.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Hold and deviation thresholds.
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Timer cadences and windows.
    #[serde(default)]
    pub timing: TimingConfig,
}

fn default_max_reps() -> u32 {
    7
}

fn default_min_confidence() -> f64 {
    0.5
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            max_reps: default_max_reps(),
            min_confidence: default_min_confidence(),
            thresholds: ThresholdConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl CoachConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_reps == 0 {
            return Err(AppError::Config("max_reps must be greater than zero".into()));
        }

        if !(self.min_confidence > 0.0 && self.min_confidence <= 1.0) {
            return Err(AppError::Config(
                "min_confidence must be within (0, 1]".into(),
            ));
        }

        let t = &self.thresholds;
        if t.turn_ratio_change <= 0.0 || t.tilt_change <= 0.0 || t.posture_deviation <= 0.0 {
            return Err(AppError::Config("thresholds must be positive".into()));
        }

        let timing = &self.timing;
        if timing.gate_sample_ms == 0 || timing.watchdog_ms == 0 || timing.clock_tick_ms == 0 {
            return Err(AppError::Config(
                "timer cadences must be greater than zero".into(),
            ));
        }
        if timing.calibration_window_ms == 0 {
            return Err(AppError::Config(
                "calibration_window_ms must be greater than zero".into(),
            ));
        }
        if timing.meditation_target_ms == 0 {
            return Err(AppError::Config(
                "meditation_target_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
