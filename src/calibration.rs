//! Baseline capture stage.
//!
//! Turn and tilt use a snapshot baseline: settle briefly, then take the
//! first confident reading. Meditation uses an averaged baseline sampled
//! across the whole window with a summary confidence.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::collab::PoseSource;
use crate::config::CoachConfig;
use crate::metrics::{self, MetricKind};
use crate::models::baseline::{Baseline, BaselineValue};
use crate::{AppError, Result};

/// Captures an immutable baseline from a short pose-sampling window.
pub struct CalibrationStage {
    pose: Arc<dyn PoseSource>,
    config: Arc<CoachConfig>,
}

impl CalibrationStage {
    /// Construct a stage reading from the given source.
    #[must_use]
    pub fn new(pose: Arc<dyn PoseSource>, config: Arc<CoachConfig>) -> Self {
        Self { pose, config }
    }

    /// Settle, then take the first confident reading inside the window.
    ///
    /// Returns `Ok(None)` when abandoned via `cancel`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CalibrationFailed` if no sample reaches the
    /// minimum confidence before the window closes.
    pub async fn capture_snapshot(
        &self,
        kind: MetricKind,
        cancel: &CancellationToken,
    ) -> Result<Option<Baseline>> {
        let timing = &self.config.timing;
        tokio::select! {
            () = cancel.cancelled() => return Ok(None),
            () = tokio::time::sleep(timing.calibration_settle()) => {}
        }

        let window_started = Instant::now();
        loop {
            if let Some(baseline) = self.try_read(kind) {
                info!(metric = baseline.metric(), confidence = baseline.confidence, "snapshot baseline captured");
                return Ok(Some(baseline));
            }
            if window_started.elapsed() >= timing.calibration_window() {
                return Err(AppError::CalibrationFailed(format!(
                    "no confident pose within {}ms window",
                    timing.calibration_window_ms
                )));
            }
            tokio::select! {
                () = cancel.cancelled() => return Ok(None),
                () = tokio::time::sleep(timing.gate_sample()) => {}
            }
        }
    }

    /// Collect confident readings across the whole window and average
    /// them into a scalar baseline with a summary confidence.
    ///
    /// Returns `Ok(None)` when abandoned via `cancel`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CalibrationFailed` if not a single sample in the
    /// window reaches the minimum confidence.
    pub async fn capture_averaged(
        &self,
        kind: MetricKind,
        cancel: &CancellationToken,
    ) -> Result<Option<Baseline>> {
        let timing = &self.config.timing;
        let window_started = Instant::now();
        let mut values: Vec<f64> = Vec::new();
        let mut confidences: Vec<f64> = Vec::new();

        while window_started.elapsed() < timing.calibration_window() {
            match self.confident_reading(kind) {
                Some((value, confidence)) => {
                    values.push(value);
                    confidences.push(confidence);
                }
                None => trace!("calibration sample skipped"),
            }
            tokio::select! {
                () = cancel.cancelled() => return Ok(None),
                () = tokio::time::sleep(timing.gate_sample()) => {}
            }
        }

        if values.is_empty() {
            return Err(AppError::CalibrationFailed(format!(
                "no confident pose within {}ms window",
                timing.calibration_window_ms
            )));
        }

        #[allow(clippy::cast_precision_loss)] // sample counts are tiny
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let confidence = confidences.iter().sum::<f64>() / count;
        debug!(samples = values.len(), mean, confidence, "averaged baseline captured");
        Ok(Some(Baseline::new(
            BaselineValue::Scalar { value: mean },
            confidence,
        )))
    }

    /// One confident reading of the metric, or `None`.
    fn confident_reading(&self, kind: MetricKind) -> Option<(f64, f64)> {
        let sample = self.pose.current_pose()?;
        let reading = metrics::read_metric(kind, &sample)?;
        if reading.confidence < self.config.min_confidence || !reading.value.is_finite() {
            return None;
        }
        Some((reading.value, reading.confidence))
    }

    /// One confident baseline snapshot, keeping paired values for turn.
    fn try_read(&self, kind: MetricKind) -> Option<Baseline> {
        let sample = self.pose.current_pose()?;
        let reading = metrics::read_metric(kind, &sample)?;
        if reading.confidence < self.config.min_confidence || !reading.value.is_finite() {
            return None;
        }
        let value = metrics::baseline_value(kind, &sample)?;
        Some(Baseline::new(value, reading.confidence))
    }
}
