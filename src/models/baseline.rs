//! Calibration baseline model.
//!
//! A baseline is captured once per session by the calibration stage and is
//! immutable afterwards; it is discarded on stop/cleanup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shape of a captured baseline value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BaselineKind {
    /// A single reference value (tilt distance, posture height).
    Scalar,
    /// A left/right reference-distance pair; the comparison metric is
    /// their ratio.
    PairedDistance,
}

/// Captured baseline value(s).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BaselineValue {
    /// Single scalar reference.
    Scalar {
        /// The reference value.
        value: f64,
    },
    /// Left and right reference distances.
    PairedDistance {
        /// Distance on the left side.
        left: f64,
        /// Distance on the right side.
        right: f64,
    },
}

impl BaselineValue {
    /// Shape of this value.
    #[must_use]
    pub fn kind(&self) -> BaselineKind {
        match self {
            Self::Scalar { .. } => BaselineKind::Scalar,
            Self::PairedDistance { .. } => BaselineKind::PairedDistance,
        }
    }

    /// The scalar metric live samples are compared against: the value
    /// itself, or the left/right ratio for paired distances.
    #[must_use]
    pub fn metric(&self) -> f64 {
        match *self {
            Self::Scalar { value } => value,
            Self::PairedDistance { left, right } => left / right,
        }
    }
}

/// An immutable calibration baseline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Baseline {
    /// Captured value(s).
    pub value: BaselineValue,
    /// Capture timestamp.
    pub captured_at: DateTime<Utc>,
    /// Confidence of the capture: the sample confidence for snapshots, the
    /// mean sample confidence for averaged baselines.
    pub confidence: f64,
}

impl Baseline {
    /// Construct a baseline stamped now.
    #[must_use]
    pub fn new(value: BaselineValue, confidence: f64) -> Self {
        Self {
            value,
            captured_at: Utc::now(),
            confidence,
        }
    }

    /// Shape of the captured value.
    #[must_use]
    pub fn kind(&self) -> BaselineKind {
        self.value.kind()
    }

    /// The scalar comparison metric.
    #[must_use]
    pub fn metric(&self) -> f64 {
        self.value.metric()
    }
}
