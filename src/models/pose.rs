//! Pose sample model: landmark positions with per-part confidence.
//!
//! Samples are ephemeral — produced by the pose source, consumed by the
//! metric functions, never persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body landmarks the engine's metrics read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    /// Tip of the nose.
    Nose,
    /// Left ear.
    LeftEar,
    /// Right ear.
    RightEar,
    /// Left shoulder.
    LeftShoulder,
    /// Right shoulder.
    RightShoulder,
}

/// One landmark reading: normalized position plus detection confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Landmark {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Landmark {
    /// Construct a landmark reading.
    #[must_use]
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    /// Euclidean distance to another landmark.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// One reading of body landmark positions at an instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct PoseSample {
    /// Capture timestamp.
    pub captured_at: DateTime<Utc>,
    landmarks: HashMap<BodyPart, Landmark>,
}

impl PoseSample {
    /// Construct an empty sample stamped now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            captured_at: Utc::now(),
            landmarks: HashMap::new(),
        }
    }

    /// Builder-style landmark insertion.
    #[must_use]
    pub fn with_landmark(mut self, part: BodyPart, landmark: Landmark) -> Self {
        self.landmarks.insert(part, landmark);
        self
    }

    /// Look up a landmark by body part.
    #[must_use]
    pub fn landmark(&self, part: BodyPart) -> Option<&Landmark> {
        self.landmarks.get(&part)
    }
}

impl Default for PoseSample {
    fn default() -> Self {
        Self::new()
    }
}
