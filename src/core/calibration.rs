//! Calibration of the "looking at screen" center.

use crate::core::ratio::GazeRatio;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The gaze ratio recorded as center, and when it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub center: GazeRatio,
    pub calibrated_at: DateTime<Utc>,
}

/// Holds the current calibration. Set only by an explicit `calibrate` call.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    current: Option<Calibration>,
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `center` unconditionally, replacing any previous calibration.
    pub fn calibrate(&mut self, center: GazeRatio, now: DateTime<Utc>) -> Calibration {
        let calibration = Calibration {
            center,
            calibrated_at: now,
        };
        self.current = Some(calibration);
        calibration
    }

    pub fn is_calibrated(&self) -> bool {
        self.current.is_some()
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.current.as_ref()
    }

    pub fn center(&self) -> Option<GazeRatio> {
        self.current.map(|c| c.center)
    }

    /// Forget the calibration; classification stops until recalibrated.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
