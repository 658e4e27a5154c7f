//! On-screen / off-screen classification against the calibrated center.
//!
//! The on-screen region is a rectangular deadzone around the center. A pair
//! of smaller thresholds derives the directional labels shown for
//! diagnostics.

use crate::config::EngineConfig;
use crate::core::ratio::GazeRatio;
use serde::{Deserialize, Serialize};

/// Horizontal gaze direction relative to center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizontal {
    Left,
    Center,
    Right,
}

/// Vertical gaze direction relative to center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vertical {
    Up,
    Center,
    Down,
}

/// Directional labels for one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazeDirection {
    pub horizontal: Horizontal,
    pub vertical: Vertical,
}

impl std::fmt::Display for GazeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = match self.vertical {
            Vertical::Up => "Up",
            Vertical::Center => "Center",
            Vertical::Down => "Down",
        };
        let h = match self.horizontal {
            Horizontal::Left => "Left",
            Horizontal::Center => "Center",
            Horizontal::Right => "Right",
        };
        write!(f, "{v} {h}")
    }
}

/// Result of classifying one smoothed ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeReading {
    /// Smoothed ratio that was classified
    pub ratio: GazeRatio,
    /// Signed difference from the calibrated center
    pub offset: GazeRatio,
    pub on_screen: bool,
    pub direction: GazeDirection,
}

/// Compares smoothed ratios against a calibrated center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeClassifier {
    h_threshold: f64,
    v_threshold: f64,
    h_direction_threshold: f64,
    v_direction_threshold: f64,
}

impl GazeClassifier {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            h_threshold: config.h_threshold,
            v_threshold: config.v_threshold,
            h_direction_threshold: config.h_direction_threshold,
            v_direction_threshold: config.v_direction_threshold,
        }
    }

    /// Whether `ratio` lies strictly inside the deadzone around `center`.
    pub fn is_on_screen(&self, ratio: &GazeRatio, center: &GazeRatio) -> bool {
        let offset = ratio.offset_from(center);
        offset.horizontal.abs() < self.h_threshold && offset.vertical.abs() < self.v_threshold
    }

    /// Full classification including directional labels.
    pub fn classify(&self, ratio: &GazeRatio, center: &GazeRatio) -> GazeReading {
        let offset = ratio.offset_from(center);

        let horizontal = if offset.horizontal < -self.h_direction_threshold {
            Horizontal::Left
        } else if offset.horizontal > self.h_direction_threshold {
            Horizontal::Right
        } else {
            Horizontal::Center
        };

        let vertical = if offset.vertical < -self.v_direction_threshold {
            Vertical::Up
        } else if offset.vertical > self.v_direction_threshold {
            Vertical::Down
        } else {
            Vertical::Center
        };

        GazeReading {
            ratio: *ratio,
            offset,
            on_screen: self.is_on_screen(ratio, center),
            direction: GazeDirection {
                horizontal,
                vertical,
            },
        }
    }
}

impl Default for GazeClassifier {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
