//! Gaze ratio extraction from eye landmarks.
//!
//! The horizontal ratio places the iris between the outer and inner eye
//! corners; the vertical ratio places it between the upper and lower lid.
//! Both eyes are averaged.

use crate::landmarks::types::{EyeIndices, EyeLandmarks, LandmarkFrame};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Iris position relative to eye geometry, one value per axis.
///
/// Values are ideally within [0, 1] but are not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazeRatio {
    pub horizontal: f64,
    pub vertical: f64,
}

impl GazeRatio {
    pub const fn new(horizontal: f64, vertical: f64) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Signed per-axis difference `self - other`.
    pub fn offset_from(&self, other: &GazeRatio) -> GazeRatio {
        GazeRatio {
            horizontal: self.horizontal - other.horizontal,
            vertical: self.vertical - other.vertical,
        }
    }
}

/// Reasons a frame yields no gaze sample.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SampleError {
    #[error("landmark {index} missing from frame of {len} points")]
    MissingLandmark { index: usize, len: usize },
    #[error("degenerate eye geometry (zero corner or lid span)")]
    DegenerateGeometry,
}

/// Converts landmark frames into gaze ratios.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioExtractor {
    layout: EyeLandmarks,
}

impl RatioExtractor {
    pub fn new(layout: EyeLandmarks) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &EyeLandmarks {
        &self.layout
    }

    /// Compute the averaged gaze ratio for a frame.
    pub fn extract(&self, frame: &LandmarkFrame) -> Result<GazeRatio, SampleError> {
        let left = eye_ratio(frame, &self.layout.left)?;
        let right = eye_ratio(frame, &self.layout.right)?;

        Ok(GazeRatio {
            horizontal: (left.horizontal + right.horizontal) / 2.0,
            vertical: (left.vertical + right.vertical) / 2.0,
        })
    }
}

fn eye_ratio(frame: &LandmarkFrame, eye: &EyeIndices) -> Result<GazeRatio, SampleError> {
    let point = |index: usize| {
        frame.get(index).ok_or(SampleError::MissingLandmark {
            index,
            len: frame.len(),
        })
    };

    let iris = point(eye.iris)?;
    let inner = point(eye.inner_corner)?;
    let outer = point(eye.outer_corner)?;
    let top = point(eye.lid_top)?;
    let bottom = point(eye.lid_bottom)?;

    let corner_span = inner.x - outer.x;
    let lid_span = bottom.y - top.y;
    if corner_span == 0.0 || lid_span == 0.0 {
        return Err(SampleError::DegenerateGeometry);
    }

    let ratio = GazeRatio {
        horizontal: (iris.x - outer.x) / corner_span,
        vertical: (iris.y - top.y) / lid_span,
    };

    // NaN coordinates from a detector would poison the smoothing window.
    if ratio.horizontal.is_finite() && ratio.vertical.is_finite() {
        Ok(ratio)
    } else {
        Err(SampleError::DegenerateGeometry)
    }
}
