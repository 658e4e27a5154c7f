//! Landmark frame types consumed by the gaze engine.
//!
//! A frame is only ever read: the engine extracts two ratios from it and
//! drops it. No image data or raw landmark history is retained.

use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

/// Landmark indices describing one eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeIndices {
    pub iris: usize,
    pub inner_corner: usize,
    pub outer_corner: usize,
    pub lid_top: usize,
    pub lid_bottom: usize,
}

impl EyeIndices {
    /// Largest index referenced by this eye.
    pub fn max_index(&self) -> usize {
        self.iris
            .max(self.inner_corner)
            .max(self.outer_corner)
            .max(self.lid_top)
            .max(self.lid_bottom)
    }
}

/// Positional layout of the anatomical features used for gaze ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeLandmarks {
    pub left: EyeIndices,
    pub right: EyeIndices,
}

impl EyeLandmarks {
    /// Layout of a 478-point refined face mesh (iris points at 468/473).
    pub const FACE_MESH: EyeLandmarks = EyeLandmarks {
        left: EyeIndices {
            iris: 468,
            inner_corner: 133,
            outer_corner: 33,
            lid_top: 159,
            lid_bottom: 145,
        },
        right: EyeIndices {
            iris: 473,
            inner_corner: 362,
            outer_corner: 263,
            lid_top: 386,
            lid_bottom: 374,
        },
    };

    /// Minimum number of points a frame needs for this layout.
    pub fn required_len(&self) -> usize {
        self.left.max_index().max(self.right.max_index()) + 1
    }
}

impl Default for EyeLandmarks {
    fn default() -> Self {
        Self::FACE_MESH
    }
}

/// An ordered set of landmark points produced for one camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Point2>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Look up a point by landmark index.
    pub fn get(&self, index: usize) -> Option<Point2> {
        self.points.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Build a frame whose eyes produce the given ratios under `layout`.
    ///
    /// Used by demos and tests to synthesise detector output. Each eye gets
    /// a 40px corner span and a 10px lid span.
    pub fn synthetic(layout: &EyeLandmarks, horizontal: f64, vertical: f64) -> Self {
        let mut points = vec![Point2::default(); layout.required_len()];
        for (eye, origin_x) in [(layout.left, 100.0), (layout.right, 200.0)] {
            let (outer_x, inner_x) = (origin_x, origin_x + 40.0);
            let (top_y, bottom_y) = (100.0, 110.0);
            points[eye.outer_corner] = Point2::new(outer_x, 105.0);
            points[eye.inner_corner] = Point2::new(inner_x, 105.0);
            points[eye.lid_top] = Point2::new(origin_x + 20.0, top_y);
            points[eye.lid_bottom] = Point2::new(origin_x + 20.0, bottom_y);
            points[eye.iris] = Point2::new(
                outer_x + horizontal * (inner_x - outer_x),
                top_y + vertical * (bottom_y - top_y),
            );
        }
        Self { points }
    }
}

/// One recorded detector output, as stored in a replay file.
///
/// `points: null` marks a frame where no face was detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Seconds since the start of the recording
    pub t: f64,
    /// Landmarks, or `None` when detection failed
    #[serde(default)]
    pub points: Option<LandmarkFrame>,
    /// Whether the user triggered calibration on this frame
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub calibrate: bool,
}
