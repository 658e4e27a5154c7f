//! Landmark input for the gaze engine.
//!
//! Landmark detection itself happens outside this crate. This module only
//! defines the frame format and a replay source for recorded detector output.

pub mod replay;
pub mod types;

// Re-export commonly used types
pub use replay::{read_recording, ReplayError, ReplayMessage, ReplaySource};
pub use types::{EyeIndices, EyeLandmarks, FrameRecord, LandmarkFrame, Point2};
