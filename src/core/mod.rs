//! Core gaze attention pipeline.
//!
//! This module contains:
//! - Gaze ratio extraction from eye landmarks
//! - Sliding-window smoothing
//! - Calibration and on/off-screen classification
//! - The debounced attention state machine
//! - The engine that runs all of the above once per frame

pub mod attention;
pub mod calibration;
pub mod classifier;
pub mod engine;
pub mod ratio;
pub mod smoothing;

// Re-export commonly used types
pub use attention::{AttentionEvent, AttentionState, AttentionStateMachine, LookAwayInterval};
pub use calibration::{Calibration, Calibrator};
pub use classifier::{GazeClassifier, GazeDirection, GazeReading, Horizontal, Vertical};
pub use engine::{EngineError, FrameSample, FrameUpdate, GazeEngine};
pub use ratio::{GazeRatio, RatioExtractor, SampleError};
pub use smoothing::Smoother;
