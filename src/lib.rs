//! Gaze Sentinel - calibrated, debounced screen-attention detection.
//!
//! This library turns per-frame facial landmarks into a stream of
//! look-away events. It never sees camera images: each frame is reduced to
//! two gaze ratios and dropped.
//!
//! # Privacy Guarantees
//!
//! - **No images**: Only landmark coordinates are accepted
//! - **No landmark history**: A frame is discarded once its ratios are extracted
//! - **Local only**: Session summaries are written to local disk and nowhere else
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Gaze Engine                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌─────────────┐   │
//! │  │  Ratio   │──▶│ Smoother │──▶│Classifier │──▶│  Attention  │   │
//! │  │Extractor │   │ (N=10)   │   │(deadzone) │   │State Machine│   │
//! │  └──────────┘   └──────────┘   └───────────┘   └─────────────┘   │
//! │       ▲                              ▲                │          │
//! │       │                              │                ▼          │
//! │  ┌──────────┐                 ┌────────────┐   ┌─────────────┐   │
//! │  │Landmarks │                 │ Calibrator │   │   Session   │   │
//! │  │ (replay) │                 │  (center)  │   │   Tracker   │   │
//! │  └──────────┘                 └────────────┘   └─────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use gaze_sentinel::{EngineConfig, EyeLandmarks, GazeEngine, LandmarkFrame};
//!
//! let mut engine = GazeEngine::new(EngineConfig::default()).unwrap();
//! let start = Utc::now();
//! let frame = LandmarkFrame::synthetic(&EyeLandmarks::FACE_MESH, 0.50, 0.45);
//!
//! engine.process_frame(Some(&frame), start);
//! engine.calibrate(start).unwrap();
//!
//! let update = engine.process_frame(Some(&frame), start + Duration::milliseconds(100));
//! assert!(update.reading.unwrap().on_screen);
//! ```

pub mod config;
pub mod core;
pub mod landmarks;
pub mod logging;
pub mod session;
pub mod tuning;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, EngineConfig};
pub use core::{
    AttentionEvent, AttentionState, Calibration, EngineError, FrameSample, FrameUpdate,
    GazeDirection, GazeEngine, GazeRatio, GazeReading, LookAwayInterval, SampleError,
};
pub use landmarks::{
    EyeIndices, EyeLandmarks, FrameRecord, LandmarkFrame, Point2, ReplayError, ReplayMessage,
    ReplaySource,
};
pub use session::{SessionSummary, SessionTracker};
pub use tuning::{SensitivityJudgement, TuningError, TuningRecommendation};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║               GAZE SENTINEL - PRIVACY DECLARATION                ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tool detects when you look away from your screen.          ║
║                                                                  ║
║  ✓ WHAT WE PROCESS:                                              ║
║    • Eye landmark positions from your face detector              ║
║    • Two gaze ratios per frame (horizontal and vertical)         ║
║    • When look-aways start and end                               ║
║                                                                  ║
║  ✗ WHAT WE NEVER STORE:                                          ║
║    • Camera images or video                                      ║
║    • Raw landmark coordinates                                    ║
║    • Anything about what is on your screen                       ║
║                                                                  ║
║  All processing is local. Frames are discarded as soon as        ║
║  their gaze ratios are computed. Session summaries hold only     ║
║  look-away counts and durations.                                 ║
║                                                                  ║
║  You can view the last session summary anytime with:             ║
║    gaze-sentinel summary                                         ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
