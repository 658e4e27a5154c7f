//! The per-session gaze attention engine.
//!
//! Owns every piece of pipeline state (smoothing windows, calibration,
//! attention state) and advances exactly once per frame on the caller's
//! thread. All timing uses the caller-supplied `now`.

use crate::config::EngineConfig;
use crate::core::attention::{AttentionEvent, AttentionState, AttentionStateMachine};
use crate::core::calibration::{Calibration, Calibrator};
use crate::core::classifier::{GazeClassifier, GazeReading};
use crate::core::ratio::{GazeRatio, RatioExtractor, SampleError};
use crate::core::smoothing::Smoother;
use crate::landmarks::types::{EyeLandmarks, LandmarkFrame};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// "Not ready" conditions reported to callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("engine is not calibrated")]
    NotCalibrated,
    #[error("no gaze sample has been observed yet")]
    NoSample,
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// What a frame contributed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSample {
    /// A valid raw ratio was extracted and pushed into the smoother
    Observed(GazeRatio),
    /// The detector found no face
    Missing,
    /// Landmarks were present but unusable
    Rejected(SampleError),
}

impl FrameSample {
    pub fn is_observed(&self) -> bool {
        matches!(self, Self::Observed(_))
    }
}

/// Outcome of one `process_frame` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUpdate {
    pub sample: FrameSample,
    /// Classification of the smoothed ratio; absent when nothing was classified
    pub reading: Option<GazeReading>,
    pub state: AttentionState,
    pub events: Vec<AttentionEvent>,
}

/// Gaze attention engine for one tracking session.
#[derive(Debug, Clone)]
pub struct GazeEngine {
    config: EngineConfig,
    extractor: RatioExtractor,
    smoother: Smoother,
    calibrator: Calibrator,
    classifier: GazeClassifier,
    machine: AttentionStateMachine,
}

impl GazeEngine {
    /// Create an engine for the face-mesh landmark layout.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_layout(config, EyeLandmarks::FACE_MESH)
    }

    /// Create an engine for a custom landmark layout.
    pub fn with_layout(config: EngineConfig, layout: EyeLandmarks) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            extractor: RatioExtractor::new(layout),
            smoother: Smoother::new(config.smoothing_window),
            calibrator: Calibrator::new(),
            classifier: GazeClassifier::new(&config),
            machine: AttentionStateMachine::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> AttentionState {
        self.machine.state()
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibrator.calibration()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_calibrated()
    }

    /// Current smoothed ratio, if any sample has been observed.
    pub fn smoothed(&self) -> Option<GazeRatio> {
        self.smoother.current()
    }

    pub fn state_machine(&self) -> &AttentionStateMachine {
        &self.machine
    }

    /// Advance the pipeline by one camera frame.
    ///
    /// `None` means the detector produced no landmarks. Frames without a
    /// usable sample leave the smoother and the attention state untouched.
    pub fn process_frame(
        &mut self,
        frame: Option<&LandmarkFrame>,
        now: DateTime<Utc>,
    ) -> FrameUpdate {
        let sample = match frame.map(|f| self.extractor.extract(f)) {
            Some(Ok(raw)) => FrameSample::Observed(raw),
            Some(Err(reason)) => {
                debug!("Frame rejected: {}", reason);
                FrameSample::Rejected(reason)
            }
            None => FrameSample::Missing,
        };

        let FrameSample::Observed(raw) = sample else {
            trace!(state = %self.machine.state(), "No sample, holding state");
            return FrameUpdate {
                sample,
                reading: None,
                state: self.machine.state(),
                events: Vec::new(),
            };
        };

        let smoothed = self.smoother.push(raw);

        let Some(center) = self.calibrator.center() else {
            trace!(h = smoothed.horizontal, v = smoothed.vertical, "Uncalibrated sample");
            return FrameUpdate {
                sample,
                reading: None,
                state: self.machine.state(),
                events: Vec::new(),
            };
        };

        let reading = self.classifier.classify(&smoothed, &center);
        trace!(
            h = smoothed.horizontal,
            v = smoothed.vertical,
            on_screen = reading.on_screen,
            "Classified sample"
        );
        let events = self.machine.update(reading.on_screen, now);

        FrameUpdate {
            sample,
            reading: Some(reading),
            state: self.machine.state(),
            events,
        }
    }

    /// Take the current smoothed ratio as the calibrated center.
    ///
    /// Fails with `NoSample` before the first valid frame. Recalibrating
    /// replaces the center immediately without touching the attention state.
    pub fn calibrate(&mut self, now: DateTime<Utc>) -> Result<Calibration, EngineError> {
        let Some(center) = self.smoother.current() else {
            warn!("Calibration requested before any gaze sample");
            return Err(EngineError::NoSample);
        };
        Ok(self.calibrate_to(center, now))
    }

    /// Calibrate to an explicit center, e.g. one restored by the host.
    pub fn calibrate_to(&mut self, center: GazeRatio, now: DateTime<Utc>) -> Calibration {
        let calibration = self.calibrator.calibrate(center, now);
        self.machine.mark_calibrated();
        info!(
            h = center.horizontal,
            v = center.vertical,
            "Calibrated gaze center"
        );
        calibration
    }

    /// Classify the current smoothed ratio without advancing the state machine.
    pub fn current_reading(&self) -> Result<GazeReading, EngineError> {
        let center = self.calibrator.center().ok_or_else(|| {
            warn!("Classification requested before calibration");
            EngineError::NotCalibrated
        })?;
        let smoothed = self.smoother.current().ok_or(EngineError::NoSample)?;
        Ok(self.classifier.classify(&smoothed, &center))
    }

    /// Drop the calibration and the smoothing history. Any open look-away
    /// is closed first.
    pub fn clear_calibration(&mut self, now: DateTime<Utc>) -> Vec<AttentionEvent> {
        self.calibrator.reset();
        self.smoother.clear();
        self.machine.reset(now)
    }

    /// Close any open look-away before shutdown.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Vec<AttentionEvent> {
        self.machine.flush(now)
    }

    /// Visual alarm flash phase; see [`AttentionStateMachine::alarm_flash_on`].
    pub fn alarm_flash_on(&self, now: DateTime<Utc>) -> bool {
        self.machine.alarm_flash_on(now)
    }
}
