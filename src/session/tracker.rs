//! Look-away session tracking.
//!
//! Consumes attention events and frame outcomes and keeps the counters a
//! focus session is scored on. Only totals plus the last two closed
//! intervals are retained.

use crate::core::attention::{AttentionEvent, LookAwayInterval};
use crate::core::engine::{FrameSample, FrameUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name written into exported summaries.
pub const PRODUCER_NAME: &str = "gaze-sentinel";

/// Accumulates look-away statistics for one focus session.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    session_id: Uuid,
    device_id: String,
    started_at: DateTime<Utc>,
    frames_processed: u64,
    frames_missing: u64,
    frames_rejected: u64,
    look_away_count: u64,
    alarm_count: u64,
    /// Running statistics over closed look-away durations
    durations: RunningStats,
    open_since: Option<DateTime<Utc>>,
    last_interval: Option<LookAwayInterval>,
    previous_interval: Option<LookAwayInterval>,
}

impl SessionTracker {
    /// Start a new session at `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            device_id: device_id(),
            started_at,
            frames_processed: 0,
            frames_missing: 0,
            frames_rejected: 0,
            look_away_count: 0,
            alarm_count: 0,
            durations: RunningStats::default(),
            open_since: None,
            last_interval: None,
            previous_interval: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Record one engine frame outcome, including the events it emitted.
    pub fn record_frame(&mut self, update: &FrameUpdate) {
        self.frames_processed += 1;
        match update.sample {
            FrameSample::Observed(_) => {}
            FrameSample::Missing => self.frames_missing += 1,
            FrameSample::Rejected(_) => self.frames_rejected += 1,
        }
        self.record_events(&update.events);
    }

    pub fn record_events(&mut self, events: &[AttentionEvent]) {
        for event in events {
            self.record_event(event);
        }
    }

    pub fn record_event(&mut self, event: &AttentionEvent) {
        match event {
            AttentionEvent::LookAwayStarted {
                off_screen_since, ..
            } => {
                self.look_away_count += 1;
                self.open_since = Some(*off_screen_since);
            }
            AttentionEvent::LookAwayEnded {
                duration_secs,
                interval,
                ..
            } => {
                self.durations.push(*duration_secs);
                self.open_since = None;
                self.previous_interval = self.last_interval.replace(*interval);
            }
            AttentionEvent::AlarmRaised { .. } => self.alarm_count += 1,
            AttentionEvent::AlarmCleared { .. } => {}
        }
    }

    pub fn look_away_count(&self) -> u64 {
        self.look_away_count
    }

    pub fn alarm_count(&self) -> u64 {
        self.alarm_count
    }

    /// Sum of closed look-away durations in seconds.
    pub fn total_look_away_secs(&self) -> f64 {
        self.durations.total
    }

    /// Whether a reported look-away is still open.
    pub fn is_away(&self) -> bool {
        self.open_since.is_some()
    }

    pub fn last_interval(&self) -> Option<&LookAwayInterval> {
        self.last_interval.as_ref()
    }

    pub fn previous_interval(&self) -> Option<&LookAwayInterval> {
        self.previous_interval.as_ref()
    }

    /// Build the session summary as of `ended_at`.
    pub fn summary(&self, ended_at: DateTime<Utc>) -> SessionSummary {
        let session_secs = crate::core::attention::elapsed_secs(self.started_at, ended_at);
        let total = self.total_look_away_secs();

        let stats = &self.durations;

        let focus_ratio = if session_secs > 0.0 {
            (1.0 - total / session_secs).clamp(0.0, 1.0)
        } else {
            1.0
        };

        SessionSummary {
            producer: PRODUCER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            session_id: self.session_id.to_string(),
            device_id: self.device_id.clone(),
            started_at: self.started_at,
            ended_at,
            duration_secs: session_secs,
            frames_processed: self.frames_processed,
            frames_missing: self.frames_missing,
            frames_rejected: self.frames_rejected,
            look_away_count: self.look_away_count,
            total_look_away_secs: total,
            mean_look_away_secs: stats.mean,
            longest_look_away_secs: stats.max,
            look_away_std_dev_secs: stats.std_dev(),
            alarm_count: self.alarm_count,
            focus_ratio,
            last_interval: self.last_interval,
            previous_interval: self.previous_interval,
        }
    }

    /// Human-readable summary for terminal output.
    pub fn report(&self, ended_at: DateTime<Utc>) -> String {
        let s = self.summary(ended_at);
        format!(
            "Session Statistics:\n\
             - Session duration: {:.1} seconds\n\
             - Frames processed: {} ({} without face, {} rejected)\n\
             - Look-aways reported: {}\n\
             - Total time away: {:.1} seconds\n\
             - Longest look-away: {:.1} seconds\n\
             - Alarms raised: {}\n\
             - Focus ratio: {:.0}%",
            s.duration_secs,
            s.frames_processed,
            s.frames_missing,
            s.frames_rejected,
            s.look_away_count,
            s.total_look_away_secs,
            s.longest_look_away_secs,
            s.alarm_count,
            s.focus_ratio * 100.0
        )
    }
}

/// Exported summary of one focus session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub producer: String,
    pub version: String,
    pub session_id: String,
    pub device_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub frames_processed: u64,
    pub frames_missing: u64,
    pub frames_rejected: u64,
    pub look_away_count: u64,
    pub total_look_away_secs: f64,
    pub mean_look_away_secs: f64,
    pub longest_look_away_secs: f64,
    pub look_away_std_dev_secs: f64,
    pub alarm_count: u64,
    /// Fraction of the session not spent in reported look-aways
    pub focus_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interval: Option<LookAwayInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_interval: Option<LookAwayInterval>,
}

impl SessionSummary {
    /// Write the summary as pretty JSON into `dir`, returning the file path.
    pub fn export(&self, dir: &Path) -> Result<PathBuf, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        let short_id: String = self.session_id.chars().take(8).collect();
        let path = dir.join(format!(
            "session_{}_{}.json",
            self.ended_at.format("%Y%m%d_%H%M%S_%3f"),
            short_id
        ));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load the summary that ended last in `dir`.
    ///
    /// File names sort by end time to the millisecond, so the greatest name
    /// wins.
    pub fn load_latest(dir: &Path) -> Result<Option<SessionSummary>, std::io::Error> {
        if !dir.exists() {
            return Ok(None);
        }

        let latest = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension().map(|e| e == "json").unwrap_or(false)
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with("session_"))
                        .unwrap_or(false)
            })
            .max_by_key(|p| p.file_name().map(|n| n.to_os_string()));

        match latest {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content)
                    .map(Some)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }
            None => Ok(None),
        }
    }
}

/// Count, mean, variance (Welford) and max of a stream of durations.
#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    count: u64,
    total: f64,
    mean: f64,
    m2: f64,
    max: f64,
}

impl RunningStats {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.max = if self.count == 1 {
            value
        } else {
            self.max.max(value)
        };
    }

    /// Sample standard deviation; zero below two values.
    fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }
}

fn device_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-device".to_string())
}
