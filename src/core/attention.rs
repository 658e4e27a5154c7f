//! Attention state machine.
//!
//! Consumes one on/off-screen verdict per valid frame and turns sustained
//! off-screen runs into look-away and alarm events:
//!
//! ```text
//!                 off                 off, >= min_look_away
//!   OnScreen ───────────▶ AwayPending ──────────────────────▶ AwayReported
//!      ▲                      │ on (discarded)                  │    │
//!      └──────────────────────┘                                 │    │ off, > alarm_duration
//!      ▲                    on: LookAwayEnded                   │    ▼
//!      ├────────────────────────────────────────────────────────┘  AlarmActive
//!      └──────────────── on: LookAwayEnded + AlarmCleared ───────────────┘
//! ```
//!
//! Reported durations are measured from the first off-screen frame, not
//! from the moment the debounce floor was crossed.

use crate::config::EngineConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Logical attention state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionState {
    /// No calibration yet; verdicts are ignored
    Uncalibrated,
    OnScreen,
    /// Off screen, but not yet long enough to report
    AwayPending,
    AwayReported,
    AlarmActive,
}

impl AttentionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uncalibrated => "uncalibrated",
            Self::OnScreen => "on_screen",
            Self::AwayPending => "away_pending",
            Self::AwayReported => "away_reported",
            Self::AlarmActive => "alarm_active",
        }
    }
}

impl std::fmt::Display for AttentionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed look-away interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookAwayInterval {
    /// First off-screen frame of the run
    pub start: DateTime<Utc>,
    /// Frame on which the user returned (or the flush time)
    pub end: DateTime<Utc>,
}

impl LookAwayInterval {
    pub fn duration_secs(&self) -> f64 {
        elapsed_secs(self.start, self.end)
    }
}

/// Events emitted on attention-state transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AttentionEvent {
    LookAwayStarted {
        at: DateTime<Utc>,
        off_screen_since: DateTime<Utc>,
    },
    LookAwayEnded {
        at: DateTime<Utc>,
        duration_secs: f64,
        interval: LookAwayInterval,
    },
    AlarmRaised {
        at: DateTime<Utc>,
    },
    AlarmCleared {
        at: DateTime<Utc>,
    },
}

impl AttentionEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::LookAwayStarted { at, .. }
            | Self::LookAwayEnded { at, .. }
            | Self::AlarmRaised { at }
            | Self::AlarmCleared { at } => *at,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LookAwayStarted { .. } => "look_away_started",
            Self::LookAwayEnded { .. } => "look_away_ended",
            Self::AlarmRaised { .. } => "alarm_raised",
            Self::AlarmCleared { .. } => "alarm_cleared",
        }
    }
}

/// Debounced, alarm-escalating attention state machine.
#[derive(Debug, Clone)]
pub struct AttentionStateMachine {
    min_look_away: Duration,
    alarm_duration: Duration,
    flash_period: Duration,
    state: AttentionState,
    off_screen_start: Option<DateTime<Utc>>,
    alarm_raised_at: Option<DateTime<Utc>>,
    previous_interval: Option<LookAwayInterval>,
}

impl AttentionStateMachine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_look_away: config.min_look_away_duration,
            alarm_duration: config.alarm_duration,
            flash_period: config.alarm_flash_period,
            state: AttentionState::Uncalibrated,
            off_screen_start: None,
            alarm_raised_at: None,
            previous_interval: None,
        }
    }

    pub fn state(&self) -> AttentionState {
        self.state
    }

    /// Start of the current off-screen run, if any.
    pub fn off_screen_since(&self) -> Option<DateTime<Utc>> {
        self.off_screen_start
    }

    /// Seconds spent off screen in the current run.
    pub fn away_for(&self, now: DateTime<Utc>) -> Option<f64> {
        self.off_screen_start.map(|start| elapsed_secs(start, now))
    }

    /// The most recently closed look-away interval.
    pub fn previous_interval(&self) -> Option<&LookAwayInterval> {
        self.previous_interval.as_ref()
    }

    /// Leave `Uncalibrated` once a calibration exists. Other states are kept.
    pub fn mark_calibrated(&mut self) {
        if self.state == AttentionState::Uncalibrated {
            debug!("Attention machine armed");
            self.state = AttentionState::OnScreen;
        }
    }

    /// Advance on one classification verdict.
    pub fn update(&mut self, on_screen: bool, now: DateTime<Utc>) -> Vec<AttentionEvent> {
        let mut events = Vec::new();

        match (self.state, on_screen) {
            (AttentionState::Uncalibrated, _) | (AttentionState::OnScreen, true) => {}
            (AttentionState::OnScreen, false) => {
                self.off_screen_start = Some(now);
                self.state = AttentionState::AwayPending;
                self.advance_away(now, &mut events);
            }
            (AttentionState::AwayPending, true) => {
                if let Some(secs) = self.away_for(now) {
                    debug!("Glance of {:.2}s below debounce floor, discarded", secs);
                }
                self.clear_timers();
                self.state = AttentionState::OnScreen;
            }
            (AttentionState::AwayPending, false) | (AttentionState::AwayReported, false) => {
                self.advance_away(now, &mut events);
            }
            (AttentionState::AwayReported, true) | (AttentionState::AlarmActive, true) => {
                self.close_look_away(now, &mut events);
            }
            (AttentionState::AlarmActive, false) => {}
        }

        log_events(&events);
        events
    }

    /// Close any open look-away, e.g. before shutdown.
    ///
    /// A reported look-away gets a synthetic `LookAwayEnded` ending at `now`
    /// (plus `AlarmCleared` if the alarm was up). A pending one is dropped.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Vec<AttentionEvent> {
        let mut events = Vec::new();

        match self.state {
            AttentionState::AwayReported | AttentionState::AlarmActive => {
                self.close_look_away(now, &mut events);
            }
            AttentionState::AwayPending => {
                self.clear_timers();
                self.state = AttentionState::OnScreen;
            }
            AttentionState::Uncalibrated | AttentionState::OnScreen => {}
        }

        log_events(&events);
        events
    }

    /// Flush and return to `Uncalibrated`.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Vec<AttentionEvent> {
        let events = self.flush(now);
        self.state = AttentionState::Uncalibrated;
        events
    }

    /// Visual flash phase while the alarm is active.
    ///
    /// Toggles every `alarm_flash_period`, starting "on" when the alarm is
    /// raised. Always false outside `AlarmActive`.
    pub fn alarm_flash_on(&self, now: DateTime<Utc>) -> bool {
        let Some(raised) = self.alarm_raised_at else {
            return false;
        };
        if self.state != AttentionState::AlarmActive {
            return false;
        }
        let period = self.flash_period.as_secs_f64();
        if period <= 0.0 {
            return true;
        }
        let phase = (elapsed_secs(raised, now) / period).floor() as u64;
        phase % 2 == 0
    }

    fn advance_away(&mut self, now: DateTime<Utc>, events: &mut Vec<AttentionEvent>) {
        let Some(start) = self.off_screen_start else {
            return;
        };
        let elapsed = elapsed_secs(start, now);

        if self.state == AttentionState::AwayPending
            && elapsed >= self.min_look_away.as_secs_f64()
        {
            events.push(AttentionEvent::LookAwayStarted {
                at: now,
                off_screen_since: start,
            });
            self.state = AttentionState::AwayReported;
        }

        if self.state == AttentionState::AwayReported && elapsed > self.alarm_duration.as_secs_f64()
        {
            events.push(AttentionEvent::AlarmRaised { at: now });
            self.alarm_raised_at = Some(now);
            self.state = AttentionState::AlarmActive;
        }
    }

    fn close_look_away(&mut self, now: DateTime<Utc>, events: &mut Vec<AttentionEvent>) {
        if let Some(start) = self.off_screen_start {
            let interval = LookAwayInterval { start, end: now };
            events.push(AttentionEvent::LookAwayEnded {
                at: now,
                duration_secs: interval.duration_secs(),
                interval,
            });
            self.previous_interval = Some(interval);
        }
        if self.state == AttentionState::AlarmActive {
            events.push(AttentionEvent::AlarmCleared { at: now });
        }
        self.clear_timers();
        self.state = AttentionState::OnScreen;
    }

    fn clear_timers(&mut self) {
        self.off_screen_start = None;
        self.alarm_raised_at = None;
    }
}

fn log_events(events: &[AttentionEvent]) {
    for event in events {
        match event {
            AttentionEvent::LookAwayEnded { duration_secs, .. } => {
                info!(event = event.name(), duration_secs, "Attention event")
            }
            _ => info!(event = event.name(), "Attention event"),
        }
    }
}

/// Seconds from `start` to `end` with microsecond precision, never negative.
pub(crate) fn elapsed_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    let secs = match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    };
    secs.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(min_secs: u64, alarm_secs: u64) -> AttentionStateMachine {
        let config = EngineConfig {
            min_look_away_duration: Duration::from_secs(min_secs),
            alarm_duration: Duration::from_secs(alarm_secs),
            ..EngineConfig::default()
        };
        let mut m = AttentionStateMachine::new(&config);
        m.mark_calibrated();
        m
    }

    fn at(base: DateTime<Utc>, ms: i64) -> DateTime<Utc> {
        base + chrono::Duration::milliseconds(ms)
    }

    #[test]
    fn test_uncalibrated_ignores_verdicts() {
        let mut m = AttentionStateMachine::new(&EngineConfig::default());
        let base = Utc::now();
        assert!(m.update(false, base).is_empty());
        assert!(m.update(false, at(base, 60_000)).is_empty());
        assert_eq!(m.state(), AttentionState::Uncalibrated);
    }

    #[test]
    fn test_short_glance_is_discarded() {
        let mut m = machine(3, 15);
        let base = Utc::now();
        assert!(m.update(false, base).is_empty());
        assert_eq!(m.state(), AttentionState::AwayPending);
        assert!(m.update(false, at(base, 2_000)).is_empty());
        assert!(m.update(true, at(base, 2_100)).is_empty());
        assert_eq!(m.state(), AttentionState::OnScreen);
        assert!(m.off_screen_since().is_none());
    }

    #[test]
    fn test_reported_duration_includes_debounce() {
        let mut m = machine(3, 15);
        let base = Utc::now();
        m.update(false, base);

        let started = m.update(false, at(base, 3_000));
        assert!(matches!(
            started.as_slice(),
            [AttentionEvent::LookAwayStarted { off_screen_since, .. }] if *off_screen_since == base
        ));
        assert_eq!(m.state(), AttentionState::AwayReported);

        let ended = m.update(true, at(base, 5_000));
        match ended.as_slice() {
            [AttentionEvent::LookAwayEnded { duration_secs, interval, .. }] => {
                assert!((duration_secs - 5.0).abs() < 1e-9);
                assert_eq!(interval.start, base);
            }
            other => panic!("unexpected events: {other:?}"),
        }
        assert_eq!(m.previous_interval().map(|i| i.start), Some(base));
    }

    #[test]
    fn test_alarm_raise_and_clear() {
        let mut m = machine(3, 15);
        let base = Utc::now();
        m.update(false, base);
        m.update(false, at(base, 3_000));

        // Exactly at the alarm duration is not enough: the comparison is strict.
        assert!(m.update(false, at(base, 15_000)).is_empty());
        let raised = m.update(false, at(base, 15_100));
        assert_eq!(raised, vec![AttentionEvent::AlarmRaised { at: at(base, 15_100) }]);
        assert!(m.update(false, at(base, 20_000)).is_empty());

        let back = m.update(true, at(base, 21_000));
        assert_eq!(back.len(), 2);
        assert!(matches!(back[0], AttentionEvent::LookAwayEnded { .. }));
        assert_eq!(back[1], AttentionEvent::AlarmCleared { at: at(base, 21_000) });
        assert_eq!(m.state(), AttentionState::OnScreen);
    }

    #[test]
    fn test_zero_debounce_reports_immediately() {
        let mut m = machine(0, 15);
        let base = Utc::now();
        let events = m.update(false, base);
        assert!(matches!(events.as_slice(), [AttentionEvent::LookAwayStarted { .. }]));
        assert_eq!(m.state(), AttentionState::AwayReported);
    }

    #[test]
    fn test_flush_closes_reported_look_away() {
        let mut m = machine(3, 15);
        let base = Utc::now();
        m.update(false, base);
        m.update(false, at(base, 4_000));

        let flushed = m.flush(at(base, 6_500));
        match flushed.as_slice() {
            [AttentionEvent::LookAwayEnded { duration_secs, .. }] => {
                assert!((duration_secs - 6.5).abs() < 1e-9)
            }
            other => panic!("unexpected events: {other:?}"),
        }
        assert!(m.flush(at(base, 7_000)).is_empty());
    }

    #[test]
    fn test_flush_during_alarm_clears_it() {
        let mut m = machine(1, 2);
        let base = Utc::now();
        m.update(false, base);
        m.update(false, at(base, 1_000));
        m.update(false, at(base, 2_500));
        assert_eq!(m.state(), AttentionState::AlarmActive);

        let flushed = m.flush(at(base, 3_000));
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[1].name(), "alarm_cleared");
    }

    #[test]
    fn test_flush_drops_pending() {
        let mut m = machine(3, 15);
        let base = Utc::now();
        m.update(false, base);
        assert!(m.flush(at(base, 1_000)).is_empty());
        assert_eq!(m.state(), AttentionState::OnScreen);
    }

    #[test]
    fn test_reset_returns_to_uncalibrated() {
        let mut m = machine(0, 15);
        let base = Utc::now();
        m.update(false, base);
        let events = m.reset(at(base, 500));
        assert_eq!(events.len(), 1);
        assert_eq!(m.state(), AttentionState::Uncalibrated);
    }

    #[test]
    fn test_alarm_flash_duty_cycle() {
        let mut m = machine(0, 1);
        let base = Utc::now();
        m.update(false, base);
        m.update(false, at(base, 1_100));
        assert_eq!(m.state(), AttentionState::AlarmActive);

        assert!(m.alarm_flash_on(at(base, 1_100)));
        assert!(m.alarm_flash_on(at(base, 1_500)));
        assert!(!m.alarm_flash_on(at(base, 1_700)));
        assert!(m.alarm_flash_on(at(base, 2_200)));

        m.update(true, at(base, 2_300));
        assert!(!m.alarm_flash_on(at(base, 2_400)));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AttentionEvent::AlarmRaised {
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "alarm_raised");
    }
}
