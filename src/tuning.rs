//! Sensitivity tuning of the debounce floor.
//!
//! Compares a self-reported focus rating with a rating derived from the
//! session summary and recommends a new `min_look_away_duration`. A detector
//! that rates the user far below their own judgement is counting glances
//! that did not matter, so the floor goes up; one that rates them far above
//! is missing real look-aways, so the floor comes down.

use crate::session::SessionSummary;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Ratings are on a 1-10 scale.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

/// Ratings within this distance of each other are considered in agreement.
const AGREEMENT_TOLERANCE: i16 = 1;

/// Adjustment applied to the debounce floor per tuning round.
const ADJUSTMENT_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    #[error("focus rating {0} is outside 1-10")]
    RatingOutOfRange(u8),
}

/// How the detector compares with the user's own judgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityJudgement {
    TooSensitive,
    JustRight,
    NotSensitiveEnough,
}

impl std::fmt::Display for SensitivityJudgement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TooSensitive => "too sensitive",
            Self::JustRight => "just right",
            Self::NotSensitiveEnough => "not sensitive enough",
        };
        f.write_str(s)
    }
}

/// Outcome of one tuning round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningRecommendation {
    pub reported_rating: u8,
    pub computed_rating: u8,
    pub judgement: SensitivityJudgement,
    pub current_min_look_away_secs: f64,
    pub recommended_min_look_away_secs: f64,
    pub reason: String,
}

impl TuningRecommendation {
    pub fn recommended_min_look_away(&self) -> Duration {
        Duration::from_secs_f64(self.recommended_min_look_away_secs)
    }
}

/// Focus rating implied by a session: fewer and shorter look-aways rate higher.
///
/// Up to 5 points are lost to look-away frequency (half a point per
/// look-away per 10 minutes) and up to 5 to the fraction of time away.
pub fn computed_rating(summary: &SessionSummary) -> u8 {
    let minutes = summary.duration_secs / 60.0;
    let per_ten_minutes = if minutes > 0.0 {
        summary.look_away_count as f64 / minutes * 10.0
    } else {
        0.0
    };
    let away_fraction = (1.0 - summary.focus_ratio).clamp(0.0, 1.0);

    let score = 10.0 - (per_ten_minutes * 0.5).min(5.0) - (away_fraction * 10.0).min(5.0);
    score
        .round()
        .clamp(f64::from(MIN_RATING), f64::from(MAX_RATING)) as u8
}

/// Recommend a debounce floor from a self-reported rating.
///
/// A too-sensitive detector gets a longer floor and an insensitive one a
/// shorter floor. This departs from the feedback service's written rule,
/// which moved the value the other way.
pub fn recommend(
    summary: &SessionSummary,
    reported_rating: u8,
    current_min_look_away: Duration,
) -> Result<TuningRecommendation, TuningError> {
    if !(MIN_RATING..=MAX_RATING).contains(&reported_rating) {
        return Err(TuningError::RatingOutOfRange(reported_rating));
    }

    let computed = computed_rating(summary);
    let diff = i16::from(computed) - i16::from(reported_rating);

    let (judgement, recommended) = if diff < -AGREEMENT_TOLERANCE {
        (
            SensitivityJudgement::TooSensitive,
            current_min_look_away + ADJUSTMENT_STEP,
        )
    } else if diff > AGREEMENT_TOLERANCE {
        (
            SensitivityJudgement::NotSensitiveEnough,
            current_min_look_away.saturating_sub(ADJUSTMENT_STEP),
        )
    } else {
        (SensitivityJudgement::JustRight, current_min_look_away)
    };

    let reason = format!(
        "{} look-aways totalling {:.1}s over {:.1} min rate {}/10 against a self-rating of {}/10",
        summary.look_away_count,
        summary.total_look_away_secs,
        summary.duration_secs / 60.0,
        computed,
        reported_rating
    );
    tracing::info!(%judgement, computed, reported_rating, "Sensitivity tuned");

    Ok(TuningRecommendation {
        reported_rating,
        computed_rating: computed,
        judgement,
        current_min_look_away_secs: current_min_look_away.as_secs_f64(),
        recommended_min_look_away_secs: recommended.as_secs_f64(),
        reason,
    })
}
