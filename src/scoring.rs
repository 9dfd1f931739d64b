//! # Verse-Distance Scorer
//!
//! Distance between a submitted and the actual verse is the gap in their
//! flat indexes (verses preceding them within the book).
//!
//! ```text
//! timePenalty = max(0, rtw × elapsed − grace)
//! score       = clamp(0, 100, floor(100 − dpw × distance − timePenalty))
//! rating      = from dpw × distance + rtw × elapsed   (grace not applied)
//!               ≤20 Easy, ≤40 Good, ≤60 Hard, else Again
//! ```

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::error::{Result, ReviewError};
use crate::metrics;
use crate::reference::VerseRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    fn from_penalty(penalty: f64) -> Self {
        if penalty <= 20.0 {
            Rating::Easy
        } else if penalty <= 40.0 {
            Rating::Good
        } else if penalty <= 60.0 {
            Rating::Hard
        } else {
            Rating::Again
        }
    }
}

/// What to do when the answer names a different book than the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossBookPolicy {
    /// Distance = corpus size, score 0, rating Again.
    #[default]
    MaxPenalty,
    /// Compare flat indexes as if both verses were in the same book.
    IgnoreBook,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub distance_penalty_weight: f64,
    pub response_time_weight: f64,
    pub grace_seconds: f64,
    pub cross_book: CrossBookPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            distance_penalty_weight: 1.0,
            response_time_weight: 0.5,
            grace_seconds: 10.0,
            cross_book: CrossBookPolicy::MaxPenalty,
        }
    }
}

impl ScoringConfig {
    /// Replace negative or non-finite weights with the defaults.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let pick = |v: f64, fallback: f64| if v.is_finite() && v >= 0.0 { v } else { fallback };
        Self {
            distance_penalty_weight: pick(self.distance_penalty_weight, d.distance_penalty_weight),
            response_time_weight: pick(self.response_time_weight, d.response_time_weight),
            grace_seconds: pick(self.grace_seconds, d.grace_seconds),
            cross_book: self.cross_book,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub distance: u64,
    pub score: u8,
    pub rating: Rating,
}

pub fn score(
    submitted: &VerseRef,
    actual: &VerseRef,
    elapsed_secs: f64,
    corpus: &Corpus,
    config: &ScoringConfig,
) -> Result<ScoreResult> {
    let sub_idx = corpus
        .flat_index(submitted)
        .ok_or_else(|| ReviewError::ReferenceNotFound(submitted.to_string()))?;
    let act_idx = corpus
        .flat_index(actual)
        .ok_or_else(|| ReviewError::ReferenceNotFound(actual.to_string()))?;

    let result = if submitted.book != actual.book && config.cross_book == CrossBookPolicy::MaxPenalty
    {
        ScoreResult {
            distance: corpus.total_verses() as u64,
            score: 0,
            rating: Rating::Again,
        }
    } else {
        let distance = sub_idx.abs_diff(act_idx) as u64;
        compute(distance, elapsed_secs, config)
    };

    metrics::incr_score(result.rating.as_str());
    Ok(result)
}

fn compute(distance: u64, elapsed_secs: f64, config: &ScoringConfig) -> ScoreResult {
    let elapsed = if elapsed_secs.is_finite() {
        elapsed_secs.max(0.0)
    } else {
        0.0
    };
    let distance_penalty = config.distance_penalty_weight * distance as f64;
    let time_cost = config.response_time_weight * elapsed;
    let time_penalty = (time_cost - config.grace_seconds).max(0.0);

    let raw = (100.0 - distance_penalty - time_penalty).floor();
    let score = if raw.is_nan() { 0 } else { raw.clamp(0.0, 100.0) as u8 };

    ScoreResult {
        distance,
        score,
        rating: Rating::from_penalty(distance_penalty + time_cost),
    }
}
