//! # Dynamic Weight Updater
//!
//! Recomputed on every draw, never cached:
//!
//! ```text
//! weight(v) = (base(v) + Σ secondary(v)) × 10^min(MAX_EXP, daysOverdue(v))
//! ```
//!
//! A verse with no due date counts as due now (multiplier 1). Each weight is
//! capped at `f64::MAX / (pool_len + 1)` so that the pool total stays finite
//! after rounding.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

use crate::eligibility::EligiblePool;
use crate::error::Result;
use crate::metrics;
use crate::reference::VerseRef;
use crate::review::ReviewStateProvider;
use crate::sampler;

/// Largest power of ten representable in an `f64`.
pub const MAX_EXP: i32 = f64::MAX_10_EXP;

/// Extra per-verse weight added to the base weight, e.g. mention counts.
pub trait WeightSource: Send + Sync {
    fn name(&self) -> &str;

    fn weight(&self, verse: &VerseRef) -> f64;
}

/// Whole days past due, floored; never negative.
pub fn days_overdue(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    due.map_or(0, |d| (now - d).num_days().max(0))
}

pub fn overdue_multiplier(days: i64) -> f64 {
    let exp = days.clamp(0, i64::from(MAX_EXP)) as i32;
    10f64.powi(exp)
}

pub fn compute_weights<P>(
    pool: &EligiblePool,
    reviews: &P,
    now: DateTime<Utc>,
    sources: &[&dyn WeightSource],
) -> Vec<f64>
where
    P: ReviewStateProvider + ?Sized,
{
    let cap = f64::MAX / (pool.len() as f64 + 1.0);
    pool.entries()
        .iter()
        .map(|e| {
            let secondary: f64 = sources
                .iter()
                .map(|s| s.weight(&e.verse))
                .filter(|w| w.is_finite())
                .sum();
            let base = (e.weight + secondary).max(0.0);
            let w = base * overdue_multiplier(days_overdue(reviews.due_date(&e.verse), now));
            if w.is_finite() {
                w.min(cap)
            } else {
                cap
            }
        })
        .collect()
}

/// Draw the next verse to quiz.
pub fn sample_verse<P, R>(
    pool: &EligiblePool,
    reviews: &P,
    now: DateTime<Utc>,
    sources: &[&dyn WeightSource],
    rng: &mut R,
) -> Result<VerseRef>
where
    P: ReviewStateProvider + ?Sized,
    R: Rng + ?Sized,
{
    let weights = compute_weights(pool, reviews, now, sources);
    let entry = sampler::weighted_choice(pool.entries(), &weights, rng)?;
    debug!(verse = %entry.verse, pool = pool.len(), "sampled verse");
    metrics::incr(metrics::SAMPLES);
    Ok(entry.verse.clone())
}
