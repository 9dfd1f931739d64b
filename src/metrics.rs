//! Counter names and one-time descriptions for the `metrics` facade.
//!
//! The library only emits; installing a recorder/exporter is the host's job.
//! Without one every call is a no-op.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

pub const POOL_CACHE_HITS: &str = "bible_review_pool_cache_hits_total";
pub const POOL_CACHE_MISSES: &str = "bible_review_pool_cache_misses_total";
pub const POOL_CACHE_INVALIDATIONS: &str = "bible_review_pool_cache_invalidations_total";
pub const POOL_FALLBACKS: &str = "bible_review_pool_fallbacks_total";
pub const SAMPLES: &str = "bible_review_samples_total";
pub const SCORES: &str = "bible_review_scores_total";

/// Register descriptions once so the series show up with help text.
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(POOL_CACHE_HITS, "Eligible pool served from the per-user cache.");
        describe_counter!(POOL_CACHE_MISSES, "Eligible pool rebuilt (absent, expired or settings changed).");
        describe_counter!(POOL_CACHE_INVALIDATIONS, "Explicit per-user pool invalidations.");
        describe_counter!(
            POOL_FALLBACKS,
            "Scope selections that produced no verses and fell back to the whole corpus."
        );
        describe_counter!(SAMPLES, "Verses drawn by the weighted sampler.");
        describe_counter!(SCORES, "Answers scored, labelled by rating.");
    });
}

pub(crate) fn incr(name: &'static str) {
    ensure_described();
    counter!(name).increment(1);
}

pub(crate) fn incr_score(rating: &'static str) {
    ensure_described();
    counter!(SCORES, "rating" => rating).increment(1);
}
