//! # Quiz loop
//!
//! Wires the pieces together for one user turn:
//! scope settings → cached pool → weighted draw → prompt with context →
//! typed answer (Strict) → score → scheduler → review state.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::cache::PoolCache;
use crate::config::ReviewConfig;
use crate::corpus::Corpus;
use crate::eligibility::ScopeSettings;
use crate::error::{Result, ReviewError};
use crate::reference::{ReferenceParser, VerseRef};
use crate::resolver::BookResolver;
use crate::review::{ReviewLog, ReviewStateProvider, Scheduler};
use crate::scoring::{self, ScoreResult, ScoringConfig};
use crate::weights::{self, WeightSource};

/// A verse to identify, with its neighbours for context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub verse: VerseRef,
    pub previous: String,
    pub text: String,
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub submitted: VerseRef,
    pub actual: VerseRef,
    pub result: ScoreResult,
    pub log: ReviewLog,
}

pub struct QuizEngine {
    corpus: Arc<Corpus>,
    parser: ReferenceParser,
    cache: PoolCache,
    scoring: ScoringConfig,
    sources: Vec<Box<dyn WeightSource>>,
}

impl QuizEngine {
    pub fn new(corpus: Arc<Corpus>, resolver: BookResolver) -> Self {
        Self {
            corpus,
            parser: ReferenceParser::new(resolver),
            cache: PoolCache::default(),
            scoring: ScoringConfig::default(),
            sources: Vec::new(),
        }
    }

    /// Engine with the configured resolver, scoring and cache. The resolver
    /// covers the books the corpus actually has.
    pub fn from_config(corpus: Arc<Corpus>, cfg: &ReviewConfig) -> Self {
        let resolver = cfg.book_resolver(corpus.book_names());
        Self::new(corpus, resolver)
            .with_scoring(cfg.scoring)
            .with_cache(cfg.pool_cache())
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring.sanitized();
        self
    }

    pub fn with_cache(mut self, cache: PoolCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_source(mut self, source: Box<dyn WeightSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn parser(&self) -> &ReferenceParser {
        &self.parser
    }

    pub fn next_prompt<P, R>(
        &self,
        user: &str,
        settings: &ScopeSettings,
        reviews: &P,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Prompt>
    where
        P: ReviewStateProvider + ?Sized,
        R: Rng + ?Sized,
    {
        let pool = self.cache.get_or_build(user, settings, &self.corpus, now);
        let sources: Vec<&dyn WeightSource> = self.sources.iter().map(|s| s.as_ref()).collect();
        let verse = weights::sample_verse(&pool, reviews, now, &sources, rng)?;

        let (previous, text, next) = self
            .corpus
            .surrounding(&verse)
            .ok_or_else(|| ReviewError::ReferenceNotFound(verse.to_string()))?;
        Ok(Prompt {
            previous: previous.to_string(),
            text: text.to_string(),
            next: next.to_string(),
            verse,
        })
    }

    /// Score a typed answer and hand the rating to the scheduler. Nothing is
    /// recorded when the answer does not parse.
    #[allow(clippy::too_many_arguments)]
    pub fn submit<P, S>(
        &self,
        user: &str,
        text: &str,
        actual: &VerseRef,
        elapsed_secs: f64,
        reviews: &P,
        scheduler: &S,
        now: DateTime<Utc>,
    ) -> Result<Answer>
    where
        S: Scheduler,
        P: ReviewStateProvider<Card = S::Card> + ?Sized,
    {
        let submitted = self.parser.parse_verse(text, &self.corpus)?;
        let result = scoring::score(&submitted, actual, elapsed_secs, &self.corpus, &self.scoring)?;

        let card = reviews
            .card(actual)
            .unwrap_or_else(|| scheduler.new_card(now));
        let (card, log) = scheduler.review_card(&card, result.rating, now);
        reviews.record(actual, card);

        info!(
            user,
            %submitted,
            %actual,
            distance = result.distance,
            score = result.score,
            rating = result.rating.as_str(),
            "answer scored"
        );
        Ok(Answer {
            submitted,
            actual: actual.clone(),
            result,
            log,
        })
    }

    /// Call after a user's scope settings were saved.
    pub fn save_settings(&self, user: &str) -> bool {
        self.cache.invalidate(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books;
    use crate::review::{InMemoryReviewStore, Sm2Card, Sm2Scheduler};
    use crate::scoring::Rating;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    fn engine() -> QuizEngine {
        let corpus = Corpus::builder()
            .chapter("Ruth", 1, (1..=22).map(|v| format!("ruth one {v}")))
            .build();
        QuizEngine::new(Arc::new(corpus), BookResolver::new(books::canonical_books()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn prompt_carries_context() {
        let e = engine();
        let store = InMemoryReviewStore::<Sm2Card>::new();
        let mut rng = StdRng::seed_from_u64(42);
        let p = e
            .next_prompt("u", &ScopeSettings::default(), &store, now(), &mut rng)
            .unwrap();
        assert_eq!(p.text, format!("ruth one {}", p.verse.verse));
        if p.verse.verse > 1 {
            assert_eq!(p.previous, format!("ruth one {}", p.verse.verse - 1));
        } else {
            assert_eq!(p.previous, "");
        }
    }

    #[test]
    fn submit_records_the_scheduled_card() {
        let e = engine();
        let store = InMemoryReviewStore::<Sm2Card>::new();
        let actual = VerseRef::new("Ruth", 1, 16);
        let a = e
            .submit("u", "ruth 1:16", &actual, 3.0, &store, &Sm2Scheduler, now())
            .unwrap();
        assert_eq!(a.result.rating, Rating::Easy);
        assert_eq!(a.result.score, 100);
        assert_eq!(store.due_date(&actual), Some(a.log.next_due));
    }

    #[test]
    fn unparseable_answer_records_nothing() {
        let e = engine();
        let store = InMemoryReviewStore::<Sm2Card>::new();
        let actual = VerseRef::new("Ruth", 1, 16);
        let err = e
            .submit("u", "where you go", &actual, 1.0, &store, &Sm2Scheduler, now())
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidFormat(_)));
        assert!(store.is_empty());
    }
}
