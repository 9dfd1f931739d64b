//! Review state and scheduler seams.
//!
//! The quiz core reads one thing from review state (when a verse is due) and
//! writes one thing back (the card the scheduler produced for a rating).
//! Scheduling itself is external; [`Sm2Scheduler`] is a small SM-2 adapter
//! so the loop runs end-to-end without one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::reference::VerseRef;
use crate::scoring::Rating;

/// A scheduler card that knows when it is next due.
pub trait DueCard: Clone {
    fn due(&self) -> DateTime<Utc>;
}

/// One user's review state.
pub trait ReviewStateProvider {
    type Card: DueCard;

    fn card(&self, verse: &VerseRef) -> Option<Self::Card>;

    fn record(&self, verse: &VerseRef, card: Self::Card);

    /// `None` when the verse was never reviewed (treated as due now).
    fn due_date(&self, verse: &VerseRef) -> Option<DateTime<Utc>> {
        self.card(verse).map(|c| c.due())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewLog {
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
    pub next_due: DateTime<Utc>,
}

/// Narrow contract of the external spaced-repetition engine.
pub trait Scheduler {
    type Card: DueCard;

    fn new_card(&self, now: DateTime<Utc>) -> Self::Card;

    fn review_card(
        &self,
        card: &Self::Card,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> (Self::Card, ReviewLog);
}

/// Mutex-guarded map of cards for a single user.
#[derive(Debug)]
pub struct InMemoryReviewStore<C> {
    inner: Mutex<HashMap<VerseRef, C>>,
}

impl<C> Default for InMemoryReviewStore<C> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<C: DueCard> InMemoryReviewStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("review store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: DueCard> ReviewStateProvider for InMemoryReviewStore<C> {
    type Card = C;

    fn card(&self, verse: &VerseRef) -> Option<C> {
        self.inner
            .lock()
            .expect("review store mutex poisoned")
            .get(verse)
            .cloned()
    }

    fn record(&self, verse: &VerseRef, card: C) {
        self.inner
            .lock()
            .expect("review store mutex poisoned")
            .insert(verse.clone(), card);
    }
}

pub const SM2_INITIAL_EASE: f64 = 2.5;
pub const SM2_MIN_EASE: f64 = 1.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sm2Card {
    pub ease: f64,
    pub interval_days: i64,
    pub repetitions: u32,
    pub due: DateTime<Utc>,
}

impl DueCard for Sm2Card {
    fn due(&self) -> DateTime<Utc> {
        self.due
    }
}

/// SM-2: quality < 3 resets the card, otherwise 1 day → 6 days → × ease.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sm2Scheduler;

impl Sm2Scheduler {
    fn quality(rating: Rating) -> u8 {
        match rating {
            Rating::Again => 1,
            Rating::Hard => 3,
            Rating::Good => 4,
            Rating::Easy => 5,
        }
    }
}

impl Scheduler for Sm2Scheduler {
    type Card = Sm2Card;

    fn new_card(&self, now: DateTime<Utc>) -> Sm2Card {
        Sm2Card {
            ease: SM2_INITIAL_EASE,
            interval_days: 0,
            repetitions: 0,
            due: now,
        }
    }

    fn review_card(&self, card: &Sm2Card, rating: Rating, now: DateTime<Utc>) -> (Sm2Card, ReviewLog) {
        let q = f64::from(Self::quality(rating));
        let ease = (card.ease + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02))).max(SM2_MIN_EASE);

        let (interval_days, repetitions) = if q < 3.0 {
            (0, 0)
        } else {
            let reps = card.repetitions + 1;
            let interval = match reps {
                1 => 1,
                2 => 6,
                _ => (card.interval_days as f64 * ease).round() as i64,
            };
            (interval, reps)
        };

        let due = now + Duration::days(interval_days);
        let next = Sm2Card {
            ease,
            interval_days,
            repetitions,
            due,
        };
        let log = ReviewLog {
            rating,
            reviewed_at: now,
            next_due: due,
        };
        (next, log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn good_answers_grow_the_interval() {
        let s = Sm2Scheduler;
        let c = s.new_card(t0());
        let (c, _) = s.review_card(&c, Rating::Good, t0());
        assert_eq!((c.interval_days, c.repetitions), (1, 1));
        let (c, _) = s.review_card(&c, Rating::Good, t0());
        assert_eq!((c.interval_days, c.repetitions), (6, 2));
        let (c, log) = s.review_card(&c, Rating::Easy, t0());
        assert!(c.interval_days > 6);
        assert_eq!(log.next_due, t0() + Duration::days(c.interval_days));
    }

    #[test]
    fn again_resets_and_ease_has_a_floor() {
        let s = Sm2Scheduler;
        let mut c = Sm2Card {
            ease: 1.35,
            interval_days: 30,
            repetitions: 5,
            due: t0(),
        };
        for _ in 0..3 {
            c = s.review_card(&c, Rating::Again, t0()).0;
        }
        assert_eq!((c.interval_days, c.repetitions), (0, 0));
        assert_eq!(c.ease, SM2_MIN_EASE);
        assert_eq!(c.due, t0());
    }

    #[test]
    fn store_reports_due_dates() {
        let store = InMemoryReviewStore::<Sm2Card>::new();
        let v = VerseRef::new("Ruth", 1, 16);
        assert_eq!(store.due_date(&v), None);

        let (card, _) = Sm2Scheduler.review_card(&Sm2Scheduler.new_card(t0()), Rating::Good, t0());
        store.record(&v, card);
        assert_eq!(store.due_date(&v), Some(t0() + Duration::days(1)));
        assert_eq!(store.len(), 1);
    }
}
