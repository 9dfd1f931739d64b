//! # Eligibility Set Builder
//!
//! Turns a user's scope selection (testaments, whole books, specific
//! chapters) into the pool of verses the sampler may draw from.
//!
//! - Empty selection: whole corpus.
//! - A book with a chapter list draws only from those chapters, even when it
//!   is also selected whole or through its testament.
//! - Unknown books and missing chapters are skipped with a warning.
//! - A selection that yields nothing falls back to the whole corpus, so the
//!   pool handed to the sampler is never empty for a non-empty corpus.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::books::Testament;
use crate::corpus::{Book, Corpus};
use crate::metrics;
use crate::reference::VerseRef;

/// Per-user quiz scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeSettings {
    pub testaments: Vec<Testament>,
    /// Books selected in full.
    pub books: Vec<String>,
    /// Books restricted to the listed chapters.
    pub chapters: BTreeMap<String, Vec<u32>>,
    pub translation: Option<String>,
}

impl ScopeSettings {
    pub fn is_empty(&self) -> bool {
        self.testaments.is_empty()
            && self.books.is_empty()
            && self.chapters.values().all(Vec::is_empty)
    }

    /// SHA-256 hex digest, insensitive to list order and duplicates.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        let testaments: BTreeSet<&Testament> = self.testaments.iter().collect();
        for t in testaments {
            hasher.update(format!("t:{t:?}\n").as_bytes());
        }
        let books: BTreeSet<&str> = self.books.iter().map(String::as_str).collect();
        for b in books {
            hasher.update(format!("b:{b}\n").as_bytes());
        }
        for (book, chapters) in &self.chapters {
            let chapters: BTreeSet<&u32> = chapters.iter().collect();
            if chapters.is_empty() {
                continue;
            }
            hasher.update(format!("c:{book}:{chapters:?}\n").as_bytes());
        }
        if let Some(tr) = &self.translation {
            hasher.update(format!("tr:{tr}\n").as_bytes());
        }

        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            let _ = write!(&mut out, "{b:02x}");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EligibleEntry {
    pub verse: VerseRef,
    pub weight: f64,
}

/// Canonically ordered candidate verses with their base weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EligiblePool {
    entries: Vec<EligibleEntry>,
    fell_back: bool,
}

impl EligiblePool {
    pub fn entries(&self) -> &[EligibleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, verse: &VerseRef) -> bool {
        self.entries.iter().any(|e| &e.verse == verse)
    }

    /// True when the selection produced nothing and the whole corpus was used.
    pub fn fell_back(&self) -> bool {
        self.fell_back
    }
}

enum Selection {
    All,
    Chapters(BTreeSet<u32>),
}

pub fn build_eligible_pool(settings: &ScopeSettings, corpus: &Corpus) -> EligiblePool {
    if settings.is_empty() {
        return whole_corpus(corpus, false);
    }

    let mut selected: BTreeMap<usize, Selection> = BTreeMap::new();
    let position = |name: &str| corpus.books().iter().position(|b| b.name == name);

    for (i, book) in corpus.books().iter().enumerate() {
        if book
            .testament
            .is_some_and(|t| settings.testaments.contains(&t))
        {
            selected.insert(i, Selection::All);
        }
    }

    for name in &settings.books {
        match position(name) {
            Some(i) => {
                selected.insert(i, Selection::All);
            }
            None => warn!(book = %name, "selected book not in corpus, skipping"),
        }
    }

    for (name, chapters) in &settings.chapters {
        if chapters.is_empty() {
            continue;
        }
        let Some(i) = position(name) else {
            warn!(book = %name, "selected book not in corpus, skipping");
            continue;
        };
        let book = &corpus.books()[i];
        let mut set = BTreeSet::new();
        for &ch in chapters {
            if book.chapter(ch).is_some() {
                set.insert(ch);
            } else {
                warn!(book = %name, chapter = ch, "selected chapter not in corpus, skipping");
            }
        }
        // A chapter list narrows a book also picked whole or by testament.
        if !set.is_empty() {
            selected.insert(i, Selection::Chapters(set));
        }
    }

    let mut entries = Vec::new();
    for (i, sel) in &selected {
        let book = &corpus.books()[*i];
        match sel {
            Selection::All => push_book(&mut entries, book, |_| true),
            Selection::Chapters(set) => push_book(&mut entries, book, |c| set.contains(&c)),
        }
    }

    if entries.is_empty() {
        warn!("scope selection produced no verses, falling back to whole corpus");
        metrics::incr(metrics::POOL_FALLBACKS);
        return whole_corpus(corpus, true);
    }

    debug!(verses = entries.len(), "eligible pool built");
    EligiblePool {
        entries,
        fell_back: false,
    }
}

fn whole_corpus(corpus: &Corpus, fell_back: bool) -> EligiblePool {
    let mut entries = Vec::with_capacity(corpus.total_verses());
    for book in corpus.books() {
        push_book(&mut entries, book, |_| true);
    }
    EligiblePool { entries, fell_back }
}

fn push_book(entries: &mut Vec<EligibleEntry>, book: &Book, keep: impl Fn(u32) -> bool) {
    for ch in book.chapters().iter().filter(|c| keep(c.number)) {
        for v in ch.verses() {
            entries.push(EligibleEntry {
                verse: VerseRef::new(book.name.clone(), ch.number, v.number),
                weight: v.base_weight,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        Corpus::builder()
            .chapter("Ruth", 1, ["r1", "r2"])
            .chapter("Ruth", 2, ["r3"])
            .weighted_verse("Jude", 1, 1, "j1", 3.0)
            .chapter("Mark", 1, ["m1"])
            .build()
    }

    fn books_of(pool: &EligiblePool) -> Vec<String> {
        pool.entries().iter().map(|e| e.verse.to_string()).collect()
    }

    #[test]
    fn empty_selection_is_whole_corpus() {
        let pool = build_eligible_pool(&ScopeSettings::default(), &corpus());
        assert_eq!(
            books_of(&pool),
            vec!["Ruth 1:1", "Ruth 1:2", "Ruth 2:1", "Mark 1:1", "Jude 1:1"]
        );
        assert!(!pool.fell_back());
        assert_eq!(pool.entries()[4].weight, 3.0);
    }

    #[test]
    fn testament_selects_its_books() {
        let s = ScopeSettings {
            testaments: vec![Testament::New],
            ..Default::default()
        };
        let pool = build_eligible_pool(&s, &corpus());
        assert_eq!(books_of(&pool), vec!["Mark 1:1", "Jude 1:1"]);
    }

    #[test]
    fn chapter_list_narrows_a_book_selected_whole() {
        let s = ScopeSettings {
            chapters: BTreeMap::from([("Ruth".into(), vec![2, 7])]),
            ..Default::default()
        };
        assert_eq!(books_of(&build_eligible_pool(&s, &corpus())), vec!["Ruth 2:1"]);

        let s = ScopeSettings {
            books: vec!["Ruth".into(), "Mark".into()],
            chapters: BTreeMap::from([("Ruth".into(), vec![2])]),
            ..Default::default()
        };
        assert_eq!(
            books_of(&build_eligible_pool(&s, &corpus())),
            vec!["Ruth 2:1", "Mark 1:1"]
        );

        let s = ScopeSettings {
            testaments: vec![Testament::Old],
            chapters: BTreeMap::from([("Ruth".into(), vec![1])]),
            ..Default::default()
        };
        assert_eq!(
            books_of(&build_eligible_pool(&s, &corpus())),
            vec!["Ruth 1:1", "Ruth 1:2"]
        );
    }

    #[test]
    fn chapter_list_with_no_known_chapter_keeps_whole_book() {
        let s = ScopeSettings {
            books: vec!["Ruth".into()],
            chapters: BTreeMap::from([("Ruth".into(), vec![9])]),
            ..Default::default()
        };
        let pool = build_eligible_pool(&s, &corpus());
        assert_eq!(pool.len(), 3);
        assert!(!pool.fell_back());
    }

    #[test]
    fn invalid_selection_falls_back() {
        let s = ScopeSettings {
            books: vec!["Tobit".into()],
            chapters: BTreeMap::from([("Ruth".into(), vec![40])]),
            ..Default::default()
        };
        let pool = build_eligible_pool(&s, &corpus());
        assert!(pool.fell_back());
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn fingerprint_ignores_order_and_duplicates() {
        let a = ScopeSettings {
            books: vec!["Ruth".into(), "Mark".into()],
            chapters: BTreeMap::from([("John".into(), vec![3, 1, 3])]),
            ..Default::default()
        };
        let b = ScopeSettings {
            books: vec!["Mark".into(), "Ruth".into(), "Mark".into()],
            chapters: BTreeMap::from([("John".into(), vec![1, 3])]),
            ..Default::default()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let c = ScopeSettings {
            translation: Some("kjv".into()),
            ..a.clone()
        };
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let s: ScopeSettings =
            serde_json::from_str(r#"{"testaments": ["OT"], "chapters": {"John": [3]}}"#).unwrap();
        assert_eq!(s.testaments, vec![Testament::Old]);
        assert!(s.books.is_empty());
    }
}
