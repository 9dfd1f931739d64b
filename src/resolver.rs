//! # Book Name Resolver
//!
//! Maps free text (`"1 cor"`, `"PSALM"`, `"jn"`) onto a canonical book name.
//!
//! Matching order:
//! 1. exact match on the normalized key (lowercase, alphanumerics only);
//! 2. alias table (optional, e.g. TSK abbreviations);
//! 3. the pluggable [`MatchStrategy`]: unique prefix, optionally followed by
//!    fuzzy nearest match.
//!
//! Several candidates at any stage is an error; a prefix stage with several
//! candidates never falls through to fuzzy matching.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use strsim::normalized_levenshtein;

use crate::error::{Result, ReviewError};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Outcome of one non-exact matching stage (indices into the key list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    None,
    Unique(usize),
    Many(Vec<usize>),
}

impl Candidates {
    fn from_vec(v: Vec<usize>) -> Self {
        match v.len() {
            0 => Candidates::None,
            1 => Candidates::Unique(v[0]),
            _ => Candidates::Many(v),
        }
    }
}

/// Non-exact matching policy, applied after exact and alias lookups failed.
pub trait MatchStrategy: Send + Sync + Debug {
    fn candidates(&self, query: &str, keys: &[String]) -> Candidates;
}

/// Unique prefix match only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactPrefix;

impl MatchStrategy for ExactPrefix {
    fn candidates(&self, query: &str, keys: &[String]) -> Candidates {
        prefix_candidates(query, keys)
    }
}

/// Unique prefix match, then the closest key by normalized Levenshtein
/// similarity when it reaches `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyClosest {
    pub threshold: f64,
}

impl Default for FuzzyClosest {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl MatchStrategy for FuzzyClosest {
    fn candidates(&self, query: &str, keys: &[String]) -> Candidates {
        match prefix_candidates(query, keys) {
            Candidates::None => {}
            found => return found,
        }

        let mut best = self.threshold;
        let mut hits: Vec<usize> = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            let sim = normalized_levenshtein(query, key);
            if sim + 1e-9 < best {
                continue;
            }
            if sim > best + 1e-9 {
                best = sim;
                hits.clear();
            }
            hits.push(i);
        }
        Candidates::from_vec(hits)
    }
}

fn prefix_candidates(query: &str, keys: &[String]) -> Candidates {
    Candidates::from_vec(
        keys.iter()
            .enumerate()
            .filter(|(_, k)| k.starts_with(query))
            .map(|(i, _)| i)
            .collect(),
    )
}

/// Config-level strategy choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    ExactPrefix,
    Fuzzy,
}

impl StrategyKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact_prefix" | "exact-prefix" | "prefix" => Some(Self::ExactPrefix),
            "fuzzy" | "fuzzy_closest" => Some(Self::Fuzzy),
            _ => None,
        }
    }

    pub fn build(self, fuzzy_threshold: f64) -> Box<dyn MatchStrategy> {
        match self {
            Self::ExactPrefix => Box::new(ExactPrefix),
            Self::Fuzzy => Box::new(FuzzyClosest {
                threshold: fuzzy_threshold.clamp(0.0, 1.0),
            }),
        }
    }
}

#[derive(Debug)]
pub struct BookResolver {
    books: Vec<String>,
    keys: Vec<String>,
    aliases: HashMap<String, usize>,
    strategy: Box<dyn MatchStrategy>,
}

impl BookResolver {
    /// Resolver over `books` with the default [`ExactPrefix`] strategy.
    pub fn new<I, S>(books: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let books: Vec<String> = books.into_iter().map(Into::into).collect();
        let keys = books.iter().map(|b| normalize(b)).collect();
        Self {
            books,
            keys,
            aliases: HashMap::new(),
            strategy: Box::new(ExactPrefix),
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn MatchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Add `alias → canonical` entries. Aliases pointing at books outside the
    /// resolver's list are ignored.
    pub fn with_aliases<I, A, C>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: AsRef<str>,
    {
        for (alias, canonical) in aliases {
            if let Some(i) = self.books.iter().position(|b| b == canonical.as_ref()) {
                self.aliases.insert(normalize(alias.as_ref()), i);
            }
        }
        self
    }

    pub fn books(&self) -> &[String] {
        &self.books
    }

    /// Resolve free text to a canonical book name.
    pub fn resolve_book(&self, text: &str) -> Result<&str> {
        let query = normalize(text);
        if query.is_empty() {
            return Err(ReviewError::UnknownBook(text.trim().to_string()));
        }

        if let Some(i) = self.keys.iter().position(|k| *k == query) {
            return Ok(&self.books[i]);
        }
        if let Some(&i) = self.aliases.get(&query) {
            return Ok(&self.books[i]);
        }

        match self.strategy.candidates(&query, &self.keys) {
            Candidates::Unique(i) => Ok(&self.books[i]),
            Candidates::Many(idxs) => Err(ReviewError::AmbiguousBook {
                input: text.trim().to_string(),
                candidates: idxs.into_iter().map(|i| self.books[i].clone()).collect(),
            }),
            Candidates::None => Err(ReviewError::UnknownBook(text.trim().to_string())),
        }
    }
}

/// Lowercase and keep only alphanumerics: `"1 Cor."` → `"1cor"`.
pub(crate) fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books;

    fn resolver() -> BookResolver {
        BookResolver::new(books::canonical_books())
    }

    #[test]
    fn exact_is_case_and_space_insensitive() {
        let r = resolver();
        assert_eq!(r.resolve_book("  jOhN ").unwrap(), "John");
        assert_eq!(r.resolve_book("1john").unwrap(), "1 John");
        assert_eq!(r.resolve_book("song of solomon").unwrap(), "Song of Solomon");
    }

    #[test]
    fn exact_wins_over_longer_prefix_matches() {
        let r = BookResolver::new(["Esther", "Esth", "Ezra"]);
        assert_eq!(r.resolve_book("esth").unwrap(), "Esth");
        assert_eq!(r.resolve_book("esthe").unwrap(), "Esther");
    }

    #[test]
    fn unique_prefix() {
        let r = resolver();
        assert_eq!(r.resolve_book("Gen").unwrap(), "Genesis");
        assert_eq!(r.resolve_book("psalm").unwrap(), "Psalms");
        assert_eq!(r.resolve_book("1 Cor.").unwrap(), "1 Corinthians");
    }

    #[test]
    fn ambiguous_prefix() {
        let r = BookResolver::new(["John", "Jonah", "Job"]);
        match r.resolve_book("jo") {
            Err(ReviewError::AmbiguousBook { candidates, .. }) => {
                assert_eq!(candidates, vec!["John", "Jonah", "Job"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn unknown_and_empty() {
        let r = resolver();
        assert!(matches!(r.resolve_book("Tobit"), Err(ReviewError::UnknownBook(_))));
        assert!(matches!(r.resolve_book("   "), Err(ReviewError::UnknownBook(_))));
    }

    #[test]
    fn fuzzy_recovers_typos_only_when_enabled() {
        let r = resolver();
        assert!(r.resolve_book("Mathew").is_err());

        let r = resolver().with_strategy(Box::new(FuzzyClosest::default()));
        assert_eq!(r.resolve_book("Mathew").unwrap(), "Matthew");
        assert_eq!(r.resolve_book("Revelations").unwrap(), "Revelation");
        assert!(matches!(r.resolve_book("xyzzy"), Err(ReviewError::UnknownBook(_))));
    }

    #[test]
    fn fuzzy_does_not_rescue_an_ambiguous_prefix() {
        let r = resolver().with_strategy(Box::new(FuzzyClosest::default()));
        assert!(matches!(
            r.resolve_book("jo"),
            Err(ReviewError::AmbiguousBook { .. })
        ));
    }

    #[test]
    fn aliases_come_before_prefix() {
        let r = resolver();
        assert!(matches!(r.resolve_book("jud"), Err(ReviewError::AmbiguousBook { .. })));

        let r = resolver().with_aliases(books::tsk_aliases());
        assert_eq!(r.resolve_book("jud").unwrap(), "Judges");
        assert_eq!(r.resolve_book("1co").unwrap(), "1 Corinthians");
        assert_eq!(r.resolve_book("mr").unwrap(), "Mark");
    }

    #[test]
    fn strategy_kind_parsing() {
        assert_eq!(StrategyKind::parse("FUZZY"), Some(StrategyKind::Fuzzy));
        assert_eq!(StrategyKind::parse("exact-prefix"), Some(StrategyKind::ExactPrefix));
        assert_eq!(StrategyKind::parse("nope"), None);
    }
}
