//! Gospel harmony lookup: which parallel-passage entries include a verse.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::books;
use crate::corpus::Corpus;
use crate::reference::{ReferenceParser, VerseRef};

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    category: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarmonyEntry {
    pub category: String,
    pub subject: String,
    pub references: Vec<String>,
    #[serde(skip)]
    verses: HashSet<VerseRef>,
}

impl HarmonyEntry {
    pub fn contains(&self, verse: &VerseRef) -> bool {
        self.verses.contains(verse)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Harmony {
    entries: Vec<HarmonyEntry>,
}

impl Harmony {
    /// `[{"category", "subject", "references": ["Matthew 3:13-17", ...]}]`.
    /// References are expanded once, here.
    pub fn from_json_str(s: &str, parser: &ReferenceParser, corpus: &Corpus) -> Result<Self> {
        let raw: Vec<RawEntry> = serde_json::from_str(s).context("invalid harmony JSON")?;
        let entries = raw
            .into_iter()
            .map(|e| {
                let verses = e
                    .references
                    .iter()
                    .flat_map(|r| parser.expand(r, corpus))
                    .collect();
                HarmonyEntry {
                    category: e.category,
                    subject: e.subject,
                    references: e.references,
                    verses,
                }
            })
            .collect::<Vec<_>>();
        debug!(entries = entries.len(), "harmony loaded");
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>, parser: &ReferenceParser, corpus: &Corpus) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading harmony from {}", path.display()))?;
        Self::from_json_str(&raw, parser, corpus)
            .with_context(|| format!("parsing harmony {}", path.display()))
    }

    /// Entries containing `verse`; always empty outside the four gospels.
    pub fn entries_for(&self, verse: &VerseRef) -> Vec<&HarmonyEntry> {
        if !books::is_gospel(&verse.book) {
            return Vec::new();
        }
        self.entries.iter().filter(|e| e.contains(verse)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::BookResolver;

    const JSON: &str = r#"[
        {"category": "Ministry", "subject": "Baptism of Jesus",
         "references": ["Matthew 3:13-17", "Mark 1:9-11"]},
        {"category": "Ministry", "subject": "Temptation",
         "references": ["Matthew 4:1-11", "Mark 1:12-13"]},
        {"category": "Prophecy", "subject": "Voice in the wilderness",
         "references": ["Isaiah 40:3", "Mark 1:3"]}
    ]"#;

    fn corpus() -> Corpus {
        Corpus::builder()
            .chapter("Isaiah", 40, (1..=31).map(|v| format!("i{v}")))
            .chapter("Matthew", 3, (1..=17).map(|v| format!("m3:{v}")))
            .chapter("Matthew", 4, (1..=25).map(|v| format!("m4:{v}")))
            .chapter("Mark", 1, (1..=45).map(|v| format!("k{v}")))
            .build()
    }

    fn harmony(c: &Corpus) -> Harmony {
        let p = ReferenceParser::new(BookResolver::new(books::canonical_books()));
        Harmony::from_json_str(JSON, &p, c).unwrap()
    }

    #[test]
    fn finds_entries_by_any_parallel() {
        let c = corpus();
        let h = harmony(&c);
        let hits = h.entries_for(&VerseRef::new("Mark", 1, 10));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subject, "Baptism of Jesus");

        assert!(h.entries_for(&VerseRef::new("Mark", 1, 14)).is_empty());
    }

    #[test]
    fn non_gospel_verses_never_match() {
        let c = corpus();
        let h = harmony(&c);
        assert_eq!(h.len(), 3);
        assert!(h.entries_for(&VerseRef::new("Isaiah", 40, 3)).is_empty());
        assert_eq!(h.entries_for(&VerseRef::new("Mark", 1, 3)).len(), 1);
    }
}
