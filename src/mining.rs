//! # Citation mining
//!
//! Runs FreeText parsing over scraped resource sentences and counts how often
//! each verse is cited. Counts feed the sampler as secondary weight sources.
//!
//! Input sentences come from HTML and are messy: entities, typographic
//! dashes, and a handful of citations that lost their punctuation during
//! scraping. [`Normalizer`] cleans those up before parsing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::books;
use crate::corpus::Corpus;
use crate::reference::{normalize_dashes, Parsed, ReferenceParser, VerseRef};
use crate::weights::WeightSource;

/// Known-corrupted citations and their repairs.
pub const DEFAULT_REPLACEMENTS: [(&str, &str); 8] = [
    ("Jeremiah 32:374 1", "Jeremiah 32:37-41"),
    ("Ephesians 5:252 7", "Ephesians 5:25-27"),
    ("Matthew 27:27 37", "Matthew 27:27-37"),
    ("Colossians 1:212 2", "Colossians 1:21-22"),
    ("Acts 20:24 21 ; 19", "Acts 20:24; 21:19"),
    ("Matthew 18:8 25:42", "Matthew 18:8; 25:42"),
    ("Hebrews 13:13 10:32", "Hebrews 13:13; 10:32"),
    ("1 Peter 1:6 7", "1 Peter 1:6-7"),
];

/// Pre-parse cleanup: entity decoding, replacement table, dash folding.
#[derive(Debug, Clone)]
pub struct Normalizer {
    replacements: Vec<(String, String)>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_REPLACEMENTS
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string())),
        )
    }
}

impl Normalizer {
    pub fn new(replacements: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            replacements: replacements
                .into_iter()
                .filter(|(from, _)| !from.is_empty())
                .collect(),
        }
    }

    pub fn normalize(&self, text: &str) -> String {
        let mut out = html_escape::decode_html_entities(text).to_string();
        for (from, to) in &self.replacements {
            if out.contains(from.as_str()) {
                out = out.replace(from.as_str(), to);
            }
        }
        normalize_dashes(&out)
    }
}

/// Verse → citation count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionCounts {
    counts: HashMap<VerseRef, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionReport {
    pub reference: String,
    pub count: u32,
}

impl MentionCounts {
    pub fn get(&self, verse: &VerseRef) -> u32 {
        self.counts.get(verse).copied().unwrap_or(0)
    }

    pub fn add(&mut self, verse: VerseRef, n: u32) {
        *self.counts.entry(verse).or_default() += n;
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// Most cited first; ties in canonical order.
    pub fn report(&self) -> Vec<MentionReport> {
        let mut rows: Vec<(&VerseRef, u32)> = self.counts.iter().map(|(v, &c)| (v, c)).collect();
        rows.sort_by(|(va, ca), (vb, cb)| {
            cb.cmp(ca).then_with(|| {
                let pa = books::canonical_position(&va.book).unwrap_or(usize::MAX);
                let pb = books::canonical_position(&vb.book).unwrap_or(usize::MAX);
                (pa, &va.book, va.chapter, va.verse).cmp(&(pb, &vb.book, vb.chapter, vb.verse))
            })
        });
        rows.into_iter()
            .map(|(v, count)| MentionReport {
                reference: v.to_string(),
                count,
            })
            .collect()
    }

    /// Rebuild counts from a saved report. Rows whose reference does not
    /// strictly parse against `corpus` are skipped with a warning.
    pub fn from_report(rows: &[MentionReport], parser: &ReferenceParser, corpus: &Corpus) -> Self {
        let mut out = Self::default();
        for row in rows {
            match parser.parse_verse(&row.reference, corpus) {
                Ok(v) => out.add(v, row.count),
                Err(e) => warn!(reference = %row.reference, error = %e, "skipping invalid report row"),
            }
        }
        out
    }

    pub fn load_report(path: impl AsRef<Path>, parser: &ReferenceParser, corpus: &Corpus) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading mention report {}", path.display()))?;
        let rows: Vec<MentionReport> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing mention report {}", path.display()))?;
        Ok(Self::from_report(&rows, parser, corpus))
    }
}

impl WeightSource for MentionCounts {
    fn name(&self) -> &str {
        "mentions"
    }

    fn weight(&self, verse: &VerseRef) -> f64 {
        f64::from(self.get(verse))
    }
}

/// Accumulates FreeText citations over many sentences.
#[derive(Debug)]
pub struct MentionCounter<'a> {
    parser: &'a ReferenceParser,
    corpus: &'a Corpus,
    normalizer: Normalizer,
    counts: MentionCounts,
    sentences: usize,
    warnings: usize,
}

impl<'a> MentionCounter<'a> {
    pub fn new(parser: &'a ReferenceParser, corpus: &'a Corpus, normalizer: Normalizer) -> Self {
        Self {
            parser,
            corpus,
            normalizer,
            counts: MentionCounts::default(),
            sentences: 0,
            warnings: 0,
        }
    }

    /// Parse and count one sentence; the parse is returned for callers that
    /// also want the matches.
    pub fn add_text(&mut self, text: &str) -> Parsed {
        let parsed = self.parser.scan(&self.normalizer.normalize(text), self.corpus);
        for v in parsed.verses() {
            self.counts.add(v.clone(), 1);
        }
        self.sentences += 1;
        self.warnings += parsed.warnings.len();
        parsed
    }

    pub fn sentences(&self) -> usize {
        self.sentences
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn counts(&self) -> &MentionCounts {
        &self.counts
    }

    pub fn finish(self) -> MentionCounts {
        info!(
            sentences = self.sentences,
            verses = self.counts.len(),
            mentions = self.counts.total(),
            warnings = self.warnings,
            "mention counting finished"
        );
        self.counts
    }
}

/// One scraped resource: `{url: {"author": ..., "sentences": [...]}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub author: Option<String>,
    /// `null` when scraping failed.
    #[serde(default)]
    pub sentences: Option<Vec<String>>,
}

pub fn load_resources(path: impl AsRef<Path>) -> Result<BTreeMap<String, Resource>> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading resources {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing resources {}", path.display()))
}

/// Mention counts per author, limited to an allow-list.
#[derive(Debug, Clone, Default)]
pub struct AuthorMentions {
    allowed: HashSet<String>,
    by_author: BTreeMap<String, MentionCounts>,
}

impl AuthorMentions {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            by_author: BTreeMap::new(),
        }
    }

    pub fn allows(&self, author: &str) -> bool {
        self.allowed.contains(author)
    }

    /// Count every sentence of every allowed author's resources. Resources
    /// without an author or without sentences are skipped.
    pub fn collect(
        &mut self,
        resources: &BTreeMap<String, Resource>,
        parser: &ReferenceParser,
        corpus: &Corpus,
        normalizer: &Normalizer,
    ) {
        for (url, res) in resources {
            let Some(author) = res.author.as_deref().filter(|a| self.allows(a)) else {
                debug!(%url, "resource author not allowed, skipping");
                continue;
            };
            let Some(sentences) = &res.sentences else {
                continue;
            };
            let mut counter = MentionCounter::new(parser, corpus, normalizer.clone());
            for s in sentences {
                counter.add_text(s);
            }
            let counts = self.by_author.entry(author.to_string()).or_default();
            for (v, n) in counter.counts.counts {
                counts.add(v, n);
            }
        }
    }

    pub fn author(&self, name: &str) -> Option<&MentionCounts> {
        self.by_author.get(name)
    }

    pub fn authors(&self) -> impl Iterator<Item = &str> {
        self.by_author.keys().map(String::as_str)
    }

    /// All allowed authors' counts summed.
    pub fn merged(&self) -> MentionCounts {
        let mut out = MentionCounts::default();
        for counts in self.by_author.values() {
            for (v, &n) in &counts.counts {
                out.add(v.clone(), n);
            }
        }
        out
    }
}

impl WeightSource for AuthorMentions {
    fn name(&self) -> &str {
        "author_mentions"
    }

    fn weight(&self, verse: &VerseRef) -> f64 {
        self.by_author.values().map(|c| f64::from(c.get(verse))).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::BookResolver;

    fn corpus() -> Corpus {
        Corpus::builder()
            .chapter("Ruth", 1, (1..=22).map(|v| format!("r{v}")))
            .chapter("1 Peter", 1, (1..=25).map(|v| format!("p{v}")))
            .build()
    }

    fn parser() -> ReferenceParser {
        ReferenceParser::new(BookResolver::new(books::canonical_books()))
    }

    #[test]
    fn normalizer_repairs_known_citations() {
        let n = Normalizer::default();
        assert_eq!(
            n.normalize("trials ( 1 Peter 1:6 7 ) refine"),
            "trials ( 1 Peter 1:6-7 ) refine"
        );
        assert_eq!(n.normalize("Ruth 1:16&ndash;17"), "Ruth 1:16-17");
        assert_eq!(n.normalize("Ruth 1:16 \u{2014} 17"), "Ruth 1:16-17");
    }

    #[test]
    fn counter_counts_each_expanded_verse() {
        let c = corpus();
        let p = parser();
        let mut counter = MentionCounter::new(&p, &c, Normalizer::default());
        counter.add_text("Where you go I will go (Ruth 1:16-17).");
        counter.add_text("Ruth 1:16 again, and 1 Peter 1:6 7 .");
        let counts = counter.finish();
        assert_eq!(counts.get(&VerseRef::new("Ruth", 1, 16)), 2);
        assert_eq!(counts.get(&VerseRef::new("Ruth", 1, 17)), 1);
        assert_eq!(counts.get(&VerseRef::new("1 Peter", 1, 7)), 1);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn report_sorted_by_count_then_canon() {
        let mut m = MentionCounts::default();
        m.add(VerseRef::new("1 Peter", 1, 3), 2);
        m.add(VerseRef::new("Ruth", 1, 2), 2);
        m.add(VerseRef::new("Ruth", 1, 1), 5);
        let refs: Vec<String> = m.report().into_iter().map(|r| r.reference).collect();
        assert_eq!(refs, vec!["Ruth 1:1", "Ruth 1:2", "1 Peter 1:3"]);
    }

    #[test]
    fn report_rows_are_validated() {
        let c = corpus();
        let rows = vec![
            MentionReport {
                reference: "Ruth 1:1".into(),
                count: 3,
            },
            MentionReport {
                reference: "Ruth 9:1".into(),
                count: 7,
            },
        ];
        let m = MentionCounts::from_report(&rows, &parser(), &c);
        assert_eq!(m.len(), 1);
        assert_eq!(m.weight(&VerseRef::new("Ruth", 1, 1)), 3.0);
    }

    #[test]
    fn author_allow_list() {
        let c = corpus();
        let resources: BTreeMap<String, Resource> = serde_json::from_str(
            r#"{
                "https://a.example/1": {"author": "John Piper", "sentences": ["Ruth 1:1 and Ruth 1:2"]},
                "https://a.example/2": {"author": "Someone Else", "sentences": ["Ruth 1:1"]},
                "https://a.example/3": {"author": "John Piper", "sentences": null},
                "https://b.example/4": {"sentences": ["Ruth 1:3"]}
            }"#,
        )
        .unwrap();

        let mut am = AuthorMentions::new(["John Piper"]);
        am.collect(&resources, &parser(), &c, &Normalizer::default());
        assert_eq!(am.authors().collect::<Vec<_>>(), vec!["John Piper"]);
        assert_eq!(am.weight(&VerseRef::new("Ruth", 1, 1)), 1.0);
        assert_eq!(am.weight(&VerseRef::new("Ruth", 1, 3)), 0.0);
        assert_eq!(am.merged().total(), 2);
    }
}
