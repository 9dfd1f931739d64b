//! # Corpus
//!
//! Canonical `book → chapter → verse` store for one translation.
//!
//! - Chapter and verse keys arrive as strings in the JSON translation files;
//!   they are parsed to integers once, at load time, and stored in sorted
//!   vectors. Ordering never depends on string comparison.
//! - Every book keeps per-chapter prefix sums, so the flat index of a verse
//!   (its ordinal position within the book) is a binary search plus an add.
//! - Books are ordered canonically (Genesis..Revelation); names that are not
//!   canonical follow, alphabetically.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::books::{self, Testament};
use crate::reference::VerseRef;

#[derive(Debug, Clone, PartialEq)]
pub struct Verse {
    pub number: u32,
    pub text: String,
    /// Prior sampling weight (1.0 unless the translation file says otherwise).
    pub base_weight: f64,
    /// How often the verse was cited in the mined resource corpus.
    pub mentions: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub number: u32,
    verses: Vec<Verse>,
}

impl Chapter {
    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn verse(&self, number: u32) -> Option<&Verse> {
        self.position(number).map(|i| &self.verses[i])
    }

    pub fn last_verse(&self) -> Option<u32> {
        self.verses.last().map(|v| v.number)
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    fn position(&self, number: u32) -> Option<usize> {
        self.verses.binary_search_by_key(&number, |v| v.number).ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub name: String,
    pub testament: Option<Testament>,
    chapters: Vec<Chapter>,
    /// `offsets[i]` = number of verses in chapters `0..i`.
    offsets: Vec<usize>,
}

impl Book {
    fn new(name: String, chapters: Vec<Chapter>) -> Self {
        let mut offsets = Vec::with_capacity(chapters.len());
        let mut acc = 0usize;
        for ch in &chapters {
            offsets.push(acc);
            acc += ch.len();
        }
        Self {
            testament: books::testament_of(&name),
            name,
            chapters,
            offsets,
        }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, number: u32) -> Option<&Chapter> {
        self.chapter_position(number).map(|i| &self.chapters[i])
    }

    pub fn is_single_chapter(&self) -> bool {
        self.chapters.len() == 1
    }

    pub fn verse_count(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0) + self.chapters.last().map_or(0, Chapter::len)
    }

    /// Number of verses strictly preceding `chapter:verse` in this book.
    pub fn flat_index(&self, chapter: u32, verse: u32) -> Option<usize> {
        let ci = self.chapter_position(chapter)?;
        let vi = self.chapters[ci].position(verse)?;
        Some(self.offsets[ci] + vi)
    }

    fn chapter_position(&self, number: u32) -> Option<usize> {
        self.chapters.binary_search_by_key(&number, |c| c.number).ok()
    }
}

/// Immutable, integer-indexed corpus. Build once, share behind `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    books: Vec<Book>,
    index: HashMap<String, usize>,
    total_verses: usize,
}

/// How the verse base weight is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseWeightPolicy {
    /// Keep the weight stored in the translation file (default 1.0).
    #[default]
    Stored,
    /// `1 + mentions`: frequently cited verses come up more often.
    Mentions,
}

impl Corpus {
    pub fn builder() -> CorpusBuilder {
        CorpusBuilder::default()
    }

    /// Load a translation from `.json` or `.xml`, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading corpus from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let corpus = match ext.as_str() {
            "xml" => Self::from_xml_str(&content),
            _ => Self::from_json_str(&content),
        }
        .with_context(|| format!("parsing corpus {}", path.display()))?;
        debug!(
            path = %path.display(),
            books = corpus.books.len(),
            verses = corpus.total_verses,
            "corpus loaded"
        );
        Ok(corpus)
    }

    /// JSON shape: `{"John": {"3": {"16": {"text": "...", "biblerefs": 12}}}}`.
    /// A verse may also be a bare string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, BTreeMap<String, RawVerse>>> =
            serde_json::from_str(s).context("corpus JSON does not match book/chapter/verse shape")?;

        let mut builder = CorpusBuilder::default();
        for (book, chapters) in raw {
            for (ch_key, verses) in chapters {
                let Some(ch) = parse_ordinal(&ch_key) else {
                    warn!(%book, key = %ch_key, "skipping non-numeric chapter key");
                    continue;
                };
                for (v_key, raw_verse) in verses {
                    let Some(v) = parse_ordinal(&v_key) else {
                        warn!(%book, chapter = ch, key = %v_key, "skipping non-numeric verse key");
                        continue;
                    };
                    let (text, weight, mentions) = raw_verse.into_parts();
                    builder.insert(&book, ch, v, text, weight, mentions);
                }
            }
        }
        Ok(builder.build())
    }

    /// Translation XML: `<bible><b n="Genesis"><c><v n="1">...</v></c></b></bible>`.
    /// Chapters are numbered by position within the book.
    pub fn from_xml_str(s: &str) -> Result<Self> {
        let doc: XmlBible = quick_xml::de::from_str(s).context("invalid translation XML")?;
        let mut builder = CorpusBuilder::default();
        for book in doc.books {
            for (i, chapter) in book.chapters.into_iter().enumerate() {
                let ch = (i + 1) as u32;
                for verse in chapter.verses {
                    builder.insert(&book.name, ch, verse.number, verse.text.trim().to_string(), None, 0);
                }
            }
        }
        Ok(builder.build())
    }

    pub fn with_base_weight_policy(mut self, policy: BaseWeightPolicy) -> Self {
        if policy == BaseWeightPolicy::Mentions {
            for book in &mut self.books {
                for ch in &mut book.chapters {
                    for v in &mut ch.verses {
                        v.base_weight = 1.0 + f64::from(v.mentions);
                    }
                }
            }
        }
        self
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book(&self, name: &str) -> Option<&Book> {
        self.index.get(name).map(|&i| &self.books[i])
    }

    pub fn book_names(&self) -> impl Iterator<Item = &str> {
        self.books.iter().map(|b| b.name.as_str())
    }

    pub fn chapter(&self, book: &str, chapter: u32) -> Option<&Chapter> {
        self.book(book)?.chapter(chapter)
    }

    pub fn verse(&self, r: &VerseRef) -> Option<&Verse> {
        self.chapter(&r.book, r.chapter)?.verse(r.verse)
    }

    pub fn contains(&self, r: &VerseRef) -> bool {
        self.verse(r).is_some()
    }

    pub fn flat_index(&self, r: &VerseRef) -> Option<usize> {
        self.book(&r.book)?.flat_index(r.chapter, r.verse)
    }

    pub fn total_verses(&self) -> usize {
        self.total_verses
    }

    /// Every verse in canonical order.
    pub fn verse_refs(&self) -> impl Iterator<Item = VerseRef> + '_ {
        self.books.iter().flat_map(|b| {
            b.chapters.iter().flat_map(move |c| {
                c.verses
                    .iter()
                    .map(move |v| VerseRef::new(b.name.clone(), c.number, v.number))
            })
        })
    }

    /// `(previous, current, next)` verse texts within the same chapter;
    /// empty strings at the chapter edges.
    pub fn surrounding(&self, r: &VerseRef) -> Option<(&str, &str, &str)> {
        let ch = self.chapter(&r.book, r.chapter)?;
        let i = ch.position(r.verse)?;
        let prev = if i > 0 { ch.verses[i - 1].text.as_str() } else { "" };
        let next = ch.verses.get(i + 1).map_or("", |v| v.text.as_str());
        Some((prev, ch.verses[i].text.as_str(), next))
    }
}

/// Incremental corpus construction; keys are sorted numerically on `build`.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    books: BTreeMap<String, BTreeMap<u32, BTreeMap<u32, Verse>>>,
}

impl CorpusBuilder {
    pub fn verse(mut self, book: &str, chapter: u32, verse: u32, text: impl Into<String>) -> Self {
        self.insert(book, chapter, verse, text.into(), None, 0);
        self
    }

    pub fn weighted_verse(
        mut self,
        book: &str,
        chapter: u32,
        verse: u32,
        text: impl Into<String>,
        weight: f64,
    ) -> Self {
        self.insert(book, chapter, verse, text.into(), Some(weight), 0);
        self
    }

    /// Chapter `chapter` of `book` with the given verse texts, numbered from 1.
    pub fn chapter<I, S>(mut self, book: &str, chapter: u32, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (i, text) in texts.into_iter().enumerate() {
            self.insert(book, chapter, (i + 1) as u32, text.into(), None, 0);
        }
        self
    }

    fn insert(
        &mut self,
        book: &str,
        chapter: u32,
        verse: u32,
        text: String,
        weight: Option<f64>,
        mentions: u32,
    ) {
        if chapter == 0 || verse == 0 {
            warn!(book, chapter, verse, "skipping zero chapter/verse ordinal");
            return;
        }
        let base_weight = match weight {
            Some(w) if w.is_finite() && w > 0.0 => w,
            _ => 1.0,
        };
        self.books
            .entry(book.trim().to_string())
            .or_default()
            .entry(chapter)
            .or_default()
            .insert(
                verse,
                Verse {
                    number: verse,
                    text,
                    base_weight,
                    mentions,
                },
            );
    }

    pub fn build(self) -> Corpus {
        let mut books: Vec<Book> = self
            .books
            .into_iter()
            .map(|(name, chapters)| {
                let chapters = chapters
                    .into_iter()
                    .map(|(number, verses)| Chapter {
                        number,
                        verses: verses.into_values().collect(),
                    })
                    .collect();
                Book::new(name, chapters)
            })
            .collect();

        // Canonical books first in canonical order, then the rest by name.
        books.sort_by(|a, b| {
            let ka = books::canonical_position(&a.name).unwrap_or(usize::MAX);
            let kb = books::canonical_position(&b.name).unwrap_or(usize::MAX);
            ka.cmp(&kb).then_with(|| a.name.cmp(&b.name))
        });

        let index = books
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        let total_verses = books.iter().map(Book::verse_count).sum();

        Corpus {
            books,
            index,
            total_verses,
        }
    }
}

fn parse_ordinal(key: &str) -> Option<u32> {
    key.trim().parse::<u32>().ok().filter(|&n| n > 0)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVerse {
    Text(String),
    Full {
        #[serde(default)]
        text: String,
        #[serde(default)]
        weight: Option<f64>,
        #[serde(default)]
        biblerefs: Option<u32>,
    },
}

impl RawVerse {
    fn into_parts(self) -> (String, Option<f64>, u32) {
        match self {
            RawVerse::Text(t) => (t, None, 0),
            RawVerse::Full {
                text,
                weight,
                biblerefs,
            } => (text, weight, biblerefs.unwrap_or(0)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlBible {
    #[serde(rename = "b", default)]
    books: Vec<XmlBook>,
}

#[derive(Debug, Deserialize)]
struct XmlBook {
    #[serde(rename = "@n")]
    name: String,
    #[serde(rename = "c", default)]
    chapters: Vec<XmlChapter>,
}

#[derive(Debug, Deserialize)]
struct XmlChapter {
    #[serde(rename = "v", default)]
    verses: Vec<XmlVerse>,
}

#[derive(Debug, Deserialize)]
struct XmlVerse {
    #[serde(rename = "@n")]
    number: u32,
    #[serde(rename = "$text", default)]
    text: String,
}
