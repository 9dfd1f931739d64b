//! Treasury of Scripture Knowledge cross references.
//!
//! Source lines are tab-separated:
//! `book_key  chapter  verse  order  word  references`, where `book_key` is
//! the 1-based canonical book position and `references` is a `;`-separated
//! list using TSK abbreviations (`ge 1:1; joh 1:1-3; 2:5`). Lines with any
//! other shape are skipped.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::books::{self, TSK_ABBREVIATIONS};
use crate::reference::VerseRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XrefEntry {
    pub word: String,
    /// References with abbreviations expanded: `"John 1:1-3"`.
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CrossReferences {
    by_verse: HashMap<(usize, u32, u32), Vec<XrefEntry>>,
    skipped: usize,
}

impl CrossReferences {
    /// The file is Latin-1; each byte maps to the code point of equal value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("reading TSK file {}", path.display()))?;
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        let xrefs = Self::parse(&text);
        debug!(
            path = %path.display(),
            verses = xrefs.by_verse.len(),
            skipped = xrefs.skipped,
            "TSK cross references loaded"
        );
        Ok(xrefs)
    }

    pub fn parse(text: &str) -> Self {
        let mut out = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            let [book, chapter, verse, _order, word, refs] = parts.as_slice() else {
                out.skipped += 1;
                continue;
            };
            let (Ok(book), Ok(chapter), Ok(verse)) = (
                book.trim().parse::<usize>(),
                chapter.trim().parse::<u32>(),
                verse.trim().parse::<u32>(),
            ) else {
                out.skipped += 1;
                continue;
            };
            out.by_verse
                .entry((book, chapter, verse))
                .or_default()
                .push(XrefEntry {
                    word: word.trim().to_string(),
                    references: expand_abbreviations(refs),
                });
        }
        out
    }

    pub fn for_verse(&self, verse: &VerseRef) -> &[XrefEntry] {
        let Some(pos) = books::canonical_position(&verse.book) else {
            return &[];
        };
        self.by_verse
            .get(&(pos + 1, verse.chapter, verse.verse))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Verses with at least one entry.
    pub fn len(&self) -> usize {
        self.by_verse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_verse.is_empty()
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }
}

/// `"ge 1:1; joh 1:1-3; 2:5"` → `["Genesis 1:1", "John 1:1-3", "John 2:5"]`.
/// A bare `chapter:verse` continues the previous book; unknown
/// abbreviations are kept verbatim.
fn expand_abbreviations(refs: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut last_book: Option<&str> = None;
    for part in refs.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (abbr, rest) = match part.split_once(char::is_whitespace) {
            Some((a, r)) => (a, r.trim()),
            None => (part.split(':').next().unwrap_or(part), ""),
        };

        if !abbr.chars().any(char::is_alphabetic) {
            match last_book {
                Some(book) => out.push(format!("{book} {part}")),
                None => out.push(part.to_string()),
            }
            continue;
        }

        let key = abbr.to_ascii_lowercase();
        match TSK_ABBREVIATIONS.iter().find(|(a, _)| *a == key) {
            Some((_, name)) => {
                last_book = Some(*name);
                if rest.is_empty() {
                    out.push(name.to_string());
                } else {
                    out.push(format!("{name} {rest}"));
                }
            }
            None => out.push(part.to_string()),
        }
    }
    out
}
