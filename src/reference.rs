//! # Reference tokenizer & range expander
//!
//! Two entry modes:
//! - **Strict**: the whole input is one `<book> <chapter>:<verse>`; shape,
//!   book and corpus failures are returned as typed errors.
//! - **FreeText**: scans prose for citation blocks such as
//!   `Job 1:6 , 12 , 21-22 ; 2:6-7` or `2 Corinthians 6:18-7:1`. Anomalies
//!   (backward ranges, verses the corpus does not have, footnote markers,
//!   chapter-only blocks) are salvaged or skipped and reported as
//!   [`RangeWarning`]s; this mode never fails.
//!
//! Block grammar: segments separated by `;` (new chapter context) or `,`
//! (same chapter). A segment is `n`, `c:v`, `c:v-v`, `c:v-c:v`, optionally
//! with a one-letter partial-verse suffix (`26a`) that is dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::books;
use crate::corpus::{Book, Corpus};
use crate::error::{Result, ReviewError};
use crate::resolver::BookResolver;

/// Canonical `(book, chapter, verse)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerseRef {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
}

impl VerseRef {
    pub fn new(book: impl Into<String>, chapter: u32, verse: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
            verse,
        }
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    Strict,
    FreeText,
}

/// One citation block, fully expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceMatch {
    pub original_text: String,
    pub book: String,
    /// Ascending, deduplicated.
    pub chapters: Vec<u32>,
    /// Ascending by chapter then verse; duplicates preserved.
    pub verses: Vec<VerseRef>,
}

impl ReferenceMatch {
    pub fn contains(&self, verse: &VerseRef) -> bool {
        self.verses.iter().any(|v| v == verse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// `end < start`; only the start verse was kept.
    BackwardRange { start: String, end: String },
    BookNotInCorpus,
    ChapterNotFound { chapter: u32 },
    /// A contiguous run of verses absent from the corpus.
    VersesNotFound { chapter: u32, first: u32, last: u32 },
    /// A trailing space-separated integer after the block (`15:55 7`).
    FootnoteDropped { marker: String },
    /// The block named no verse at all and was discarded.
    NoVerses,
}

/// Non-fatal anomaly recovered locally during expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeWarning {
    pub reference: String,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl fmt::Display for RangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::BackwardRange { start, end } => write!(
                f,
                "{}: backward range {start}-{end}, using only {start}",
                self.reference
            ),
            WarningKind::BookNotInCorpus => write!(f, "{}: book not in corpus", self.reference),
            WarningKind::ChapterNotFound { chapter } => {
                write!(f, "{}: chapter {chapter} not found", self.reference)
            }
            WarningKind::VersesNotFound {
                chapter,
                first,
                last,
            } if first == last => write!(f, "{}: verse {chapter}:{first} not found", self.reference),
            WarningKind::VersesNotFound {
                chapter,
                first,
                last,
            } => write!(
                f,
                "{}: verses {chapter}:{first}-{last} not found",
                self.reference
            ),
            WarningKind::FootnoteDropped { marker } => {
                write!(f, "{}: dropped trailing footnote marker {marker}", self.reference)
            }
            WarningKind::NoVerses => write!(f, "{}: no verse specified", self.reference),
        }
    }
}

/// Matches plus the warnings collected while expanding them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parsed {
    pub matches: Vec<ReferenceMatch>,
    pub warnings: Vec<RangeWarning>,
}

impl Parsed {
    /// All expanded verses across matches, in match order.
    pub fn verses(&self) -> impl Iterator<Item = &VerseRef> {
        self.matches.iter().flat_map(|m| m.verses.iter())
    }
}

static STRICT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<book>(?:[1-3]\s*)?[^\d:]+?)\s+(?P<chapter>\d+)\s*:\s*(?P<verse>\d+)[a-z]?\s*$",
    )
    .expect("strict reference regex")
});

static DASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d)\s*[-\u{2010}-\u{2015}\u{2212}]\s*(\d)").expect("dash regex")
});

static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<a>\d+)(?::(?P<b>\d+))?(?:[a-z]\b)?(?:-(?P<c>\d+)(?::(?P<d>\d+))?(?:[a-z]\b)?)?$",
    )
    .expect("segment regex")
});

static FOOTNOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+(?P<n>\d+)\s*(?P<next>\S)?").expect("footnote regex"));

const SEGMENT: &str = r"\d+(?::\d+)?(?:[a-z]\b)?(?:-\d+(?::\d+)?(?:[a-z]\b)?)?";

/// Parser with a precompiled FreeText book pattern. Build once, reuse.
#[derive(Debug)]
pub struct ReferenceParser {
    resolver: BookResolver,
    block_re: Regex,
}

impl ReferenceParser {
    pub fn new(resolver: BookResolver) -> Self {
        let block_re = block_regex(&resolver);
        Self { resolver, block_re }
    }

    pub fn resolver(&self) -> &BookResolver {
        &self.resolver
    }

    pub fn parse(&self, text: &str, mode: ParseMode, corpus: &Corpus) -> Result<Parsed> {
        match mode {
            ParseMode::Strict => parse_strict(text, corpus, &self.resolver),
            ParseMode::FreeText => Ok(scan(text, corpus, &self.resolver, &self.block_re)),
        }
    }

    /// Strict parse down to the single verse.
    pub fn parse_verse(&self, text: &str, corpus: &Corpus) -> Result<VerseRef> {
        let parsed = parse_strict(text, corpus, &self.resolver)?;
        let verse = parsed.matches.into_iter().flat_map(|m| m.verses).next();
        verse.ok_or_else(|| ReviewError::InvalidFormat(text.to_string()))
    }

    /// FreeText scan.
    pub fn scan(&self, text: &str, corpus: &Corpus) -> Parsed {
        scan(text, corpus, &self.resolver, &self.block_re)
    }

    /// FreeText scan flattened to verses.
    pub fn expand(&self, text: &str, corpus: &Corpus) -> Vec<VerseRef> {
        self.scan(text, corpus)
            .matches
            .into_iter()
            .flat_map(|m| m.verses)
            .collect()
    }
}

/// One-shot parse. FreeText compiles the book pattern on every call; keep a
/// [`ReferenceParser`] around when scanning many texts.
pub fn parse_reference(
    text: &str,
    mode: ParseMode,
    corpus: &Corpus,
    resolver: &BookResolver,
) -> Result<Parsed> {
    match mode {
        ParseMode::Strict => parse_strict(text, corpus, resolver),
        ParseMode::FreeText => Ok(scan(text, corpus, resolver, &block_regex(resolver))),
    }
}

fn parse_strict(text: &str, corpus: &Corpus, resolver: &BookResolver) -> Result<Parsed> {
    let caps = STRICT_RE
        .captures(text)
        .ok_or_else(|| ReviewError::InvalidFormat(text.trim().to_string()))?;
    let book_text = &caps["book"];
    if !book_text.chars().any(char::is_alphabetic) {
        return Err(ReviewError::InvalidFormat(text.trim().to_string()));
    }
    let (Ok(chapter), Ok(verse)) = (caps["chapter"].parse::<u32>(), caps["verse"].parse::<u32>())
    else {
        return Err(ReviewError::InvalidFormat(text.trim().to_string()));
    };

    let book = resolver.resolve_book(book_text)?;
    let verse_ref = VerseRef::new(book, chapter, verse);
    if !corpus.contains(&verse_ref) {
        return Err(ReviewError::ReferenceNotFound(verse_ref.to_string()));
    }

    Ok(Parsed {
        matches: vec![ReferenceMatch {
            original_text: text.trim().to_string(),
            book: book.to_string(),
            chapters: vec![chapter],
            verses: vec![verse_ref],
        }],
        warnings: Vec::new(),
    })
}

/// `\b(book alternatives)\s+(segment (sep segment)*)`, longest names first.
///
/// Only full book names take part; short aliases (`so`, `am`, `re`) read as
/// ordinary words in prose and stay on the Strict path.
fn block_regex(resolver: &BookResolver) -> Regex {
    let mut names: Vec<String> = resolver
        .books()
        .iter()
        .map(|b| book_name_pattern(b))
        .collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    names.dedup();

    let pattern = format!(
        r"(?i)\b(?P<book>{})\s+(?P<block>{SEGMENT}(?:\s*[;,]\s*{SEGMENT})*)",
        names.join("|")
    );
    Regex::new(&pattern).expect("book names are escaped")
}

/// `"1 John"` → `1\s*John`, `"Song of Solomon"` → `Song\s+of\s+Solomon`.
fn book_name_pattern(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            let after_number = parts[i - 1].chars().all(|c| c.is_ascii_digit());
            out.push_str(if after_number { r"\s*" } else { r"\s+" });
        }
        out.push_str(&regex::escape(part));
    }
    out
}

/// Replace typographic dashes with `-` and drop spaces around a dash that
/// sits between two numbers (`6:18 – 7:1` → `6:18-7:1`).
pub fn normalize_dashes(text: &str) -> String {
    DASH_RE.replace_all(text, "$1-$2").into_owned()
}

fn scan(text: &str, corpus: &Corpus, resolver: &BookResolver, block_re: &Regex) -> Parsed {
    let text = normalize_dashes(text);
    let mut parsed = Parsed::default();

    for caps in block_re.captures_iter(&text) {
        let (Some(whole), Some(book_m), Some(block_m)) =
            (caps.get(0), caps.name("book"), caps.name("block"))
        else {
            continue;
        };
        let original = whole.as_str().trim().to_string();

        let Ok(book_name) = resolver.resolve_book(book_m.as_str()) else {
            debug!(book = book_m.as_str(), "matched book text did not resolve");
            continue;
        };
        let Some(book) = corpus.book(book_name) else {
            push_warning(&mut parsed.warnings, &original, WarningKind::BookNotInCorpus);
            continue;
        };

        let mut expander = BlockExpander {
            book,
            reference: &original,
            verses: Vec::new(),
            warnings: &mut parsed.warnings,
        };
        expander.expand_block(block_m.as_str());
        let mut verses = expander.verses;

        if verses.is_empty() {
            push_warning(&mut parsed.warnings, &original, WarningKind::NoVerses);
            continue;
        }

        if let Some(marker) = footnote_marker(&text[whole.end()..]) {
            push_warning(
                &mut parsed.warnings,
                &original,
                WarningKind::FootnoteDropped { marker },
            );
        }

        verses.sort_by_key(|v| (v.chapter, v.verse));
        let mut chapters: Vec<u32> = verses.iter().map(|v| v.chapter).collect();
        chapters.dedup();

        parsed.matches.push(ReferenceMatch {
            original_text: original,
            book: book.name.clone(),
            chapters,
            verses,
        });
    }

    parsed
}

/// A space-separated integer right after a block, not followed by more of a
/// citation (`15:55 7 )` yes, `16:20 1 Corinthians` no).
fn footnote_marker(rest: &str) -> Option<String> {
    let fc = FOOTNOTE_RE.captures(rest)?;
    let is_marker = fc
        .name("next")
        .and_then(|m| m.as_str().chars().next())
        .map_or(true, |c| !c.is_alphanumeric() && c != ':');
    is_marker.then(|| fc["n"].to_string())
}

fn push_warning(warnings: &mut Vec<RangeWarning>, reference: &str, kind: WarningKind) {
    let w = RangeWarning {
        reference: reference.to_string(),
        kind,
    };
    debug!(warning = %w, "reference salvaged");
    warnings.push(w);
}

/// Bare numbers are verses of chapter 1 for the one-chapter books. Books
/// outside the canonical list qualify when the corpus holds only chapter 1.
fn takes_bare_verses(book: &Book) -> bool {
    if books::canonical_position(&book.name).is_some() {
        books::is_single_chapter(&book.name)
    } else {
        book.is_single_chapter() && book.chapter(1).is_some()
    }
}

/// Endpoint of a segment before chapter context is applied.
#[derive(Debug, Clone, Copy)]
enum Point {
    Bare(u32),
    Full(u32, u32),
}

struct BlockExpander<'a> {
    book: &'a Book,
    reference: &'a str,
    verses: Vec<VerseRef>,
    warnings: &'a mut Vec<RangeWarning>,
}

impl BlockExpander<'_> {
    fn expand_block(&mut self, block: &str) {
        let single = takes_bare_verses(self.book).then_some(1);
        let mut current: Option<u32> = single;
        let mut sep: Option<char> = None;
        let mut start = 0usize;

        for (i, ch) in block.char_indices().chain(std::iter::once((block.len(), ';'))) {
            if ch != ';' && ch != ',' {
                continue;
            }
            let seg = block[start..i].trim();
            if !seg.is_empty() {
                current = self.expand_segment(seg, sep, current, single);
            }
            sep = Some(ch);
            start = i + ch.len_utf8();
        }
    }

    /// Expands one segment; returns the chapter context for the next one.
    fn expand_segment(
        &mut self,
        seg: &str,
        sep: Option<char>,
        current: Option<u32>,
        single: Option<u32>,
    ) -> Option<u32> {
        let Some(caps) = SEGMENT_RE.captures(seg) else {
            return current;
        };
        let num = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
        let Some(a) = num("a") else {
            return current;
        };
        let left = match num("b") {
            Some(b) => Point::Full(a, b),
            None => Point::Bare(a),
        };
        let right = num("c").map(|c| match num("d") {
            Some(d) => Point::Full(c, d),
            None => Point::Bare(c),
        });

        // Bare leading number: verse in the chapter context, or a chapter.
        let start = match left {
            Point::Full(c, v) => (c, v),
            Point::Bare(n) => match (single, sep, current) {
                (Some(c), _, _) => (c, n),
                (None, Some(','), Some(c)) => (c, n),
                _ => return Some(n),
            },
        };

        let end = match right {
            None => start,
            Some(Point::Full(c, v)) => (c, v),
            Some(Point::Bare(v)) => (start.0, v),
        };

        if end < start {
            self.warn(WarningKind::BackwardRange {
                start: format!("{}:{}", start.0, start.1),
                end: format!("{}:{}", end.0, end.1),
            });
            self.span(start.0, start.1, start.1);
            return Some(start.0);
        }

        if start.0 == end.0 {
            self.span(start.0, start.1, end.1);
        } else {
            self.span(start.0, start.1, u32::MAX);
            let last_chapter = self.book.chapters().last().map_or(0, |c| c.number);
            for c in start.0 + 1..end.0.min(last_chapter.saturating_add(1)) {
                self.span(c, 1, u32::MAX);
            }
            self.span(end.0, 1, end.1);
        }
        Some(end.0)
    }

    /// Emit verses `from..=to` of `chapter` (`to = u32::MAX` means to the
    /// chapter end), warning once per contiguous run the corpus lacks.
    fn span(&mut self, chapter: u32, from: u32, to: u32) {
        let Some(ch) = self.book.chapter(chapter) else {
            self.warn(WarningKind::ChapterNotFound { chapter });
            return;
        };
        let last = ch.last_verse().unwrap_or(0);
        let open_ended = to == u32::MAX;
        let to = if open_ended { last } else { to };

        let mut missing: Option<u32> = None;
        for v in from..=to.min(last) {
            if ch.verse(v).is_some() {
                if let Some(first) = missing.take() {
                    self.warn(WarningKind::VersesNotFound {
                        chapter,
                        first,
                        last: v - 1,
                    });
                }
                self.verses.push(VerseRef::new(self.book.name.clone(), chapter, v));
            } else {
                missing.get_or_insert(v);
            }
        }
        if to > last {
            missing.get_or_insert(from.max(last + 1));
        }
        if let Some(first) = missing {
            self.warn(WarningKind::VersesNotFound {
                chapter,
                first,
                last: to,
            });
        }
    }

    fn warn(&mut self, kind: WarningKind) {
        push_warning(self.warnings, self.reference, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        let mut b = Corpus::builder();
        for (book, counts) in [
            ("Job", &[22u32, 13][..]),
            ("Jude", &[25][..]),
            ("1 Peter", &[25, 25, 22][..]),
        ] {
            for (i, n) in counts.iter().enumerate() {
                let ch = (i + 1) as u32;
                b = b.chapter(book, ch, (1..=*n).map(|v| format!("{book} {ch}:{v} text")));
            }
        }
        b.build()
    }

    fn parser() -> ReferenceParser {
        ReferenceParser::new(BookResolver::new(books::canonical_books()))
    }

    fn labels(v: &[VerseRef]) -> Vec<String> {
        v.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn strict_single_reference() {
        let c = corpus();
        let p = parser().parse("  1 peter 3:15 ", ParseMode::Strict, &c).unwrap();
        assert_eq!(p.matches.len(), 1);
        assert_eq!(labels(&p.matches[0].verses), vec!["1 Peter 3:15"]);
    }

    #[test]
    fn strict_shape_errors() {
        let c = corpus();
        let p = parser();
        for bad in ["Job", "Job 1", "Job 1:", "1:2", "Job 1:2-3", "Job 1:2; 2:1", ""] {
            assert!(
                matches!(p.parse(bad, ParseMode::Strict, &c), Err(ReviewError::InvalidFormat(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn strict_not_found_and_unknown_book() {
        let c = corpus();
        let p = parser();
        assert_eq!(
            p.parse("Job 1:99", ParseMode::Strict, &c),
            Err(ReviewError::ReferenceNotFound("Job 1:99".into()))
        );
        // Canonical book the corpus does not carry.
        assert!(matches!(
            p.parse("Genesis 1:1", ParseMode::Strict, &c),
            Err(ReviewError::ReferenceNotFound(_))
        ));
        assert!(matches!(
            p.parse("Hezekiah 1:1", ParseMode::Strict, &c),
            Err(ReviewError::UnknownBook(_))
        ));
    }

    #[test]
    fn strict_drops_partial_verse_suffix() {
        let c = corpus();
        let v = parser().parse_verse("Job 2:3b", &c).unwrap();
        assert_eq!(v, VerseRef::new("Job", 2, 3));
    }

    #[test]
    fn commas_and_semicolons() {
        let c = corpus();
        let v = parser().expand("Job 1:6,12,21-22;2:6-7", &c);
        assert_eq!(
            labels(&v),
            vec!["Job 1:6", "Job 1:12", "Job 1:21", "Job 1:22", "Job 2:6", "Job 2:7"]
        );
    }

    #[test]
    fn bare_number_after_semicolon_is_a_chapter() {
        let c = corpus();
        let p = parser().scan("Job 1:6; 2", &c);
        assert_eq!(labels(&p.matches[0].verses), vec!["Job 1:6"]);
    }

    #[test]
    fn backward_range_keeps_start() {
        let c = corpus();
        let p = parser().scan("1 Peter 3:15-1", &c);
        assert_eq!(labels(&p.matches[0].verses), vec!["1 Peter 3:15"]);
        assert!(matches!(p.warnings[0].kind, WarningKind::BackwardRange { .. }));
    }

    #[test]
    fn cross_chapter_range() {
        let c = corpus();
        let v = parser().expand("Job 1:21-2:2", &c);
        assert_eq!(labels(&v), vec!["Job 1:21", "Job 1:22", "Job 2:1", "Job 2:2"]);
    }

    #[test]
    fn cross_chapter_range_over_intermediate_chapter() {
        let c = corpus();
        let v = parser().expand("1 Peter 1:25-3:1", &c);
        assert_eq!(v.len(), 1 + 25 + 1);
        assert_eq!(v[1], VerseRef::new("1 Peter", 2, 1));
        assert_eq!(v[26], VerseRef::new("1 Peter", 3, 1));
    }

    #[test]
    fn out_of_corpus_tail_is_one_warning() {
        let c = corpus();
        let p = parser().scan("Job 2:12-9999", &c);
        assert_eq!(labels(&p.matches[0].verses), vec!["Job 2:12", "Job 2:13"]);
        assert_eq!(
            p.warnings,
            vec![RangeWarning {
                reference: "Job 2:12-9999".into(),
                kind: WarningKind::VersesNotFound {
                    chapter: 2,
                    first: 14,
                    last: 9999
                },
            }]
        );
    }

    #[test]
    fn chapter_only_block_is_discarded() {
        let c = corpus();
        let p = parser().scan("even stronger in Job 2: It is", &c);
        assert!(p.matches.is_empty());
        assert!(matches!(p.warnings[0].kind, WarningKind::NoVerses));
    }

    #[test]
    fn single_chapter_book_takes_bare_verses() {
        let c = corpus();
        let v = parser().expand("note on Jude 3-4 - Grace", &c);
        assert_eq!(labels(&v), vec!["Jude 1:3", "Jude 1:4"]);
    }

    #[test]
    fn footnote_marker_is_reported() {
        let c = corpus();
        let p = parser().scan("work of God ( Job 1:5 7 )", &c);
        assert_eq!(labels(&p.matches[0].verses), vec!["Job 1:5"]);
        assert_eq!(
            p.warnings[0].kind,
            WarningKind::FootnoteDropped { marker: "7".into() }
        );
    }

    #[test]
    fn typographic_dashes() {
        assert_eq!(normalize_dashes("6:18 \u{2013} 7:1"), "6:18-7:1");
        assert_eq!(normalize_dashes("4:7-8 - The"), "4:7-8 - The");
    }

    #[test]
    fn one_shot_parse_matches_parser() {
        let c = corpus();
        let resolver = BookResolver::new(books::canonical_books());
        let a = parse_reference("see Job 1:1-2", ParseMode::FreeText, &c, &resolver).unwrap();
        let b = parser().scan("see Job 1:1-2", &c);
        assert_eq!(a, b);
    }

    #[test]
    fn warning_display() {
        let w = RangeWarning {
            reference: "Job 2:12-14".into(),
            kind: WarningKind::VersesNotFound {
                chapter: 2,
                first: 14,
                last: 14,
            },
        };
        assert_eq!(w.to_string(), "Job 2:12-14: verse 2:14 not found");
    }
}
