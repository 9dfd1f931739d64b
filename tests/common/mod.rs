// tests/common/mod.rs
#![allow(dead_code)]

use bible_review::books;
use bible_review::{BookResolver, Corpus, ReferenceParser};

/// Real verse counts for the chapters the citation tests touch.
pub const CHAPTERS: &[(&str, u32, u32)] = &[
    ("Genesis", 17, 27),
    ("Genesis", 18, 33),
    ("Job", 1, 22),
    ("Job", 2, 13),
    ("Ecclesiastes", 1, 18),
    ("Ecclesiastes", 2, 26),
    ("Song of Solomon", 5, 16),
    ("Song of Solomon", 6, 13),
    ("Romans", 16, 27),
    ("1 Corinthians", 1, 31),
    ("1 Corinthians", 15, 58),
    ("1 Corinthians", 16, 24),
    ("2 Corinthians", 1, 24),
    ("2 Corinthians", 4, 18),
    ("2 Corinthians", 6, 18),
    ("2 Corinthians", 7, 16),
    ("2 Corinthians", 9, 15),
    ("2 Corinthians", 13, 14),
    ("Ephesians", 5, 33),
    ("Hebrews", 9, 28),
    ("1 Peter", 3, 22),
    ("1 John", 2, 29),
    ("1 John", 3, 24),
    ("Jude", 1, 25),
];

pub fn corpus() -> Corpus {
    let mut b = Corpus::builder();
    for &(book, chapter, count) in CHAPTERS {
        b = b.chapter(book, chapter, (1..=count).map(|v| format!("{book} {chapter}:{v}")));
    }
    b.build()
}

pub fn parser() -> ReferenceParser {
    ReferenceParser::new(BookResolver::new(books::canonical_books()))
}
