//! Canonical book tables: Protestant 66-book order, testament split and the
//! Treasury of Scripture Knowledge abbreviations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Testament {
    #[serde(rename = "OT", alias = "ot", alias = "old")]
    Old,
    #[serde(rename = "NT", alias = "nt", alias = "new")]
    New,
}

pub const OT_BOOKS: [&str; 39] = [
    "Genesis", "Exodus", "Leviticus", "Numbers", "Deuteronomy", "Joshua", "Judges", "Ruth",
    "1 Samuel", "2 Samuel", "1 Kings", "2 Kings", "1 Chronicles", "2 Chronicles", "Ezra",
    "Nehemiah", "Esther", "Job", "Psalms", "Proverbs", "Ecclesiastes", "Song of Solomon",
    "Isaiah", "Jeremiah", "Lamentations", "Ezekiel", "Daniel", "Hosea", "Joel", "Amos",
    "Obadiah", "Jonah", "Micah", "Nahum", "Habakkuk", "Zephaniah", "Haggai", "Zechariah",
    "Malachi",
];

pub const NT_BOOKS: [&str; 27] = [
    "Matthew", "Mark", "Luke", "John", "Acts", "Romans", "1 Corinthians", "2 Corinthians",
    "Galatians", "Ephesians", "Philippians", "Colossians", "1 Thessalonians",
    "2 Thessalonians", "1 Timothy", "2 Timothy", "Titus", "Philemon", "Hebrews", "James",
    "1 Peter", "2 Peter", "1 John", "2 John", "3 John", "Jude", "Revelation",
];

pub const GOSPELS: [&str; 4] = ["Matthew", "Mark", "Luke", "John"];

/// Books with a single chapter; citations name only the verse (`Jude 3`).
pub const SINGLE_CHAPTER_BOOKS: [&str; 5] = ["Obadiah", "Philemon", "2 John", "3 John", "Jude"];

/// TSK abbreviation → canonical name, in canonical order (index + 1 is the
/// TSK numeric book key).
pub const TSK_ABBREVIATIONS: [(&str, &str); 66] = [
    ("ge", "Genesis"), ("ex", "Exodus"), ("le", "Leviticus"), ("nu", "Numbers"),
    ("de", "Deuteronomy"), ("jos", "Joshua"), ("jud", "Judges"), ("ru", "Ruth"),
    ("1sa", "1 Samuel"), ("2sa", "2 Samuel"), ("1ki", "1 Kings"), ("2ki", "2 Kings"),
    ("1ch", "1 Chronicles"), ("2ch", "2 Chronicles"), ("ezr", "Ezra"), ("ne", "Nehemiah"),
    ("es", "Esther"), ("job", "Job"), ("ps", "Psalms"), ("pr", "Proverbs"),
    ("ec", "Ecclesiastes"), ("so", "Song of Solomon"), ("isa", "Isaiah"), ("jer", "Jeremiah"),
    ("la", "Lamentations"), ("eze", "Ezekiel"), ("da", "Daniel"), ("ho", "Hosea"),
    ("joe", "Joel"), ("am", "Amos"), ("ob", "Obadiah"), ("jon", "Jonah"), ("mic", "Micah"),
    ("na", "Nahum"), ("hab", "Habakkuk"), ("zep", "Zephaniah"), ("hag", "Haggai"),
    ("zec", "Zechariah"), ("mal", "Malachi"), ("mt", "Matthew"), ("mr", "Mark"),
    ("lu", "Luke"), ("joh", "John"), ("ac", "Acts"), ("ro", "Romans"),
    ("1co", "1 Corinthians"), ("2co", "2 Corinthians"), ("ga", "Galatians"),
    ("eph", "Ephesians"), ("php", "Philippians"), ("col", "Colossians"),
    ("1th", "1 Thessalonians"), ("2th", "2 Thessalonians"), ("1ti", "1 Timothy"),
    ("2ti", "2 Timothy"), ("tit", "Titus"), ("phm", "Philemon"), ("heb", "Hebrews"),
    ("jas", "James"), ("1pe", "1 Peter"), ("2pe", "2 Peter"), ("1jo", "1 John"),
    ("2jo", "2 John"), ("3jo", "3 John"), ("jude", "Jude"), ("re", "Revelation"),
];

/// All 66 books in canonical order.
pub fn canonical_books() -> impl Iterator<Item = &'static str> {
    OT_BOOKS.iter().chain(NT_BOOKS.iter()).copied()
}

/// Zero-based canonical position, if the name is a canonical book.
pub fn canonical_position(book: &str) -> Option<usize> {
    canonical_books().position(|b| b == book)
}

pub fn testament_of(book: &str) -> Option<Testament> {
    if OT_BOOKS.contains(&book) {
        Some(Testament::Old)
    } else if NT_BOOKS.contains(&book) {
        Some(Testament::New)
    } else {
        None
    }
}

pub fn is_gospel(book: &str) -> bool {
    GOSPELS.contains(&book)
}

pub fn is_single_chapter(book: &str) -> bool {
    SINGLE_CHAPTER_BOOKS.contains(&book)
}

/// TSK abbreviations as an alias table for [`crate::resolver::BookResolver`].
pub fn tsk_aliases() -> HashMap<String, String> {
    TSK_ABBREVIATIONS
        .iter()
        .map(|(abbr, name)| (abbr.to_string(), name.to_string()))
        .collect()
}
