use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported listing sites.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Neatmanga,
    Mangapill,
    Toonily,
}

impl Source {
    pub const ALL: &'static [Source] = &[Source::Neatmanga, Source::Mangapill, Source::Toonily];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Neatmanga => "neatmanga",
            Source::Mangapill => "mangapill",
            Source::Toonily => "toonily",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One published chapter of a series.
///
/// Identity is `(num, url)`. The release timestamp is display metadata only:
/// sites report it as a fuzzy relative date, so it must not participate in
/// equality or hashing or re-scrapes would look like new chapters.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Chapter {
    pub num: String,
    pub url: String,
    pub released: DateTime<Utc>,
}

impl PartialEq for Chapter {
    fn eq(&self, other: &Self) -> bool {
        self.num == other.num && self.url == other.url
    }
}

impl Eq for Chapter {}

impl Hash for Chapter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.num.hash(state);
        self.url.hash(state);
    }
}

/// A tracked series and every chapter seen for it so far.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Manga {
    pub name: String,
    pub source: Source,
    pub chapters: Vec<Chapter>,
}

impl Manga {
    /// Build a series entry with chapters deduplicated and in chapter order.
    pub fn new(name: impl Into<String>, source: Source, chapters: Vec<Chapter>) -> Self {
        Self {
            name: name.into(),
            source,
            chapters: dedup_and_sort(chapters),
        }
    }

    pub fn n_chapters(&self) -> usize {
        self.chapters.len()
    }
}

/// Extract the first decimal number from a chapter label ("Chapter 10.5" -> 10.5).
pub fn chapter_number(num: &str) -> Option<f64> {
    let bytes = num.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;
    let mut end = start;
    let mut seen_dot = false;
    for (i, b) in bytes[start..].iter().enumerate() {
        match b {
            b'0'..=b'9' => end = start + i + 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end = start + i + 1;
            }
            _ => break,
        }
    }
    num[start..end].trim_end_matches('.').parse().ok()
}

/// Chapter ordering: by embedded number when both sides have one, numberless
/// labels last, ties and the rest by label.
pub fn chapter_cmp(a: &Chapter, b: &Chapter) -> Ordering {
    match (chapter_number(&a.num), chapter_number(&b.num)) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.num.cmp(&b.num)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.num.cmp(&b.num),
    }
}

/// Drop duplicate identities (first occurrence wins) and sort into chapter order.
pub fn dedup_and_sort(chapters: Vec<Chapter>) -> Vec<Chapter> {
    let mut seen = HashSet::new();
    let mut out: Vec<Chapter> = chapters
        .into_iter()
        .filter(|c| seen.insert((c.num.clone(), c.url.clone())))
        .collect();
    out.sort_by(chapter_cmp);
    out
}

/// Chapters present in `scraped` but not in `cached`, in chapter order.
pub fn new_chapters(cached: &[Chapter], scraped: &[Chapter]) -> Vec<Chapter> {
    let known: HashSet<&Chapter> = cached.iter().collect();
    let mut fresh: Vec<Chapter> = scraped
        .iter()
        .filter(|c| !known.contains(*c))
        .cloned()
        .collect();
    fresh.sort_by(chapter_cmp);
    fresh
}

/// Identity-union of both lists, preferring the freshly scraped entry when an
/// identity appears on both sides (its release date is the better one).
pub fn merge_chapters(cached: &[Chapter], scraped: &[Chapter]) -> Vec<Chapter> {
    let mut merged: Vec<Chapter> = scraped.to_vec();
    let scraped_set: HashSet<&Chapter> = scraped.iter().collect();
    merged.extend(
        cached
            .iter()
            .filter(|c| !scraped_set.contains(*c))
            .cloned(),
    );
    dedup_and_sort(merged)
}
