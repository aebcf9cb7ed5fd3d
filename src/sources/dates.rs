//! Release-date parsing for scraped chapter listings.
//!
//! Madara-themed sites show either a fuzzy relative date ("2 days ago") for
//! recent chapters or an absolute one ("January 5, 2024") for older entries.
//! A date that fails to parse falls back to the scrape time rather than
//! failing the chapter; the timestamp is display metadata only.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

static RELATIVE: OnceLock<Regex> = OnceLock::new();

const ABSOLUTE_FORMATS: &[&str] = &[
    "%B %d, %Y", // January 5, 2024
    "%b %d, %Y", // Jan 5, 2024
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%d %B %Y",
];

/// Parse a scraped release date, falling back to `now` when unparseable.
pub fn parse_release(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    try_parse_release(text, now).unwrap_or(now)
}

fn try_parse_release(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(ts) = parse_relative(text, now) {
        return Some(ts);
    }

    for fmt in ABSOLUTE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    None
}

fn parse_relative(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let re = RELATIVE.get_or_init(|| {
        Regex::new(r"(?i)^(\d+|an?)\s+(second|min(?:ute)?|hour|day|week|month|year)s?\s+ago$")
            .expect("relative date pattern is valid")
    });
    let caps = re.captures(text)?;

    let count: i64 = match &caps[1] {
        a if a.eq_ignore_ascii_case("a") || a.eq_ignore_ascii_case("an") => 1,
        n => n.parse().ok()?,
    };

    let delta = match caps[2].to_ascii_lowercase().as_str() {
        "second" => Duration::seconds(count),
        "min" | "minute" => Duration::minutes(count),
        "hour" => Duration::hours(count),
        "day" => Duration::days(count),
        "week" => Duration::weeks(count),
        "month" => Duration::days(30 * count),
        "year" => Duration::days(365 * count),
        _ => return None,
    };

    Some(now - delta)
}
