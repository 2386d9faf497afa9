//! Recency classification of feed entries.
//!
//! An entry's publication time is resolved from an ordered chain of date
//! sources; the first one that yields a timestamp wins. Entries with no
//! resolvable date are never considered recent.

use crate::types::{FeedEntry, UNTITLED};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

pub type DateSource = fn(&FeedEntry) -> Option<DateTime<Utc>>;

/// Date sources in priority order.
pub const DATE_SOURCES: &[(&str, DateSource)] = &[
    ("published", structured_published),
    ("published_text", free_text_published),
    ("updated", structured_updated),
];

fn structured_published(entry: &FeedEntry) -> Option<DateTime<Utc>> {
    entry.published_at
}

fn free_text_published(entry: &FeedEntry) -> Option<DateTime<Utc>> {
    entry.published_text.as_deref().and_then(parse_lenient_timestamp)
}

fn structured_updated(entry: &FeedEntry) -> Option<DateTime<Utc>> {
    entry.updated_at
}

/// Walk [`DATE_SOURCES`] and return the first resolved timestamp with the
/// name of the source that produced it.
pub fn resolve_published(entry: &FeedEntry) -> Option<(&'static str, DateTime<Utc>)> {
    DATE_SOURCES
        .iter()
        .find_map(|(name, source)| source(entry).map(|ts| (*name, ts)))
}

pub struct RecencyClassifier {
    cutoff: DateTime<Utc>,
}

impl RecencyClassifier {
    pub fn new(cutoff: DateTime<Utc>) -> Self {
        Self { cutoff }
    }

    /// Classifier whose cutoff is `now - recent_hours`, fixed at construction.
    /// A window reaching past the earliest representable time admits every
    /// dated entry.
    pub fn for_window(recent_hours: u32) -> Self {
        let cutoff = Duration::try_hours(i64::from(recent_hours))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(cutoff)
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Returns whether the entry is strictly newer than the cutoff, along with
    /// the resolved publication time when one exists.
    pub fn is_recent(&self, entry: &FeedEntry) -> (bool, Option<DateTime<Utc>>) {
        match resolve_published(entry) {
            Some((source, published)) => {
                debug!(
                    "Resolved date for '{}' from {}: {}",
                    entry.title.as_deref().unwrap_or(UNTITLED),
                    source,
                    published
                );
                (published > self.cutoff, Some(published))
            }
            None => {
                warn!(
                    "No published date found for entry: {}",
                    entry.title.as_deref().unwrap_or("Unknown")
                );
                (false, None)
            }
        }
    }
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%A, %d %B %Y %H:%M:%S %z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y", "%m/%d/%Y"];

/// Parse a free-text timestamp, trying the common feed formats in turn.
///
/// Offsets are honoured by converting to UTC. Text without an offset is read
/// as UTC; a bare date is taken as midnight UTC.
pub fn parse_lenient_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    debug!("Unparseable timestamp text: {}", raw);
    None
}
