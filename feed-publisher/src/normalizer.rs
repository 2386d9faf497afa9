//! Extraction of the canonical content and metadata of one feed entry.

use crate::traits::Sanitizer;
use crate::types::{FeedEntry, NormalizedEntry, UNKNOWN_AUTHOR, UNTITLED};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

pub type ContentSource = fn(&FeedEntry) -> Option<&str>;

/// Content fields in priority order; the first non-empty one wins.
pub const CONTENT_SOURCES: &[(&str, ContentSource)] = &[
    ("content", structured_content),
    ("summary", summary_field),
    ("description", description_field),
];

fn structured_content(entry: &FeedEntry) -> Option<&str> {
    entry.content.first().map(String::as_str)
}

fn summary_field(entry: &FeedEntry) -> Option<&str> {
    entry.summary.as_deref()
}

fn description_field(entry: &FeedEntry) -> Option<&str> {
    entry.description.as_deref()
}

/// Raw (unsanitized) content of the entry, or an empty string.
pub fn select_content(entry: &FeedEntry) -> &str {
    CONTENT_SOURCES
        .iter()
        .filter_map(|(_, source)| source(entry))
        .find(|value| !value.trim().is_empty())
        .unwrap_or("")
}

/// Synthetic identifier for entries that carry none. Deterministic, but two
/// entries with the same title share it.
pub fn synthetic_entry_id(title: &str) -> String {
    format!("entry_{}", Uuid::new_v5(&Uuid::NAMESPACE_OID, title.as_bytes()).simple())
}

pub struct ContentNormalizer<'a> {
    sanitizer: &'a dyn Sanitizer,
}

impl<'a> ContentNormalizer<'a> {
    pub fn new(sanitizer: &'a dyn Sanitizer) -> Self {
        Self { sanitizer }
    }

    pub fn normalize(&self, entry: &FeedEntry, feed_title: &str) -> NormalizedEntry {
        let entry_title = entry
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        let content = self.clean_content(select_content(entry));

        let author = entry
            .author
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string();

        let entry_id = entry
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| synthetic_entry_id(&entry_title));

        NormalizedEntry {
            entry_title,
            feed_title: feed_title.to_string(),
            content,
            author,
            link: entry.link.clone().unwrap_or_default(),
            entry_id,
            generated_date: Utc::now(),
        }
    }

    /// Sanitize, keeping the original markup if the sanitizer gives up.
    fn clean_content(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        match self.sanitizer.sanitize(raw) {
            Ok(clean) => clean,
            Err(e) => {
                warn!("Error cleaning HTML content, keeping it as-is: {}", e);
                raw.to_string()
            }
        }
    }
}
