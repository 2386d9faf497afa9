use crate::recency::parse_lenient_timestamp;
use crate::types::{FeedEntry, ParsedFeed, PublisherError, Result};
use chrono::Utc;
use feed_rs::parser;
use tracing::{debug, info};

/// Maps RSS/Atom/JSON feed documents onto [`ParsedFeed`].
#[derive(Debug, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        // Dates feed-rs would reject (`2025-07-28 10:00:00`, `July 28, 2025`)
        // go through the free-text formats instead of being dropped.
        let feed = parser::Builder::new()
            .timestamp_parser(parse_lenient_timestamp)
            .build()
            .parse(content.as_bytes())
            .map_err(|e| PublisherError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let description = feed.description.map(|d| d.content);
        let entries: Vec<FeedEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        info!(
            "Parsed feed '{}' with {} entries",
            title.as_deref().unwrap_or("untitled"),
            entries.len()
        );

        Ok(ParsedFeed {
            title,
            description,
            entries,
        })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> FeedEntry {
        let id = Some(entry.id).filter(|id| !id.is_empty());
        let title = entry.title.map(|t| t.content);
        let link = entry.links.first().map(|l| l.href.clone());
        let author = entry
            .authors
            .first()
            .map(|a| a.name.clone())
            .filter(|name| !name.trim().is_empty());

        let content = entry
            .content
            .and_then(|c| c.body)
            .into_iter()
            .collect();
        let summary = entry.summary.map(|s| s.content);

        // feed-rs folds RSS <description> into summary; media descriptions
        // are the remaining place a body can hide.
        let description = entry
            .media
            .iter()
            .find_map(|m| m.description.as_ref().map(|d| d.content.clone()));

        FeedEntry {
            id,
            title,
            link,
            author,
            content,
            summary,
            description,
            published_at: entry.published.map(|dt| dt.with_timezone(&Utc)),
            published_text: None,
            updated_at: entry.updated.map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Cheap sniff for RSS/Atom markup before handing a body to the parser.
    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        let has_feed_indicators = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel");

        let looks_like_json_feed = content_lower.trim_start().starts_with('{') && content_lower.contains("jsonfeed");

        has_feed_indicators || looks_like_json_feed
    }
}
