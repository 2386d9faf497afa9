mod common;

use chrono::{TimeZone, Utc};
use common::init_tracing;
use feed_publisher::{ContentNormalizer, FeedParser, HtmlSanitizer, RecencyClassifier, Result};
use tracing::info;

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example RSS</title>
    <link>https://rss.example/</link>
    <description>Test channel</description>
    <item>
      <title>Rich item</title>
      <link>https://rss.example/rich</link>
      <guid>rich-1</guid>
      <pubDate>Mon, 28 Jul 2025 10:00:00 GMT</pubDate>
      <description>Short summary</description>
      <content:encoded><![CDATA[<p onclick="x()">Full <b>body</b></p><iframe src="https://ads.example"></iframe>]]></content:encoded>
    </item>
    <item>
      <title>Summary only</title>
      <link>https://rss.example/plain</link>
      <pubDate>Sun, 27 Jul 2025 08:30:00 +0200</pubDate>
      <description><![CDATA[<p>Only a summary</p>]]></description>
    </item>
    <item>
      <title>Loose date</title>
      <link>https://rss.example/loose</link>
      <pubDate>2025-07-28 10:00:00</pubDate>
      <description>Written by a hand-rolled feed generator</description>
    </item>
    <item>
      <title>Undated</title>
      <link>https://rss.example/undated</link>
    </item>
  </channel>
</rss>"#;

#[test]
fn test_rss_items_map_to_entries() -> Result<()> {
    init_tracing();
    let feed = FeedParser::new().parse_feed(RSS)?;
    info!("Parsed {} entries", feed.entries.len());

    assert_eq!(feed.display_title(), "Example RSS");
    assert_eq!(feed.entries.len(), 4);

    let rich = &feed.entries[0];
    assert_eq!(rich.id.as_deref(), Some("rich-1"));
    assert_eq!(rich.link.as_deref(), Some("https://rss.example/rich"));
    assert_eq!(rich.published_at, Some(Utc.with_ymd_and_hms(2025, 7, 28, 10, 0, 0).unwrap()));
    assert!(!rich.content.is_empty(), "content:encoded becomes structured content");

    let plain = &feed.entries[1];
    assert!(plain.content.is_empty());
    assert_eq!(plain.published_at, Some(Utc.with_ymd_and_hms(2025, 7, 27, 6, 30, 0).unwrap()));

    let loose = &feed.entries[2];
    assert_eq!(loose.published_at, Some(Utc.with_ymd_and_hms(2025, 7, 28, 10, 0, 0).unwrap()));

    assert_eq!(feed.entries[3].published_at, None);
    Ok(())
}

#[test]
fn test_parsed_entries_flow_through_classifier_and_normalizer() -> Result<()> {
    init_tracing();
    let feed = FeedParser::new().parse_feed(RSS)?;
    let classifier = RecencyClassifier::new(Utc.with_ymd_and_hms(2025, 7, 28, 0, 0, 0).unwrap());

    let verdicts: Vec<bool> = feed.entries.iter().map(|e| classifier.is_recent(e).0).collect();
    assert_eq!(verdicts, vec![true, false, true, false]);

    let sanitizer = HtmlSanitizer::new();
    let normalizer = ContentNormalizer::new(&sanitizer);

    let rich = normalizer.normalize(&feed.entries[0], feed.display_title());
    assert_eq!(rich.content, "<p>Full <b>body</b></p>");
    assert_eq!(rich.feed_title, "Example RSS");

    let plain = normalizer.normalize(&feed.entries[1], feed.display_title());
    assert_eq!(plain.content, "<p>Only a summary</p>");
    assert_eq!(plain.author, "Unknown Author");
    assert!(!plain.entry_id.is_empty(), "feed-rs assigns ids to guid-less items");
    Ok(())
}
