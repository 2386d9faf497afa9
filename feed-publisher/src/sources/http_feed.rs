use crate::traits::FeedSource;
use crate::types::{FetchConfig, ParsedFeed, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Production feed source: HTTP download followed by feed-rs parsing.
pub struct HttpFeedSource {
    fetcher: Fetcher,
    parser: FeedParser,
}

impl HttpFeedSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let body = self.fetcher.fetch(url).await?;

        if !FeedParser::is_valid_feed_content(&body) {
            warn!("Response from {} does not look like a feed, parsing anyway", url);
        }

        let feed = self.parser.parse_feed(&body)?;
        debug!("{} yielded {} entries", url, feed.entries.len());
        Ok(feed)
    }
}
