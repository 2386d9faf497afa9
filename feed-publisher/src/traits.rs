use crate::types::{ParsedFeed, Result};
use async_trait::async_trait;

/// Source of parsed feeds (HTTP fetch + XML parsing in production).
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}

/// Strips unsafe markup from entry content.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> Result<String>;
}

/// Turns rendered HTML plus a stylesheet into document bytes.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    async fn render(&self, html: &str, stylesheet: &str) -> Result<Vec<u8>>;

    /// File extension of the produced documents, without the dot.
    fn extension(&self) -> &str {
        "pdf"
    }
}

/// The four operations the remote document store's bridge tool exposes.
///
/// Every call is a live round-trip; implementations must not cache results.
#[async_trait]
pub trait RemoteBridge: Send + Sync {
    /// Health check. Returns the tool's version string.
    async fn version(&self) -> Result<String>;

    /// Whether an entry exists at `path` in the remote store.
    async fn find(&self, path: &str) -> Result<bool>;

    /// Create the folder at `path`. An "already exists" response counts as success.
    async fn mkdir(&self, path: &str) -> Result<()>;

    /// Upload `local_file` into `remote_folder`.
    async fn put(&self, local_file: &std::path::Path, remote_folder: &str) -> Result<()>;
}
