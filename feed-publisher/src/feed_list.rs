use crate::types::Result;
use std::path::Path;
use tracing::{error, info, warn};

/// Parse a newline-delimited feed list. Blank lines and lines whose first
/// character is `#` are ignored; an indented `#` is not a comment.
pub fn parse_feed_list(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if !(line.starts_with("http://") || line.starts_with("https://")) {
                warn!("Feed list entry is not an http(s) URL: {}", line);
            }
            line.to_string()
        })
        .collect()
}

/// Read the feed list at `path`. A missing file yields an empty list; any
/// other read failure is returned to the caller.
pub async fn load_feed_urls(path: &Path) -> Result<Vec<String>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!("Feeds file not found: {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let feeds = parse_feed_list(&text);
    info!("Loaded {} feed URLs from {}", feeds.len(), path.display());
    Ok(feeds)
}
