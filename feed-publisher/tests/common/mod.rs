#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feed_publisher::{
    Collaborators, DocumentEngine, FeedEntry, FeedSource, HtmlSanitizer, ParsedFeed, PublisherConfig, PublisherError,
    RemoteBridge, Result, Sanitizer,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .try_init();
    });
}

/// Configuration rooted in a temporary directory, without template files so
/// the bundled template and fallback styles are used.
pub fn test_config(root: &Path) -> PublisherConfig {
    let app_root = root.to_string_lossy().into_owned();
    PublisherConfig::from_lookup(|key| match key {
        "APP_ROOT" => Some(app_root.clone()),
        _ => None,
    })
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

pub fn entry(title: &str, published: DateTime<Utc>, content: &str) -> FeedEntry {
    FeedEntry {
        id: Some(format!("urn:{}", title)),
        title: Some(title.to_string()),
        link: Some("https://example.com/post".to_string()),
        author: Some("Test Author".to_string()),
        content: vec![content.to_string()],
        published_at: Some(published),
        ..Default::default()
    }
}

pub fn feed(title: &str, entries: Vec<FeedEntry>) -> ParsedFeed {
    ParsedFeed {
        title: Some(title.to_string()),
        description: None,
        entries,
    }
}

/// Feed source answering from a fixed table. Unknown URLs fail like a
/// network error; URLs in `panicking` panic.
#[derive(Default)]
pub struct StaticFeedSource {
    pub feeds: HashMap<String, ParsedFeed>,
    pub panicking: HashSet<String>,
}

impl StaticFeedSource {
    pub fn with_feed(mut self, url: &str, feed: ParsedFeed) -> Self {
        self.feeds.insert(url.to_string(), feed);
        self
    }

    pub fn with_panic(mut self, url: &str) -> Self {
        self.panicking.insert(url.to_string());
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        if self.panicking.contains(url) {
            panic!("feed source exploded on {}", url);
        }
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| PublisherError::General(format!("connection refused: {}", url)))
    }
}

/// Engine that counts invocations and returns a tiny fake PDF.
#[derive(Clone, Default)]
pub struct CountingEngine {
    pub calls: Arc<AtomicUsize>,
}

impl CountingEngine {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentEngine for CountingEngine {
    async fn render(&self, html: &str, _stylesheet: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("%PDF-1.4\n{}", html.len()).into_bytes())
    }
}

pub struct FailingEngine;

#[async_trait]
impl DocumentEngine for FailingEngine {
    async fn render(&self, _html: &str, _stylesheet: &str) -> Result<Vec<u8>> {
        Err(PublisherError::Engine("engine crashed".to_string()))
    }
}

/// Sanitizer that panics on content containing `PANIC`.
pub struct PanickingSanitizer;

impl Sanitizer for PanickingSanitizer {
    fn sanitize(&self, html: &str) -> Result<String> {
        if html.contains("PANIC") {
            panic!("sanitizer cannot handle this markup");
        }
        HtmlSanitizer::new().sanitize(html)
    }
}

#[derive(Debug, Default)]
pub struct BridgeState {
    pub calls: Vec<String>,
    /// Remote paths (folders and document keys) that exist.
    pub existing: HashSet<String>,
    pub unavailable: bool,
    /// Every mkdir fails, the root folder included.
    pub mkdir_fails: bool,
    /// Folders whose mkdir fails.
    pub mkdir_fails_for: HashSet<String>,
    /// Remote keys (`{folder}/{stem}`) whose upload fails.
    pub put_fails: HashSet<String>,
    pub find_errors: HashSet<String>,
    pub find_panics: HashSet<String>,
}

/// In-memory remote store. `put` makes the uploaded document findable.
#[derive(Clone, Default)]
pub struct RecordingBridge {
    pub state: Arc<Mutex<BridgeState>>,
}

impl RecordingBridge {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, verb: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(verb)).count()
    }

    pub fn add_existing(&self, path: &str) {
        self.state.lock().unwrap().existing.insert(path.to_string());
    }

    fn failure(verb: &str, stderr: &str) -> PublisherError {
        PublisherError::Bridge {
            command: format!("rmapi {}", verb),
            kind: feed_publisher::BridgeErrorKind::NonZeroExit {
                code: Some(1),
                stderr: stderr.to_string(),
            },
        }
    }
}

#[async_trait]
impl RemoteBridge for RecordingBridge {
    async fn version(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("version".to_string());
        if state.unavailable {
            return Err(PublisherError::Bridge {
                command: "rmapi version".to_string(),
                kind: feed_publisher::BridgeErrorKind::NotFound,
            });
        }
        Ok("rmapi v0.0.test".to_string())
    }

    async fn find(&self, path: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("find {}", path));
        if state.find_panics.contains(path) {
            drop(state);
            panic!("find blew up on {}", path);
        }
        if state.find_errors.contains(path) {
            return Err(Self::failure("find", "network unreachable"));
        }
        Ok(state.existing.contains(path))
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("mkdir {}", path));
        if state.mkdir_fails || state.mkdir_fails_for.contains(path) {
            return Err(Self::failure("mkdir", "permission denied"));
        }
        state.existing.insert(path.to_string());
        Ok(())
    }

    async fn put(&self, local_file: &Path, remote_folder: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("put {} {}", local_file.display(), remote_folder));
        let stem = local_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = format!("{}/{}", remote_folder, stem);
        if state.put_fails.contains(&key) {
            return Err(Self::failure("put", "upload rejected"));
        }
        state.existing.insert(key);
        Ok(())
    }
}

pub fn collaborators(
    source: StaticFeedSource,
    sanitizer: Box<dyn Sanitizer>,
    engine: Box<dyn DocumentEngine>,
    bridge: &RecordingBridge,
) -> Collaborators {
    Collaborators {
        source: Box::new(source),
        sanitizer,
        engine,
        bridge: Box::new(bridge.clone()),
    }
}
