use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const UNKNOWN_FEED: &str = "Unknown Feed";
pub const UNTITLED: &str = "Untitled";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Read-only view of one entry as yielded by a feed source.
///
/// Every field is optional because real feeds omit nearly everything. The
/// three date fields are alternative representations of the publication
/// time; see [`crate::recency`] for the order in which they are consulted.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    /// Structured content blocks (Atom `<content>`, RSS `content:encoded`).
    pub content: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Raw publication timestamp text when the source could not structure it.
    pub published_text: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub entries: Vec<FeedEntry>,
}

impl ParsedFeed {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_FEED)
    }
}

/// Canonical, sanitized form of an entry, ready to be fed to the template.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedEntry {
    pub entry_title: String,
    pub feed_title: String,
    pub content: String,
    pub author: String,
    pub link: String,
    pub entry_id: String,
    pub generated_date: DateTime<Utc>,
}

/// A normalized entry paired with its resolved publication time and the
/// output path derived from both. The path is the local idempotency key.
#[derive(Debug, Clone)]
pub struct PublicationRecord {
    pub entry: NormalizedEntry,
    pub published_at: DateTime<Utc>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn all_skipped(count: usize) -> Self {
        Self {
            uploaded: 0,
            skipped: count,
            failed: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.uploaded + self.skipped + self.failed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub feeds_processed: usize,
    pub feeds_failed: usize,
    pub entries_found: usize,
    pub entries_recent: usize,
    pub documents_generated: usize,
    pub documents_skipped: usize,
    pub documents_failed: usize,
    pub remote_uploaded: usize,
    pub remote_skipped: usize,
    pub remote_failed: usize,
}

impl RunStatistics {
    pub fn merge_upload(&mut self, summary: UploadSummary) {
        self.remote_uploaded += summary.uploaded;
        self.remote_skipped += summary.skipped;
        self.remote_failed += summary.failed;
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.documents_failed > 0 && self.documents_generated == 0 {
            RunOutcome::TotalFailure
        } else if self.feeds_failed > 0 || self.documents_failed > 0 {
            RunOutcome::PartialFailure
        } else {
            RunOutcome::Success
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    PartialFailure,
    TotalFailure,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::TotalFailure => 1,
            RunOutcome::PartialFailure => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "feed-publisher/1.0 (Feed to PDF Converter)".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// Why a bridge-tool invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeErrorKind {
    /// The executable could not be located.
    NotFound,
    Timeout(Duration),
    NonZeroExit { code: Option<i32>, stderr: String },
    Spawn(String),
}

impl fmt::Display for BridgeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeErrorKind::NotFound => write!(f, "executable not found"),
            BridgeErrorKind::Timeout(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            BridgeErrorKind::NonZeroExit { code, stderr } => match code {
                Some(code) => write!(f, "exit status {}: {}", code, stderr.trim()),
                None => write!(f, "terminated by signal: {}", stderr.trim()),
            },
            BridgeErrorKind::Spawn(msg) => write!(f, "failed to spawn: {}", msg),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Document engine error: {0}")]
    Engine(String),

    #[error("Bridge command `{command}` failed: {kind}")]
    Bridge { command: String, kind: BridgeErrorKind },

    #[error("HTML sanitizer error: {0}")]
    Sanitize(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, PublisherError>;
