//! Output path derivation and the on-disk "already rendered" check.
//!
//! Documents live at `{output_root}/{feed_dir}/{MM-DD-YYYY} {title}.{ext}`.
//! That path is the local idempotency key: if a file exists there, the entry
//! is not rendered again.

use crate::types::{NormalizedEntry, PublicationRecord, Result, UNKNOWN_FEED, UNTITLED};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MAX_FEED_DIR_CHARS: usize = 50;
pub const MAX_TITLE_CHARS: usize = 60;

/// Keep alphanumerics, space, hyphen and underscore; trim; cap at `max_chars`.
pub fn sanitize_component(raw: &str, max_chars: usize) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim().chars().take(max_chars).collect()
}

pub fn feed_directory_name(feed_title: &str) -> String {
    let name = sanitize_component(feed_title, MAX_FEED_DIR_CHARS);
    if name.is_empty() {
        UNKNOWN_FEED.to_string()
    } else {
        name
    }
}

pub fn output_filename(entry_title: &str, published_at: DateTime<Utc>, extension: &str) -> String {
    let mut title = sanitize_component(entry_title, MAX_TITLE_CHARS);
    if title.is_empty() {
        title = UNTITLED.to_string();
    }
    format!("{} {}.{}", published_at.format("%m-%d-%Y"), title, extension)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
    /// A document is already present at the canonical path.
    Exists,
    Absent,
}

pub struct LocalGate {
    output_root: PathBuf,
    extension: String,
}

impl LocalGate {
    pub fn new(output_root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            extension: extension.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn output_path(&self, entry_title: &str, feed_title: &str, published_at: DateTime<Utc>) -> PathBuf {
        self.output_root
            .join(feed_directory_name(feed_title))
            .join(output_filename(entry_title, published_at, &self.extension))
    }

    pub fn resolve(&self, entry: NormalizedEntry, published_at: DateTime<Utc>) -> PublicationRecord {
        let output_path = self.output_path(&entry.entry_title, &entry.feed_title, published_at);
        PublicationRecord {
            entry,
            published_at,
            output_path,
        }
    }

    /// Ensure the feed directory exists and report whether the document does.
    pub fn check(&self, record: &PublicationRecord) -> Result<LocalStatus> {
        if let Some(feed_dir) = record.output_path.parent() {
            std::fs::create_dir_all(feed_dir)?;
        }

        if record.output_path.exists() {
            debug!("Document already on disk: {}", record.output_path.display());
            Ok(LocalStatus::Exists)
        } else {
            Ok(LocalStatus::Absent)
        }
    }
}
