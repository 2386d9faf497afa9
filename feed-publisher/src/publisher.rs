//! The run orchestrator: feeds in list order, entries in feed order, one at a
//! time, with failures contained at the entry, feed and upload level.

use crate::bridge::RmapiBridge;
use crate::config::PublisherConfig;
use crate::engine::CommandEngine;
use crate::feed_list::load_feed_urls;
use crate::isolate::isolated;
use crate::local_gate::{LocalGate, LocalStatus};
use crate::normalizer::ContentNormalizer;
use crate::recency::RecencyClassifier;
use crate::remote_gate::RemoteGate;
use crate::renderer::{load_stylesheet, DocumentRenderer};
use crate::sanitizer::HtmlSanitizer;
use crate::sources::HttpFeedSource;
use crate::traits::{DocumentEngine, FeedSource, RemoteBridge, Sanitizer};
use crate::types::{FeedEntry, Result, RunStatistics};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

const BANNER: &str = "============================================================";

/// The external pieces a publisher drives.
pub struct Collaborators {
    pub source: Box<dyn FeedSource>,
    pub sanitizer: Box<dyn Sanitizer>,
    pub engine: Box<dyn DocumentEngine>,
    pub bridge: Box<dyn RemoteBridge>,
}

impl Collaborators {
    /// HTTP feeds, lol_html sanitizing, an external PDF engine and `rmapi`.
    pub fn production(config: &PublisherConfig) -> Result<Self> {
        Ok(Self {
            source: Box::new(HttpFeedSource::new(config.fetch.clone())?),
            sanitizer: Box::new(HtmlSanitizer::new()),
            engine: Box::new(CommandEngine::weasyprint(&config.engine_path).with_timeout(config.engine_timeout)),
            bridge: Box::new(
                RmapiBridge::new(&config.rmapi_path).with_timeouts(config.bridge_timeout, config.upload_timeout),
            ),
        })
    }
}

#[derive(Debug)]
enum EntryOutcome {
    Generated(PathBuf),
    /// Already rendered by an earlier run.
    Skipped(PathBuf),
    Failed,
}

pub struct FeedPublisher {
    feeds_file: PathBuf,
    recent_hours: u32,
    source: Box<dyn FeedSource>,
    sanitizer: Box<dyn Sanitizer>,
    gate: LocalGate,
    renderer: DocumentRenderer,
    remote: RemoteGate,
}

impl FeedPublisher {
    pub fn new(config: &PublisherConfig, collaborators: Collaborators) -> Result<Self> {
        let stylesheet = load_stylesheet(&config.css_file, &config.style);
        let renderer = DocumentRenderer::from_template_file(&config.template_path(), stylesheet, collaborators.engine)?;
        let gate = LocalGate::new(&config.output_dir, renderer.extension());
        let remote = RemoteGate::new(collaborators.bridge, &config.remote_folder, &config.output_dir);

        Ok(Self {
            feeds_file: config.feeds_file.clone(),
            recent_hours: config.recent_hours,
            source: collaborators.source,
            sanitizer: collaborators.sanitizer,
            gate,
            renderer,
            remote,
        })
    }

    pub fn from_config(config: &PublisherConfig) -> Result<Self> {
        Self::new(config, Collaborators::production(config)?)
    }

    /// Process every feed in the feed list and publish what was produced.
    ///
    /// Only an unreadable feed list is an error; everything past that point
    /// is reported through the returned statistics.
    pub async fn run(&self) -> Result<RunStatistics> {
        let run_id = Uuid::new_v4();
        self.run_once(run_id).instrument(info_span!("run", run_id = %run_id)).await
    }

    async fn run_once(&self, run_id: Uuid) -> Result<RunStatistics> {
        info!("{}", BANNER);
        info!("Starting feed processing run {} at {}", run_id, Utc::now().format("%Y-%m-%d %H:%M:%S"));
        info!("Looking for entries published within the last {} hours", self.recent_hours);
        info!("{}", BANNER);

        let feeds = load_feed_urls(&self.feeds_file).await?;
        let stats = if feeds.is_empty() {
            error!("No feeds to process");
            RunStatistics::default()
        } else {
            self.run_feeds(&feeds).await
        };

        log_summary(run_id, &stats);
        Ok(stats)
    }

    /// Run the pipeline over an explicit list of feed URLs.
    pub async fn run_feeds(&self, feeds: &[String]) -> RunStatistics {
        let mut stats = RunStatistics::default();
        let classifier = RecencyClassifier::for_window(self.recent_hours);
        let mut batch: Vec<PathBuf> = Vec::new();

        for url in feeds {
            let processed = isolated(self.process_feed(url, &classifier, &mut stats, &mut batch)).await;
            if let Err(panic) = processed {
                error!("Unexpected error processing feed {}: {}", url, panic);
                stats.feeds_failed += 1;
            }
        }

        if !batch.is_empty() {
            info!("Uploading {} documents to the remote store...", batch.len());
            let summary = self.remote.publish(&batch).await;
            stats.merge_upload(summary);
        }

        stats
    }

    async fn process_feed(
        &self,
        url: &str,
        classifier: &RecencyClassifier,
        stats: &mut RunStatistics,
        batch: &mut Vec<PathBuf>,
    ) {
        info!("Fetching feed: {}", url);
        let feed = match self.source.fetch(url).await {
            Ok(feed) => feed,
            Err(e) => {
                error!("Error fetching feed {}: {}", url, e);
                stats.feeds_failed += 1;
                return;
            }
        };

        stats.feeds_processed += 1;
        stats.entries_found += feed.entries.len();
        let feed_title = feed.display_title();
        info!("Feed '{}' has {} entries", feed_title, feed.entries.len());

        let mut recent = 0;
        let mut produced = 0;
        for entry in &feed.entries {
            let published = match classifier.is_recent(entry) {
                (true, Some(published)) => published,
                _ => continue,
            };
            recent += 1;
            stats.entries_recent += 1;

            match isolated(self.publish_entry(entry, published, feed_title)).await {
                Ok(Ok(EntryOutcome::Generated(path))) => {
                    stats.documents_generated += 1;
                    produced += 1;
                    batch.push(path);
                }
                Ok(Ok(EntryOutcome::Skipped(path))) => {
                    stats.documents_skipped += 1;
                    batch.push(path);
                }
                Ok(Ok(EntryOutcome::Failed)) => stats.documents_failed += 1,
                Ok(Err(e)) => {
                    error!("Error processing entry in feed {}: {}", url, e);
                    stats.documents_failed += 1;
                }
                Err(panic) => {
                    error!("Unexpected error processing entry in feed {}: {}", url, panic);
                    stats.documents_failed += 1;
                }
            }
        }

        info!(
            "Processed feed '{}': {} recent entries, {} new documents",
            feed_title, recent, produced
        );
    }

    async fn publish_entry(&self, entry: &FeedEntry, published: DateTime<Utc>, feed_title: &str) -> Result<EntryOutcome> {
        let normalized = ContentNormalizer::new(self.sanitizer.as_ref()).normalize(entry, feed_title);
        let record = self.gate.resolve(normalized, published);

        if self.gate.check(&record)? == LocalStatus::Exists {
            info!("Document already exists, skipping: {}", record.output_path.display());
            return Ok(EntryOutcome::Skipped(record.output_path));
        }

        info!("Generating document: {}", record.output_path.display());
        Ok(match self.renderer.render(&record).await {
            Some(path) => EntryOutcome::Generated(path),
            None => EntryOutcome::Failed,
        })
    }
}

fn log_summary(run_id: Uuid, stats: &RunStatistics) {
    info!("{}", BANNER);
    info!("PROCESSING SUMMARY (run {}):", run_id);
    info!("  Feeds processed: {}", stats.feeds_processed);
    info!("  Feeds failed: {}", stats.feeds_failed);
    info!("  Total entries found: {}", stats.entries_found);
    info!("  Recent entries: {}", stats.entries_recent);
    info!("  Documents generated: {}", stats.documents_generated);
    info!("  Documents skipped: {}", stats.documents_skipped);
    info!("  Documents failed: {}", stats.documents_failed);
    info!("  Remote uploaded: {}", stats.remote_uploaded);
    info!("  Remote skipped: {}", stats.remote_skipped);
    info!("  Remote failed: {}", stats.remote_failed);
    info!("{}", BANNER);
}
