//! Publication of rendered documents to the remote store, at most once per
//! remote key.

use crate::isolate::isolated;
use crate::traits::RemoteBridge;
use crate::types::{Result, UploadSummary};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathOutcome {
    Uploaded,
    Skipped,
}

pub struct RemoteGate {
    bridge: Box<dyn RemoteBridge>,
    root_folder: String,
    output_root: PathBuf,
}

impl RemoteGate {
    pub fn new(bridge: Box<dyn RemoteBridge>, root_folder: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            bridge,
            root_folder: root_folder.into(),
            output_root: output_root.into(),
        }
    }

    pub fn root_folder(&self) -> &str {
        &self.root_folder
    }

    /// Name of the feed subfolder a document belongs to: its parent directory,
    /// provided the grandparent is the output root. Matching is by path or by
    /// final component, so a feed titled like the output root's basename is
    /// misread as a subfolder.
    pub fn feed_subfolder(&self, document: &Path) -> Option<String> {
        let parent = document.parent()?;
        let grandparent = parent.parent()?;

        let same_name = match (grandparent.file_name(), self.output_root.file_name()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if !(same_name || grandparent == self.output_root) {
            return None;
        }
        parent.file_name().map(|name| name.to_string_lossy().into_owned())
    }

    pub fn remote_folder(&self, subfolder: Option<&str>) -> String {
        match subfolder {
            Some(sub) => format!("{}/{}", self.root_folder, sub),
            None => self.root_folder.clone(),
        }
    }

    /// `{root}/{subfolder}/{stem}`, the remote idempotency key of a document.
    pub fn remote_key(&self, document: &Path, subfolder: Option<&str>) -> String {
        let stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.remote_folder(subfolder), stem)
    }

    /// Publish each document unless the remote store already holds it.
    pub async fn publish(&self, documents: &[PathBuf]) -> UploadSummary {
        if let Err(e) = self.bridge.version().await {
            error!("rmapi not available, cannot upload: {}", e);
            return UploadSummary::all_skipped(documents.len());
        }

        if let Err(e) = self.ensure_folder(&self.root_folder).await {
            error!("Failed to ensure folder '{}' exists, skipping uploads: {}", self.root_folder, e);
            return UploadSummary::all_skipped(documents.len());
        }

        let mut summary = UploadSummary::default();
        for document in documents {
            let name = document
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| document.display().to_string());

            match isolated(self.publish_one(document)).await {
                Ok(Ok(PathOutcome::Uploaded)) => summary.uploaded += 1,
                Ok(Ok(PathOutcome::Skipped)) => summary.skipped += 1,
                Ok(Err(e)) => {
                    error!("Failed to upload {}: {}", name, e);
                    summary.failed += 1;
                }
                Err(panic) => {
                    error!("Unexpected error processing {}: {}", name, panic);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Remote upload summary: {} uploaded, {} skipped, {} failed",
            summary.uploaded, summary.skipped, summary.failed
        );
        summary
    }

    async fn publish_one(&self, document: &Path) -> Result<PathOutcome> {
        let subfolder = self.feed_subfolder(document);
        let key = self.remote_key(document, subfolder.as_deref());

        if self.bridge.find(&key).await? {
            info!("Already in remote store, skipping: {}", key);
            return Ok(PathOutcome::Skipped);
        }

        let target = self.remote_folder(subfolder.as_deref());
        if subfolder.is_some() {
            self.ensure_folder(&target).await?;
        }

        info!("Uploading {} to remote folder: {}", document.display(), target);
        self.bridge.put(document, &target).await?;
        info!("Successfully uploaded {}", key);
        Ok(PathOutcome::Uploaded)
    }

    async fn ensure_folder(&self, folder: &str) -> Result<()> {
        if self.bridge.find(folder).await? {
            return Ok(());
        }
        info!("Creating folder '{}' in remote store", folder);
        self.bridge.mkdir(folder).await
    }
}
