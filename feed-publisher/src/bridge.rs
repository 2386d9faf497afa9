//! Process adapter for the `rmapi` command-line tool.
//!
//! The tool is treated as an opaque command: only exit status, stdout and
//! stderr are interpreted.

use crate::traits::RemoteBridge;
use crate::types::{BridgeErrorKind, PublisherError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
struct CommandOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn into_failure(self) -> BridgeErrorKind {
        BridgeErrorKind::NonZeroExit {
            code: self.code,
            stderr: self.stderr,
        }
    }
}

/// `find` reports presence by exiting 0 with something on stdout.
fn find_reports_present(output: &CommandOutput) -> bool {
    output.success && !output.stdout.trim().is_empty()
}

/// `mkdir` on an existing folder fails with an "already exists" message.
fn mkdir_succeeded(output: &CommandOutput) -> bool {
    output.success || output.stderr.to_lowercase().contains("already exists")
}

pub struct RmapiBridge {
    program: PathBuf,
    metadata_timeout: Duration,
    upload_timeout: Duration,
}

impl RmapiBridge {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            metadata_timeout: METADATA_TIMEOUT,
            upload_timeout: UPLOAD_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, metadata: Duration, upload: Duration) -> Self {
        self.metadata_timeout = metadata;
        self.upload_timeout = upload;
        self
    }

    /// List the contents of `folder`. Diagnostic only; the gate never uses it.
    pub async fn list(&self, folder: &str) -> Result<String> {
        let output = self.invoke(&["ls", folder], self.metadata_timeout).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(self.failure("ls", output.into_failure()))
        }
    }

    async fn invoke(&self, args: &[&str], timeout: Duration) -> Result<CommandOutput> {
        let verb = args.first().copied().unwrap_or_default();
        debug!("Running {} {:?}", self.program.display(), args);

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                let kind = if e.kind() == std::io::ErrorKind::NotFound {
                    BridgeErrorKind::NotFound
                } else {
                    BridgeErrorKind::Spawn(e.to_string())
                };
                self.failure(verb, kind)
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| self.failure(verb, BridgeErrorKind::Timeout(timeout)))?
            .map_err(|e| self.failure(verb, BridgeErrorKind::Spawn(e.to_string())))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn failure(&self, verb: &str, kind: BridgeErrorKind) -> PublisherError {
        PublisherError::Bridge {
            command: format!("{} {}", self.program.display(), verb),
            kind,
        }
    }
}

#[async_trait]
impl RemoteBridge for RmapiBridge {
    async fn version(&self) -> Result<String> {
        let output = self.invoke(&["version"], self.metadata_timeout).await?;
        if !output.success {
            return Err(self.failure("version", output.into_failure()));
        }
        let version = output.stdout.trim().to_string();
        info!("rmapi available: {}", version);
        Ok(version)
    }

    async fn find(&self, path: &str) -> Result<bool> {
        let output = self.invoke(&["find", path], self.metadata_timeout).await?;
        Ok(find_reports_present(&output))
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        let output = self.invoke(&["mkdir", path], self.metadata_timeout).await?;
        if mkdir_succeeded(&output) {
            Ok(())
        } else {
            Err(self.failure("mkdir", output.into_failure()))
        }
    }

    async fn put(&self, local_file: &Path, remote_folder: &str) -> Result<()> {
        let local = local_file.to_string_lossy();
        let output = self
            .invoke(&["put", &*local, remote_folder], self.upload_timeout)
            .await?;
        if output.success {
            Ok(())
        } else {
            Err(self.failure("put", output.into_failure()))
        }
    }
}
