use crate::traits::DocumentEngine;
use crate::types::{PublisherError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// HTML-to-PDF engine run as an external process that reads HTML on stdin
/// and writes the document to stdout (`weasyprint - -` by default).
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    extension: String,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
            extension: "pdf".to_string(),
        }
    }

    pub fn weasyprint(program: impl Into<PathBuf>) -> Self {
        Self::new(program, vec!["-".to_string(), "-".to_string()])
    }

    /// Bound each invocation. Without this the engine may run indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

/// Embed the stylesheet in the document head (or in front of it when the
/// markup has no head).
pub fn inline_stylesheet(html: &str, stylesheet: &str) -> String {
    if stylesheet.trim().is_empty() {
        return html.to_string();
    }
    let style = format!("<style>\n{}\n</style>\n", stylesheet);
    match html.find("</head>") {
        Some(idx) => format!("{}{}{}", &html[..idx], style, &html[idx..]),
        None => format!("{}{}", style, html),
    }
}

#[async_trait]
impl DocumentEngine for CommandEngine {
    async fn render(&self, html: &str, stylesheet: &str) -> Result<Vec<u8>> {
        let program = self.program.display().to_string();
        debug!("Invoking document engine: {} {:?}", program, self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PublisherError::Engine(format!("failed to start {}: {}", program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PublisherError::Engine(format!("{} has no stdin", program)))?;
        let document = inline_stylesheet(html, stylesheet);

        let feed_input = async move {
            let result = stdin.write_all(document.as_bytes()).await;
            drop(stdin);
            result
        };
        let run = async move { tokio::join!(feed_input, child.wait_with_output()) };

        let (input_result, output) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                PublisherError::Engine(format!("{} timed out after {}s", program, limit.as_secs()))
            })?,
            None => run.await,
        };
        let output = output?;

        if !output.status.success() {
            return Err(PublisherError::Engine(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        input_result?;

        if output.stdout.is_empty() {
            return Err(PublisherError::Engine(format!("{} produced no output", program)));
        }
        Ok(output.stdout)
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}
