//! Console plus per-day file logging.

use crate::types::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// `{log_dir}/feed_publisher_{YYYYMMDD}.log`
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("feed_publisher_{}.log", Local::now().format("%Y%m%d")))
}

fn level_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber: human-readable console output and an
/// append-only log file in `log_dir`. `verbose` forces DEBUG on both.
pub fn init_logging(log_dir: &Path, verbose: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(level_filter(verbose)),
        )
        .with(tracing_subscriber::fmt::layer().with_filter(level_filter(verbose)))
        .try_init()
        .map_err(|e| crate::types::PublisherError::Config(format!("logging already initialized: {}", e)))?;

    Ok(path)
}
