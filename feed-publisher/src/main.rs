use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use feed_publisher::{feed_list, logging, FeedPublisher, PublisherConfig, RemoteBridge, RmapiBridge};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "feed-publisher",
    about = "Render recent feed entries to PDF and publish them to the reMarkable cloud"
)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    /// Log at DEBUG level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Command-line values that take precedence over the environment.
#[derive(Args, Debug)]
struct Overrides {
    /// Path to the feed list
    #[arg(long, global = true)]
    feeds_file: Option<PathBuf>,

    /// Output directory for documents
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Hours to look back for recent entries
    #[arg(long, global = true)]
    recent_hours: Option<u32>,

    /// Remote folder name (default: AtomFeeds)
    #[arg(long, global = true)]
    remarkable_folder: Option<String>,

    /// Path to the rmapi binary
    #[arg(long, global = true)]
    rmapi_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process all feeds once (the default)
    Run {
        /// Print the run statistics as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration and collaborators without processing feeds
    Check,
    /// List the remote folder
    RemoteLs {
        /// Folder to list (default: the configured remote folder)
        folder: Option<String>,
    },
}

impl Overrides {
    fn apply(self, config: &mut PublisherConfig) {
        if let Some(feeds_file) = self.feeds_file {
            config.feeds_file = feeds_file;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(recent_hours) = self.recent_hours {
            config.recent_hours = recent_hours;
        }
        if let Some(folder) = self.remarkable_folder {
            config.remote_folder = folder;
        }
        if let Some(rmapi_path) = self.rmapi_path {
            config.rmapi_path = rmapi_path;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = PublisherConfig::from_env();
    cli.overrides.apply(&mut config);

    let log_file = logging::init_logging(&config.log_dir, cli.verbose).context("Failed to initialize logging")?;
    info!("Logging to {}", log_file.display());
    for warning in &config.warnings {
        warn!("{}", warning);
    }
    config.setup_directories().context("Failed to set up directories")?;

    let code = match cli.command.unwrap_or(Command::Run { json: false }) {
        Command::Run { json } => run(&config, json).await?,
        Command::Check => check(&config).await?,
        Command::RemoteLs { folder } => remote_ls(&config, folder).await?,
    };

    std::process::exit(code);
}

async fn run(config: &PublisherConfig, json: bool) -> anyhow::Result<i32> {
    let publisher = FeedPublisher::from_config(config).context("Failed to construct publisher")?;
    let stats = publisher.run().await.context("Feed run aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(stats.outcome().exit_code())
}

async fn check(config: &PublisherConfig) -> anyhow::Result<i32> {
    let mut healthy = true;

    let feeds = feed_list::load_feed_urls(&config.feeds_file).await?;
    if feeds.is_empty() {
        warn!("No feeds configured in {}", config.feeds_file.display());
        healthy = false;
    } else {
        info!("{} feeds configured", feeds.len());
    }

    let template = config.template_path();
    if template.exists() {
        info!("Template: {}", template.display());
    } else {
        warn!("Template {} missing, the bundled template will be used", template.display());
    }
    if !config.css_file.exists() {
        warn!("Stylesheet {} missing, fallback styles will be used", config.css_file.display());
    }

    let bridge = RmapiBridge::new(&config.rmapi_path).with_timeouts(config.bridge_timeout, config.upload_timeout);
    match bridge.version().await {
        Ok(version) => {
            info!("rmapi: {}", version);
            if let Err(e) = ensure_remote_folder(&bridge, &config.remote_folder).await {
                error!("Cannot ensure remote folder '{}': {}", config.remote_folder, e);
                healthy = false;
            }
        }
        Err(e) => {
            error!("rmapi unavailable: {}", e);
            healthy = false;
        }
    }

    Ok(if healthy { 0 } else { 1 })
}

async fn ensure_remote_folder(bridge: &RmapiBridge, folder: &str) -> feed_publisher::Result<()> {
    if bridge.find(folder).await? {
        info!("Remote folder '{}' exists", folder);
        return Ok(());
    }
    bridge.mkdir(folder).await?;
    info!("Created remote folder '{}'", folder);
    Ok(())
}

async fn remote_ls(config: &PublisherConfig, folder: Option<String>) -> anyhow::Result<i32> {
    let bridge = RmapiBridge::new(&config.rmapi_path).with_timeouts(config.bridge_timeout, config.upload_timeout);
    bridge.version().await.context("rmapi unavailable")?;

    let folder = folder.unwrap_or_else(|| config.remote_folder.clone());
    let listing = bridge
        .list(&folder)
        .await
        .with_context(|| format!("Failed to list {}", folder))?;
    print!("{}", listing);
    Ok(0)
}
