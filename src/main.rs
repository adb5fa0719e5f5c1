//! Article Harvester main entry point
//!
//! This is the command-line interface for the resumable article harvester.

use anyhow::Context;
use article_harvester::config::{load_config_from_env, load_config_with_hash, Config};
use article_harvester::crawler::{run_harvest, user_agent_string, HarvestOptions};
use article_harvester::listing_url;
use article_harvester::state::{CheckpointStore, FileCheckpointStore, ResumePoint};
use article_harvester::storage::{open_store, ObjectStore};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Article Harvester: a resumable, polite article crawler
///
/// Walks a paginated article listing, extracts every linked article and
/// stores them in batches. Progress is checkpointed so an interrupted
/// harvest picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "article-harvester")]
#[command(version)]
#[command(about = "A resumable, polite article crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults and environment only when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from page 0, ignoring the stored checkpoint
    #[arg(long)]
    fresh: bool,

    /// Start from this listing page instead of the checkpointed one
    #[arg(long, value_name = "N")]
    start_page: Option<u64>,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Show the stored checkpoint and batches and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let (config, config_hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            (config, Some(hash))
        }
        None => (
            load_config_from_env().context("Invalid configuration from environment")?,
            None,
        ),
    };

    setup_logging(cli.verbose, cli.quiet, config.output.log_path.as_deref())?;

    match (&cli.config, config_hash) {
        (Some(path), Some(hash)) => {
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash)
        }
        _ => tracing::info!("Configuration built from defaults and environment"),
    }

    if cli.dry_run {
        handle_dry_run(&config, &cli)?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.status {
        handle_status(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_harvest(&config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr, or are appended to `log_path` without colours.
fn setup_logging(verbose: u8, quiet: bool, log_path: Option<&str>) -> anyhow::Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("article_harvester=info,warn"),
            1 => EnvFilter::new("article_harvester=debug,info"),
            2 => EnvFilter::new("article_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let checkpoints = FileCheckpointStore::new(&config.output.checkpoint_path);
    let resume = if cli.fresh {
        ResumePoint::fresh()
    } else {
        ResumePoint::from_saved(checkpoints.load()?)
    };
    let start = cli.start_page.unwrap_or(resume.start_cursor);

    println!("=== Article Harvester Dry Run ===\n");

    println!("Site:");
    println!("  Root URL: {}", config.site.root_url);
    println!("  First listing page: {}", listing_url(&config.site.root_url, start));
    match config.crawler.max_pages {
        Some(max) => println!("  Page limit: {}", max),
        None => println!("  Page limit: none"),
    }

    println!("\nCrawler:");
    println!("  Attempts per fetch: {}", config.crawler.max_attempts);
    println!(
        "  Backoff: {}ms x 2^n, within [{}ms, {}ms]",
        config.crawler.backoff_multiplier_ms,
        config.crawler.backoff_min_ms,
        config.crawler.backoff_max_ms
    );
    println!(
        "  Page delay: {}-{}ms",
        config.crawler.page_delay_min_ms, config.crawler.page_delay_max_ms
    );
    println!("  Articles per batch: {}", config.crawler.articles_per_batch);
    println!("  User agent: {}", user_agent_string(&config.user_agent));

    println!("\nStorage:");
    println!("  Backend: {:?}", config.storage.backend);
    println!("  Location: {}", config.output.output_path);
    println!("  Bucket: {} ({})", config.storage.bucket, config.storage.region);
    println!("  Keys: {}/NNNNNNN.json", config.storage.key_prefix);
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --status mode: shows the checkpoint and stored batches
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let checkpoints = FileCheckpointStore::new(&config.output.checkpoint_path);

    println!("Checkpoint: {}", config.output.checkpoint_path);
    match checkpoints.load()? {
        Some(checkpoint) => {
            println!("  Last durable page: {}", checkpoint.cursor);
            println!("  Next page: {}", checkpoint.cursor + 1);
            println!("  Tokens stored: {}", checkpoint.total_tokens);
        }
        None => println!("  None (next harvest starts at page 0)"),
    }

    let store = open_store(config)?;
    let prefix = format!("{}/", config.storage.key_prefix);
    let keys = store.list(&config.storage.bucket, &prefix)?;

    println!("\nBatches in {}/{} ({}):", config.storage.bucket, prefix, keys.len());
    for key in &keys {
        println!("  {}", key);
    }

    Ok(())
}

/// Handles the main harvest, exiting non-zero when the walk fails
async fn handle_harvest(config: &Config, cli: &Cli) -> anyhow::Result<ExitCode> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            let _ = shutdown_tx.send(true);
        }
    });

    let options = HarvestOptions {
        fresh: cli.fresh,
        start_page: cli.start_page,
    };

    let reason = run_harvest(config, options, shutdown_rx).await?;

    if reason.is_success() {
        tracing::info!("Harvest finished: {}", reason);
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("Harvest finished: {}", reason);
        Ok(ExitCode::FAILURE)
    }
}
