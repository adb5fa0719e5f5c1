//! Crawler module for listing and article fetching
//!
//! This module contains the core harvest logic, including:
//! - HTTP fetching with retry and backoff
//! - Concurrent article fetching per listing page
//! - Politeness delays between listing pages
//! - The page walker that ties it together with batching and checkpoints

mod articles;
mod fetcher;
mod limiter;
mod retry;
mod walker;

pub use articles::{ArticleError, ArticleFetcher};
pub use fetcher::{build_http_client, user_agent_string, FetchError, Fetcher, HttpFetcher};
pub use limiter::RateLimiter;
pub use retry::{Backoff, RetryPolicy, Retryable};
pub use walker::{PageWalker, WalkStats};

use crate::config::Config;
use crate::state::{CheckpointStore, FileCheckpointStore, PageCursor, ResumePoint, TerminationReason};
use crate::storage::open_store;
use std::sync::Arc;
use tokio::sync::watch;

/// How a harvest picks its starting page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestOptions {
    /// Ignore the stored checkpoint
    pub fresh: bool,

    /// Start at this page instead of the checkpointed one
    pub start_page: Option<PageCursor>,
}

/// Runs a complete harvest
///
/// This is the main entry point for starting a harvest. It will:
/// 1. Open the configured object store
/// 2. Load the checkpoint and work out the starting page
/// 3. Build the HTTP client
/// 4. Walk listing pages until the walk terminates
///
/// # Arguments
///
/// * `config` - A validated configuration
/// * `options` - Resume overrides
/// * `shutdown` - Flips to `true` when the harvest should stop after the current page
///
/// # Returns
///
/// * `Ok(TerminationReason)` - Why the walk stopped (which may be a failure)
/// * `Err(HarvestError)` - The harvest could not be set up
pub async fn run_harvest(
    config: &Config,
    options: HarvestOptions,
    shutdown: watch::Receiver<bool>,
) -> crate::Result<TerminationReason> {
    let store = open_store(config)?;
    let checkpoints = Arc::new(FileCheckpointStore::new(&config.output.checkpoint_path));

    let resume = if options.fresh {
        tracing::info!("Fresh harvest requested, ignoring stored checkpoint");
        ResumePoint::fresh()
    } else {
        let resume = ResumePoint::from_saved(checkpoints.load()?);
        match resume.saved {
            Some(saved) => tracing::info!(
                "Resuming after page {} ({} tokens so far)",
                saved.cursor,
                saved.total_tokens
            ),
            None => tracing::info!("No checkpoint at {}, starting from page 0", checkpoints.path().display()),
        }
        resume
    };

    let start_cursor = match options.start_page {
        Some(page) => {
            tracing::info!("Start page overridden to {}", page);
            page
        }
        None => resume.start_cursor,
    };

    let fetcher = Arc::new(HttpFetcher::from_config(&config.user_agent)?);
    let mut walker = PageWalker::from_config(config, fetcher, store, checkpoints)?
        .with_shutdown(shutdown);
    walker.restore(&resume);

    Ok(walker.run(start_cursor).await)
}
