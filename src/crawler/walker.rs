//! Page walker - the harvest loop
//!
//! The walker drives one listing page at a time through
//! `FetchListing → ExtractLinks → FetchArticles → FlushBatch → Advance`,
//! and stops on the first page without a "load more" affordance, on a
//! page-level error, on the page limit, or on a shutdown request.
//!
//! Checkpoints only ever name a page whose records have all been durably
//! written, so a crash at any point loses no records on restart.

use crate::config::Config;
use crate::crawler::articles::ArticleFetcher;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::limiter::RateLimiter;
use crate::crawler::retry::RetryPolicy;
use crate::extract::{parse_listing, Extractor, HtmlExtractor};
use crate::output::{BatchSink, FlushReport};
use crate::state::{Checkpoint, CheckpointStore, PageCursor, ResumePoint, TerminationReason, WalkState};
use crate::storage::ObjectStore;
use crate::url::listing_url;
use crate::{HarvestError, UrlError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use url::Url;

/// Counters for one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub pages: u64,
    pub articles: u64,
    pub dropped: u64,
    pub batches: u64,
    pub tokens: u64,
}

/// Drives the harvest across listing pages
pub struct PageWalker {
    root_url: String,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    articles: ArticleFetcher,
    retry: RetryPolicy,
    limiter: RateLimiter,
    sink: BatchSink,
    checkpoints: Arc<dyn CheckpointStore>,
    max_pages: Option<u64>,
    shutdown: watch::Receiver<bool>,
    state: WalkState,
    total_tokens: u64,
    last_saved: Option<PageCursor>,
    stats: WalkStats,
}

impl PageWalker {
    /// Creates a walker with no page delay, no page limit and no shutdown signal
    pub fn new(
        root_url: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        sink: BatchSink,
        checkpoints: Arc<dyn CheckpointStore>,
        retry: RetryPolicy,
    ) -> Self {
        // A receiver whose sender is gone never reports a shutdown
        let (_, shutdown) = watch::channel(false);

        Self {
            root_url: root_url.into(),
            articles: ArticleFetcher::new(fetcher.clone(), extractor.clone(), retry),
            fetcher,
            extractor,
            retry,
            limiter: RateLimiter::disabled(),
            sink,
            checkpoints,
            max_pages: None,
            shutdown,
            state: WalkState::Init,
            total_tokens: 0,
            last_saved: None,
            stats: WalkStats::default(),
        }
    }

    /// Builds a walker with every setting taken from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    /// * `fetcher` - HTTP access for listing and article pages
    /// * `store` - Where batches are written
    /// * `checkpoints` - Where progress is recorded
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ObjectStore>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> crate::Result<Self> {
        let extractor = HtmlExtractor::from_config(&config.site.selectors)?;
        let sink = BatchSink::new(
            store,
            config.storage.bucket.clone(),
            config.storage.key_prefix.clone(),
            config.crawler.articles_per_batch,
        );

        Ok(Self::new(
            config.site.root_url.clone(),
            fetcher,
            Arc::new(extractor),
            sink,
            checkpoints,
            RetryPolicy::from_config(&config.crawler),
        )
        .with_rate_limiter(RateLimiter::from_config(&config.crawler))
        .with_max_pages(config.crawler.max_pages))
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u64>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Stop after the in-flight page once `shutdown` holds `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Carries the token count and last checkpoint over from an earlier run
    pub fn restore(&mut self, resume: &ResumePoint) {
        self.total_tokens = resume.total_tokens;
        self.last_saved = resume.saved.map(|checkpoint| checkpoint.cursor);
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// Walks listing pages from `start_cursor` until something stops it
    ///
    /// Errors never escape: a page-level failure is logged and reported as
    /// [`TerminationReason::Failed`]. A walker runs once.
    pub async fn run(&mut self, start_cursor: PageCursor) -> TerminationReason {
        let started = Instant::now();
        tracing::info!("Starting walk at listing page {}", start_cursor);

        let reason = match self.walk(start_cursor).await {
            Ok(reason) => reason,
            Err(e) => {
                tracing::error!("Walk stopped by error: {}", e);
                TerminationReason::Failed(e.to_string())
            }
        };

        if !self.state.is_terminal() {
            self.state = WalkState::Terminate;
        }

        tracing::info!(
            "Walk {} after {:.1}s: {} pages, {} articles stored, {} dropped, {} batches, {} tokens this run ({} total)",
            reason,
            started.elapsed().as_secs_f64(),
            self.stats.pages,
            self.stats.articles,
            self.stats.dropped,
            self.stats.batches,
            self.stats.tokens,
            self.total_tokens
        );

        reason
    }

    async fn walk(&mut self, start_cursor: PageCursor) -> crate::Result<TerminationReason> {
        let mut cursor = start_cursor;
        self.transition(WalkState::FetchListing)?;

        loop {
            let url = listing_url(&self.root_url, cursor);
            tracing::info!("Fetching listing page {}: {}", cursor, url);

            let body = self
                .retry
                .execute(|| self.fetcher.get(&url))
                .await
                .map_err(|source| HarvestError::ListingFetch { cursor, source })?;

            self.transition(WalkState::ExtractLinks)?;
            let base = Url::parse(&url).map_err(|e| UrlError::Parse(e.to_string()))?;
            let listing = parse_listing(self.extractor.as_ref(), &body, &base);
            tracing::debug!(
                "Listing page {} links {} articles (load more: {})",
                cursor,
                listing.article_urls.len(),
                listing.has_more
            );

            self.transition(WalkState::FetchArticles)?;
            let records = self.articles.fetch_all(&listing.article_urls, cursor).await;
            self.stats.dropped += (listing.article_urls.len() - records.len()) as u64;

            self.transition(WalkState::FlushBatch)?;
            for record in records {
                if let Some(report) = self.sink.add(record)? {
                    self.record_flush(&report);
                }
            }
            self.save_checkpoint(cursor)?;
            self.stats.pages += 1;

            let stop = if !listing.has_more {
                Some(TerminationReason::Completed)
            } else if self.max_pages.is_some_and(|max| self.stats.pages >= max) {
                Some(TerminationReason::PageLimitReached)
            } else if *self.shutdown.borrow() {
                Some(TerminationReason::Interrupted)
            } else {
                None
            };

            if let Some(reason) = stop {
                self.finish(cursor)?;
                return Ok(reason);
            }

            self.transition(WalkState::Advance)?;
            if !self.limiter.pause(&mut self.shutdown).await {
                self.finish(cursor)?;
                return Ok(TerminationReason::Interrupted);
            }
            cursor += 1;
            self.transition(WalkState::FetchListing)?;
        }
    }

    /// Writes whatever is still buffered, checkpoints, and terminates
    fn finish(&mut self, cursor: PageCursor) -> crate::Result<()> {
        if let Some(report) = self.sink.flush()? {
            self.record_flush(&report);
        }
        self.save_checkpoint(cursor)?;
        self.transition(WalkState::Terminate)
    }

    fn record_flush(&mut self, report: &FlushReport) {
        self.stats.batches += 1;
        self.stats.articles += report.records as u64;
        self.stats.tokens += report.tokens;
        self.total_tokens += report.tokens;
    }

    /// Saves a checkpoint if the durable frontier moved past the last one
    ///
    /// Every page before the oldest still-buffered record is durable; with an
    /// empty buffer everything through `cursor` is.
    fn save_checkpoint(&mut self, cursor: PageCursor) -> crate::Result<()> {
        let durable = match self.sink.oldest_pending_page() {
            Some(0) => return Ok(()),
            Some(pending) => pending - 1,
            None => cursor,
        };

        if self.last_saved.is_some_and(|saved| durable <= saved) {
            return Ok(());
        }

        self.checkpoints
            .save(&Checkpoint::new(durable, self.total_tokens))?;
        self.last_saved = Some(durable);
        tracing::debug!(
            "Checkpoint saved at page {} ({} tokens)",
            durable,
            self.total_tokens
        );
        Ok(())
    }

    fn transition(&mut self, next: WalkState) -> crate::Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Walk state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}
