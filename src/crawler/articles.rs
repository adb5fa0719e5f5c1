//! Concurrent article fetching for one listing page

use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::retry::RetryPolicy;
use crate::extract::{parse_article, ExtractError, Extractor};
use crate::output::ArticleRecord;
use crate::state::PageCursor;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Why a single article was dropped
#[derive(Debug, Error)]
pub enum ArticleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Fetches and extracts every article linked from one listing page
///
/// A failing article is logged and dropped; it never fails the page.
pub struct ArticleFetcher {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    retry: RetryPolicy,
}

impl ArticleFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn Extractor>, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            extractor,
            retry,
        }
    }

    /// Fetches all `urls` concurrently
    ///
    /// Blank and repeated URLs are skipped. The returned records follow the
    /// order of `urls`, minus the articles that failed.
    pub async fn fetch_all(&self, urls: &[String], page_index: PageCursor) -> Vec<ArticleRecord> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty() && seen.insert(*url))
            .collect();

        let results = join_all(unique.iter().map(|url| self.fetch_one(url, page_index))).await;

        let mut records = Vec::with_capacity(results.len());
        for (url, result) in unique.iter().zip(results) {
            match result {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Dropping article {}: {}", url, e),
            }
        }

        tracing::debug!(
            "Page {}: {} of {} articles extracted",
            page_index,
            records.len(),
            unique.len()
        );

        records
    }

    /// Fetches one article through the retry policy and extracts it
    pub async fn fetch_one(
        &self,
        url: &str,
        page_index: PageCursor,
    ) -> Result<ArticleRecord, ArticleError> {
        let body = self.retry.execute(|| self.fetcher.get(url)).await?;
        let record = parse_article(self.extractor.as_ref(), url, page_index, &body, Utc::now())?;
        Ok(record)
    }
}
