//! Batch buffering and flushing
//!
//! Records accumulate in memory and are written to the object store as one
//! JSON Lines object each time the buffer reaches the configured size. A
//! failed write keeps the buffer intact.

use crate::output::ArticleRecord;
use crate::state::PageCursor;
use crate::storage::{ObjectStore, StorageResult};
use std::sync::Arc;

/// Outcome of one successful flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Object key the batch was written under
    pub key: String,

    /// Records in the batch
    pub records: usize,

    /// Content tokens in the batch
    pub tokens: u64,
}

/// Buffers article records and writes them out in fixed-size batches
pub struct BatchSink {
    store: Arc<dyn ObjectStore>,
    container: String,
    key_prefix: String,
    threshold: usize,
    buffer: Vec<ArticleRecord>,
    /// Page the last batch was keyed on, and how many batches used it
    last_key_page: Option<(PageCursor, u32)>,
}

impl BatchSink {
    /// Creates an empty sink
    ///
    /// # Arguments
    ///
    /// * `store` - Where batches are written
    /// * `container` - Container (bucket) name
    /// * `key_prefix` - Key prefix, e.g. `DATA`
    /// * `threshold` - Records per batch; values below 1 are treated as 1
    pub fn new(
        store: Arc<dyn ObjectStore>,
        container: impl Into<String>,
        key_prefix: impl Into<String>,
        threshold: usize,
    ) -> Self {
        let threshold = threshold.max(1);
        Self {
            store,
            container: container.into(),
            key_prefix: key_prefix.into(),
            threshold,
            buffer: Vec::with_capacity(threshold),
            last_key_page: None,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Listing page of the oldest record still waiting to be written
    pub fn oldest_pending_page(&self) -> Option<PageCursor> {
        self.buffer.iter().map(ArticleRecord::page_index).min()
    }

    /// Appends a record, flushing when the buffer reaches the threshold
    ///
    /// Returns the flush report when this record completed a batch.
    pub fn add(&mut self, record: ArticleRecord) -> StorageResult<Option<FlushReport>> {
        self.buffer.push(record);

        if self.buffer.len() >= self.threshold {
            return self.flush();
        }
        Ok(None)
    }

    /// Writes every buffered record as one object
    ///
    /// Returns `Ok(None)` when there is nothing to write. On error the buffer
    /// is left untouched so the same records can be written again.
    pub fn flush(&mut self) -> StorageResult<Option<FlushReport>> {
        let Some(first_page) = self.buffer.first().map(ArticleRecord::page_index) else {
            return Ok(None);
        };

        let mut payload = Vec::new();
        for record in &self.buffer {
            serde_json::to_writer(&mut payload, record)?;
            payload.push(b'\n');
        }

        let (key, sequence) = self.next_key(first_page);
        self.store.put(&self.container, &key, &payload)?;

        let report = FlushReport {
            key,
            records: self.buffer.len(),
            tokens: self.buffer.iter().map(ArticleRecord::token_count).sum(),
        };

        tracing::info!(
            "Flushed {} records ({} tokens, {} bytes) to {}/{}",
            report.records,
            report.tokens,
            payload.len(),
            self.container,
            report.key
        );

        self.buffer.clear();
        self.last_key_page = Some((first_page, sequence));
        Ok(Some(report))
    }

    /// Key for a batch whose first record came from `first_page`
    ///
    /// `{prefix}/{page:07}.json` for the first batch keyed on a page, then
    /// `{prefix}/{page:07}-{n}.json` for later ones.
    fn next_key(&self, first_page: PageCursor) -> (String, u32) {
        let sequence = match self.last_key_page {
            Some((page, used)) if page == first_page => used + 1,
            _ => 0,
        };

        let key = if sequence == 0 {
            format!("{}/{:07}.json", self.key_prefix, first_page)
        } else {
            format!("{}/{:07}-{}.json", self.key_prefix, first_page, sequence)
        };

        (key, sequence)
    }
}
