//! Output module for article records and batched writes
//!
//! This module handles:
//! - The immutable [`ArticleRecord`] produced for every extracted article
//! - Buffering records and writing them to the object store in batches

mod batch;
mod record;

pub use batch::{BatchSink, FlushReport};
pub use record::ArticleRecord;
