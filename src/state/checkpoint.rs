//! Crawl checkpoints
//!
//! A checkpoint records the last listing page whose records are all durably
//! stored, plus the running token count. It is written atomically so a crash
//! mid-write leaves the previous checkpoint intact.

use crate::storage::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Index of a listing page; page N lives at `{root}?page={N}`
pub type PageCursor = u64;

/// Durable snapshot of crawl progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Last listing page whose records are all durably stored
    pub cursor: PageCursor,

    /// Tokens of article content stored so far, across runs
    pub total_tokens: u64,
}

impl Checkpoint {
    pub fn new(cursor: PageCursor, total_tokens: u64) -> Self {
        Self {
            cursor,
            total_tokens,
        }
    }
}

/// Errors that can occur while reading or writing checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Checkpoint at {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Persistence for the crawl's resume position
pub trait CheckpointStore: Send + Sync {
    /// Returns the stored checkpoint; `Ok(None)` when none was ever saved
    fn load(&self) -> CheckpointResult<Option<Checkpoint>>;

    /// Durably replaces the stored checkpoint
    fn save(&self, checkpoint: &Checkpoint) -> CheckpointResult<()>;

    /// Returns the stored checkpoint, or `{cursor: 0, total_tokens: 0}`
    fn load_or_default(&self) -> CheckpointResult<Checkpoint> {
        Ok(self.load()?.unwrap_or_default())
    }
}

/// Where a walk starts, derived from the stored checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    /// First listing page to fetch
    pub start_cursor: PageCursor,

    /// Token count carried over from earlier runs
    pub total_tokens: u64,

    /// The checkpoint this point was derived from
    pub saved: Option<Checkpoint>,
}

impl ResumePoint {
    /// A checkpointed page is complete, so the walk resumes on the page after it.
    /// Without a checkpoint the walk starts at page 0.
    pub fn from_saved(saved: Option<Checkpoint>) -> Self {
        match saved {
            Some(checkpoint) => Self {
                start_cursor: checkpoint.cursor + 1,
                total_tokens: checkpoint.total_tokens,
                saved,
            },
            None => Self::fresh(),
        }
    }

    /// Start from page 0 with no history
    pub fn fresh() -> Self {
        Self {
            start_cursor: 0,
            total_tokens: 0,
            saved: None,
        }
    }
}

/// Checkpoint stored as a small JSON document on the local filesystem
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> CheckpointResult<Option<Checkpoint>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CheckpointError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let checkpoint =
            serde_json::from_str(&content).map_err(|e| CheckpointError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        let body = serde_json::to_vec(checkpoint)?;

        write_atomic(&self.path, &body).map_err(|e| CheckpointError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        tracing::debug!(
            "Saved checkpoint cursor={} total_tokens={} to {}",
            checkpoint.cursor,
            checkpoint.total_tokens,
            self.path.display()
        );
        Ok(())
    }
}
