//! Storage traits and error types
//!
//! This module defines the trait interface for the durable object stores
//! batches are written to, and the associated error types.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object key '{0}'")]
    InvalidKey(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode object: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key/value object storage, organised in containers
///
/// `put` must only return `Ok` once the object is durable; callers treat a
/// successful put as permission to forget the data. Implementations must be
/// safe to share between tasks.
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Writes `body` under `key`, replacing any previous object
    fn put(&self, container: &str, key: &str, body: &[u8]) -> StorageResult<()>;

    /// Reads the object under `key`, if present
    fn get(&self, container: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Lists keys starting with `prefix`, sorted
    fn list(&self, container: &str, prefix: &str) -> StorageResult<Vec<String>>;
}

/// Rejects keys that could escape their container
pub fn validate_key(key: &str) -> StorageResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "..");

    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
