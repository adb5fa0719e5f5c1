//! Storage module for persisting article batches
//!
//! This module provides the durable object stores batches are written to:
//! - `FilesystemStore`: one file per object under a root directory
//! - `SqliteStore`: one row per object in a SQLite database

mod filesystem;
mod schema;
mod sqlite;
mod traits;

pub use filesystem::{write_atomic, FilesystemStore};
pub use sqlite::SqliteStore;
pub use traits::{validate_key, ObjectStore, StorageError, StorageResult};

use crate::config::{Config, StorageBackend};
use std::path::Path;
use std::sync::Arc;

/// Opens the object store selected by the configuration
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn ObjectStore>)` - Store ready for writes
/// * `Err(StorageError)` - The backend could not be opened
pub fn open_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    let output_path = Path::new(&config.output.output_path);

    let store: Arc<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::Filesystem => Arc::new(FilesystemStore::new(output_path)),
        StorageBackend::Sqlite => Arc::new(SqliteStore::new(output_path)?),
    };

    tracing::info!(
        "Using {} storage at {} (bucket: {}, region: {})",
        store.name(),
        output_path.display(),
        config.storage.bucket,
        config.storage.region
    );

    Ok(store)
}
