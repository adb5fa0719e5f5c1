//! Article Harvester: a resumable, polite article crawler
//!
//! This crate walks a paginated article listing page by page, fetches and
//! extracts every article it links to, writes the records to durable storage
//! in fixed-size batches and checkpoints its progress so an interrupted crawl
//! resumes without losing records.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Listing page {cursor} could not be fetched: {source}")]
    ListingFetch {
        cursor: state::PageCursor,
        source: crawler::FetchError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] state::CheckpointError),

    #[error("Invalid walk transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::WalkState,
        to: state::WalkState,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {field}: {message}")]
    InvalidSelector { field: String, message: String },

    #[error("Invalid value for environment variable {var}: {message}")]
    Env { var: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use output::{ArticleRecord, BatchSink};
pub use state::{Checkpoint, PageCursor, TerminationReason};
pub use crate::url::listing_url;
