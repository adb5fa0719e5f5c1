//! Configuration module for the harvester
//!
//! Configuration is read from an optional TOML file (every key has a default),
//! then overridden from `HARVEST_*` environment variables, then validated.
//!
//! # Example
//!
//! ```no_run
//! use article_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Batch size: {}", config.crawler.articles_per_batch);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, FieldSelector, OutputConfig, SelectorConfig, SiteConfig,
    StorageBackend, StorageConfig, UserAgentConfig,
};

pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_from_env,
    load_config_with_hash,
};
pub use validation::validate;
