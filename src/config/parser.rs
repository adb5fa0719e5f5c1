use crate::config::types::{Config, StorageBackend};
use crate::config::validation::validate;
use crate::{ConfigError, ConfigResult};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const ENV_ROOT_URL: &str = "HARVEST_ROOT_URL";
pub const ENV_LOG_PATH: &str = "HARVEST_LOG_PATH";
pub const ENV_BUCKET: &str = "HARVEST_BUCKET";
pub const ENV_REGION: &str = "HARVEST_REGION";
pub const ENV_CHECKPOINT_PATH: &str = "HARVEST_CHECKPOINT_PATH";
pub const ENV_OUTPUT_PATH: &str = "HARVEST_OUTPUT_PATH";
pub const ENV_ARTICLES_PER_BATCH: &str = "HARVEST_ARTICLES_PER_BATCH";
pub const ENV_STORAGE_BACKEND: &str = "HARVEST_STORAGE_BACKEND";

/// Loads, overrides from the process environment, and validates a configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use article_harvester::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Listing root: {}", config.site.root_url);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate(&config)?;

    Ok(config)
}

/// Builds a configuration from defaults and the process environment only
pub fn load_config_from_env() -> ConfigResult<Config> {
    let mut config = Config::default();
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Applies `HARVEST_*` overrides on top of file or default values
///
/// `lookup` resolves a variable name to its value; the binary passes the
/// process environment, tests pass a map.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root_url) = lookup(ENV_ROOT_URL) {
        config.site.root_url = root_url;
    }
    if let Some(log_path) = lookup(ENV_LOG_PATH) {
        config.output.log_path = Some(log_path);
    }
    if let Some(bucket) = lookup(ENV_BUCKET) {
        config.storage.bucket = bucket;
    }
    if let Some(region) = lookup(ENV_REGION) {
        config.storage.region = region;
    }
    if let Some(checkpoint_path) = lookup(ENV_CHECKPOINT_PATH) {
        config.output.checkpoint_path = checkpoint_path;
    }
    if let Some(output_path) = lookup(ENV_OUTPUT_PATH) {
        config.output.output_path = output_path;
    }
    if let Some(raw) = lookup(ENV_ARTICLES_PER_BATCH) {
        config.crawler.articles_per_batch =
            raw.trim().parse().map_err(|e| ConfigError::Env {
                var: ENV_ARTICLES_PER_BATCH.to_string(),
                message: format!("'{}' is not a count: {}", raw, e),
            })?;
    }
    if let Some(raw) = lookup(ENV_STORAGE_BACKEND) {
        config.storage.backend = StorageBackend::parse(&raw).ok_or_else(|| ConfigError::Env {
            var: ENV_STORAGE_BACKEND.to_string(),
            message: format!("expected 'filesystem' or 'sqlite', got '{}'", raw),
        })?;
    }
    Ok(())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the configuration they used.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
