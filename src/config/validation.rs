use crate::config::types::{
    Config, CrawlerConfig, FieldSelector, OutputConfig, SiteConfig, StorageConfig,
    UserAgentConfig,
};
use crate::storage::validate_key;
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the listing root and every selector
fn validate_site_config(config: &SiteConfig) -> ConfigResult<()> {
    let url = Url::parse(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "root_url must use http or https, got '{}'",
            config.root_url
        )));
    }

    if url.query().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "root_url must not carry a query string, got '{}'",
            config.root_url
        )));
    }

    let selectors = &config.selectors;
    validate_selector("article-link", &selectors.article_link)?;
    validate_selector("load-more", &selectors.load_more)?;
    validate_selector("published-date", &selectors.published_date)?;
    validate_selector("title", &selectors.title)?;
    validate_selector("paragraph", &selectors.paragraph)?;

    Ok(())
}

fn validate_selector(field: &str, selector: &FieldSelector) -> ConfigResult<()> {
    Selector::parse(&selector.css).map_err(|e| ConfigError::InvalidSelector {
        field: field.to_string(),
        message: format!("'{}': {:?}", selector.css, e),
    })?;

    if matches!(selector.attr.as_deref(), Some(attr) if attr.trim().is_empty()) {
        return Err(ConfigError::InvalidSelector {
            field: field.to_string(),
            message: "attr cannot be empty".to_string(),
        });
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_min_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_min_ms ({}) must not exceed backoff_max_ms ({})",
            config.backoff_min_ms, config.backoff_max_ms
        )));
    }

    if config.page_delay_min_ms > config.page_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "page_delay_min_ms ({}) must not exceed page_delay_max_ms ({})",
            config.page_delay_min_ms, config.page_delay_max_ms
        )));
    }

    if config.articles_per_batch < 1 {
        return Err(ConfigError::Validation(format!(
            "articles_per_batch must be >= 1, got {}",
            config.articles_per_batch
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    if !config.contact_email.contains('@') {
        return Err(ConfigError::Validation(format!(
            "contact_email '{}' is not an email address",
            config.contact_email
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> ConfigResult<()> {
    if config.bucket.trim().is_empty() {
        return Err(ConfigError::Validation("bucket cannot be empty".to_string()));
    }

    if config.bucket.contains(|c: char| c == '/' || c == '\\') || config.bucket.contains("..") {
        return Err(ConfigError::Validation(format!(
            "bucket must be a single path segment, got '{}'",
            config.bucket
        )));
    }

    if config.key_prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "key_prefix cannot be empty".to_string(),
        ));
    }

    // Batch keys are `{key_prefix}/{page}.json`; the prefix must yield a valid key
    validate_key(&format!("{}/0000000.json", config.key_prefix)).map_err(|_| {
        ConfigError::Validation(format!(
            "key_prefix must be relative path segments without '..' or empty parts, got '{}'",
            config.key_prefix
        ))
    })?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.output_path.is_empty() {
        return Err(ConfigError::Validation(
            "output_path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.log_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "log_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
