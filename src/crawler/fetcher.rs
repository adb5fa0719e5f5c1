//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests for listing and article pages
//! - Error classification into retryable and terminal failures

use crate::config::UserAgentConfig;
use crate::crawler::retry::Retryable;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Why a page could not be fetched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl FetchError {
    /// Classifies a reqwest error raised while sending or reading
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        let url = url.to_string();

        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_connect() {
            Self::Connect {
                url,
                message: error.to_string(),
            }
        } else if error.is_body() || error.is_decode() {
            Self::Body {
                url,
                message: error.to_string(),
            }
        } else {
            Self::Request {
                url,
                message: error.to_string(),
            }
        }
    }

    /// True for failures a later attempt may not hit
    ///
    /// | Condition | Retry |
    /// |-----------|-------|
    /// | Timeout, connection failure, body read error | yes |
    /// | HTTP 5xx, 408, 429 | yes |
    /// | Any other HTTP status | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect { .. } | Self::Body { .. } => true,
            Self::Request { .. } => true,
            Self::Status { status, .. } => {
                *status >= 500
                    || *status == StatusCode::REQUEST_TIMEOUT.as_u16()
                    || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Status { url, .. }
            | Self::Body { url, .. }
            | Self::Request { url, .. } => url,
        }
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// Fetches page bodies
///
/// Shared by every concurrent article fetch of a page, so implementations
/// must be safe for concurrent use.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the body of a successful (2xx) response
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// [`Fetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from the user agent configuration
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use article_harvester::config::UserAgentConfig;
/// use article_harvester::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "ArticleHarvester".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}
