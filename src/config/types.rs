use serde::Deserialize;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    pub output: OutputConfig,
}

/// The listing being harvested and how to read its pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Listing root; page N lives at `{root-url}?page={N}`
    pub root_url: String,

    pub selectors: SelectorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_url: "https://www.voashona.com/nhau-dzezimbabwe".to_string(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// A CSS selector plus the attribute to read from the matched element.
///
/// When `attr` is absent the element's trimmed text is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSelector {
    pub css: String,
    #[serde(default)]
    pub attr: Option<String>,
}

impl FieldSelector {
    pub fn text(css: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: None,
        }
    }

    pub fn attr(css: &str, attr: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: Some(attr.to_string()),
        }
    }
}

/// Selectors for every field the harvester extracts
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    /// Article links on a listing page
    pub article_link: FieldSelector,

    /// The "load more" pagination affordance on a listing page
    pub load_more: FieldSelector,

    /// Article publication date
    pub published_date: FieldSelector,

    /// Article headline
    pub title: FieldSelector,

    /// Article body paragraphs
    pub paragraph: FieldSelector,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            article_link: FieldSelector::attr("div.media-block a[href]", "href"),
            load_more: FieldSelector::attr("p.btn--load-more a.link-showMore[href]", "href"),
            published_date: FieldSelector::attr(
                "div.published span.date time[datetime]",
                "datetime",
            ),
            title: FieldSelector::text("h1.title, h1.pg-title"),
            paragraph: FieldSelector::text("div.wsw p"),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Attempts per fetch, including the first one
    pub max_attempts: u32,

    /// Backoff is `multiplier * 2^attempt`, clamped to [min, max] (milliseconds)
    pub backoff_multiplier_ms: u64,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,

    /// Randomized pause between listing pages (milliseconds)
    pub page_delay_min_ms: u64,
    pub page_delay_max_ms: u64,

    /// Records per stored batch
    pub articles_per_batch: usize,

    /// Stop after this many listing pages
    pub max_pages: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_multiplier_ms: 1_000,
            backoff_min_ms: 4_000,
            backoff_max_ms: 10_000,
            page_delay_min_ms: 2_000,
            page_delay_max_ms: 3_000,
            articles_per_batch: 10,
            max_pages: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    pub crawler_name: String,
    pub crawler_version: String,
    pub contact_url: String,
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ArticleHarvester".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

/// Which object store backs batch writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    Sqlite,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filesystem" => Some(Self::Filesystem),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Durable storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Container batches are written into
    pub bucket: String,

    /// Region label of the container, recorded in logs
    pub region: String,

    /// Key prefix for batch objects
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Filesystem,
            bucket: "articles".to_string(),
            region: "local".to_string(),
            key_prefix: "DATA".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory (filesystem backend) or database file (sqlite backend)
    pub output_path: String,

    /// Where the crawl checkpoint is kept
    pub checkpoint_path: String,

    /// Log file; logs go to stderr when unset
    pub log_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            checkpoint_path: "./checkpoint.json".to_string(),
            log_path: None,
        }
    }
}
