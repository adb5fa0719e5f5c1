//! Listing page parsing

use crate::extract::{Document, Extractor, Field};
use crate::url::{normalize_article_url, resolve_link};
use std::collections::HashSet;
use url::Url;

/// What a listing page tells the walker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute, normalized, de-duplicated article URLs in page order
    pub article_urls: Vec<String>,

    /// Whether the page offers a "load more" affordance
    pub has_more: bool,
}

/// Parses a listing page body
///
/// Relative links are resolved against `base_url` (the listing page address).
/// Links that do not resolve to an http(s) URL are skipped.
///
/// # Example
///
/// ```
/// use article_harvester::config::SelectorConfig;
/// use article_harvester::extract::{parse_listing, HtmlExtractor};
/// use url::Url;
///
/// let extractor = HtmlExtractor::from_config(&SelectorConfig::default()).unwrap();
/// let html = r#"<div class="media-block"><a href="/a/1.html">One</a></div>"#;
/// let base = Url::parse("https://example.com/news?page=0").unwrap();
///
/// let listing = parse_listing(&extractor, html, &base);
/// assert_eq!(listing.article_urls, vec!["https://example.com/a/1.html"]);
/// assert!(!listing.has_more);
/// ```
pub fn parse_listing(extractor: &dyn Extractor, body: &str, base_url: &Url) -> ListingPage {
    let document = Document::parse_document(body);

    let mut seen = HashSet::new();
    let mut article_urls = Vec::new();

    for href in extractor.extract_all(&document, Field::ArticleLink) {
        let Some(absolute) = resolve_link(&href, base_url) else {
            tracing::debug!("Skipping unusable article link '{}'", href);
            continue;
        };

        match normalize_article_url(&absolute) {
            Ok(url) => {
                let url = url.to_string();
                if seen.insert(url.clone()) {
                    article_urls.push(url);
                }
            }
            Err(e) => tracing::debug!("Skipping article link {}: {}", absolute, e),
        }
    }

    let has_more = extractor.extract(&document, Field::LoadMore).is_some();

    ListingPage {
        article_urls,
        has_more,
    }
}
