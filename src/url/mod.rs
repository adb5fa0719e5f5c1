//! URL handling for the harvester
//!
//! Builds listing page addresses from the cursor, resolves the relative links
//! found on listing pages, and normalizes article URLs for de-duplication.

mod normalize;

use crate::state::PageCursor;
use url::Url;

pub use normalize::normalize_article_url;

/// Builds the address of listing page `cursor`
///
/// The listing is paginated with a zero-based `page` query parameter:
/// the result is always `{root}?page={cursor}`.
///
/// # Examples
///
/// ```
/// use article_harvester::url::listing_url;
///
/// assert_eq!(
///     listing_url("https://example.com/news", 3),
///     "https://example.com/news?page=3"
/// );
/// ```
pub fn listing_url(root: &str, cursor: PageCursor) -> String {
    format!("{}?page={}", root, cursor)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
