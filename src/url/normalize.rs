use crate::{UrlError, UrlResult};
use url::{form_urlencoded, Url};

/// Query parameters that only identify where a click came from
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes an article URL so the same article linked twice is fetched once
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme and a host
/// 3. Remove the fragment
/// 4. Remove tracking query parameters, keeping the rest in order
/// 5. Remove an empty query string
///
/// Host and path are left as the site wrote them, since the result is fetched.
///
/// # Examples
///
/// ```
/// use article_harvester::url::normalize_article_url;
///
/// let url = normalize_article_url("https://example.com/a/1.html?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/a/1.html");
/// ```
pub fn normalize_article_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    // Kept segments are copied byte for byte; re-encoding would change the fetched URL
    if let Some(query) = url.query().map(str::to_owned) {
        if query.is_empty() {
            url.set_query(None);
        } else if query.split('&').any(is_tracking_segment) {
            let kept = query
                .split('&')
                .filter(|segment| !segment.is_empty() && !is_tracking_segment(segment))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(if kept.is_empty() { None } else { Some(&kept) });
        }
    }

    Ok(url)
}

/// Checks a raw `key=value` query segment against the tracking list by its decoded key
fn is_tracking_segment(segment: &str) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map_or(false, |(key, _)| is_tracking_param(&key))
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = normalize_article_url("https://example.com/a/1.html#comments").unwrap();
        assert_eq!(result.as_str(), "https://example.com/a/1.html");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result =
            normalize_article_url("https://example.com/a?utm_medium=x&fbclid=y").unwrap();
        assert_eq!(result.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_keep_meaningful_params_in_order() {
        let result =
            normalize_article_url("https://example.com/a?z=1&utm_source=n&id=7").unwrap();
        assert_eq!(result.as_str(), "https://example.com/a?z=1&id=7");
    }

    #[test]
    fn test_untracked_query_left_as_written() {
        for url in [
            "https://example.com/a?q=a%20b",
            "https://example.com/a?flag",
            "https://example.com/a?p=x~y&s=a:b",
        ] {
            assert_eq!(normalize_article_url(url).unwrap().as_str(), url);
        }
    }

    #[test]
    fn test_kept_segments_not_reencoded() {
        let result =
            normalize_article_url("https://example.com/a?q=a%20b&utm_campaign=z&flag").unwrap();
        assert_eq!(result.as_str(), "https://example.com/a?q=a%20b&flag");
    }

    #[test]
    fn test_encoded_tracking_key_removed() {
        let result = normalize_article_url("https://example.com/a?id=3&utm%5Fsource=x").unwrap();
        assert_eq!(result.as_str(), "https://example.com/a?id=3");
    }

    #[test]
    fn test_empty_query_removed() {
        let result = normalize_article_url("https://example.com/a?").unwrap();
        assert_eq!(result.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_host_is_lowercased_path_kept() {
        let result = normalize_article_url("https://Example.COM/News/Story/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/News/Story/");
    }

    #[test]
    fn test_surrounding_whitespace() {
        let result = normalize_article_url("  https://example.com/a  ").unwrap();
        assert_eq!(result.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            normalize_article_url("mailto:desk@example.com"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            normalize_article_url("not a url"),
            Err(UrlError::Parse(_))
        ));
    }
}
