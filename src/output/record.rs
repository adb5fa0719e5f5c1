use crate::state::PageCursor;
use serde::{Deserialize, Serialize};

/// One extracted article
///
/// Records are immutable: fields are only set by [`ArticleRecord::new`] and
/// read through accessors. The listing page index travels with the record for
/// checkpointing but is not part of the stored JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    scrape_date: String,
    article_url: String,
    article_date: String,
    article_title: String,
    article_content: String,
    #[serde(skip_serializing, default)]
    page_index: PageCursor,
}

impl ArticleRecord {
    pub fn new(
        scrape_date: String,
        article_url: String,
        article_date: String,
        article_title: String,
        article_content: String,
        page_index: PageCursor,
    ) -> Self {
        Self {
            scrape_date,
            article_url,
            article_date,
            article_title,
            article_content,
            page_index,
        }
    }

    pub fn scrape_date(&self) -> &str {
        &self.scrape_date
    }

    pub fn article_url(&self) -> &str {
        &self.article_url
    }

    pub fn article_date(&self) -> &str {
        &self.article_date
    }

    pub fn article_title(&self) -> &str {
        &self.article_title
    }

    pub fn article_content(&self) -> &str {
        &self.article_content
    }

    pub fn page_index(&self) -> PageCursor {
        self.page_index
    }

    /// Whitespace-separated tokens in the article content
    pub fn token_count(&self) -> u64 {
        self.article_content.split_whitespace().count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArticleRecord {
        ArticleRecord::new(
            "2024-03-02T08:30:00Z".to_string(),
            "https://example.com/a/1.html".to_string(),
            "2024-03-01T10:00:00+02:00".to_string(),
            "Musoro".to_string(),
            "Ndima imwe ine mazwi.\nNdima mbiri.".to_string(),
            7,
        )
    }

    #[test]
    fn test_token_count() {
        assert_eq!(record().token_count(), 6);
    }

    #[test]
    fn test_token_count_empty_content() {
        let empty = ArticleRecord::new(
            String::new(),
            "u".to_string(),
            "d".to_string(),
            "t".to_string(),
            String::new(),
            0,
        );
        assert_eq!(empty.token_count(), 0);
    }

    #[test]
    fn test_serialized_fields() {
        let value = serde_json::to_value(record()).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "article_content",
                "article_date",
                "article_title",
                "article_url",
                "scrape_date"
            ]
        );
        assert_eq!(object["article_title"], "Musoro");
    }
}
