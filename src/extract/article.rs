//! Article page parsing

use crate::extract::{Document, Extractor, Field};
use crate::output::ArticleRecord;
use crate::state::PageCursor;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Errors that make an article page unusable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("{url}: missing mandatory field {field}")]
    MissingField { url: String, field: Field },
}

/// Builds an [`ArticleRecord`] from an article page body
///
/// Published date and title are mandatory; a page without either is
/// rejected. Body paragraphs are optional: the content is the cleaned
/// paragraphs joined with newlines, and may be empty.
///
/// # Arguments
///
/// * `extractor` - Field extractor
/// * `url` - Address the body was fetched from
/// * `page_index` - Listing page the article was found on
/// * `body` - Raw HTML
/// * `scraped_at` - When the body was fetched
pub fn parse_article(
    extractor: &dyn Extractor,
    url: &str,
    page_index: PageCursor,
    body: &str,
    scraped_at: DateTime<Utc>,
) -> Result<ArticleRecord, ExtractError> {
    let document = Document::parse_document(body);

    let missing = |field| ExtractError::MissingField {
        url: url.to_string(),
        field,
    };

    let article_date = extractor
        .extract(&document, Field::PublishedDate)
        .ok_or_else(|| missing(Field::PublishedDate))?;

    let article_title = extractor
        .extract(&document, Field::Title)
        .ok_or_else(|| missing(Field::Title))?;

    let paragraphs: Vec<String> = extractor
        .extract_all(&document, Field::Paragraph)
        .iter()
        .map(|p| clean_paragraph(p))
        .filter(|p| !p.is_empty())
        .collect();

    Ok(ArticleRecord::new(
        scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        url.to_string(),
        article_date,
        article_title,
        paragraphs.join("\n"),
        page_index,
    ))
}

/// Trims a paragraph and folds every run of two or more newlines into a space
pub fn clean_paragraph(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut newlines = 0;

    for c in raw.trim().chars() {
        if c == '\n' {
            newlines += 1;
            continue;
        }
        match newlines {
            0 => {}
            1 => cleaned.push('\n'),
            _ => cleaned.push(' '),
        }
        newlines = 0;
        cleaned.push(c);
    }

    cleaned
}
