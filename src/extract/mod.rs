//! Field extraction from fetched documents
//!
//! The crawl engine never navigates HTML itself. It asks an [`Extractor`] for
//! named fields and gets back `Option`s, then decides per field whether a
//! missing value is fatal (article url, title, date) or tolerable (body
//! paragraphs).

mod article;
mod html;
mod listing;

pub use article::{clean_paragraph, parse_article, ExtractError};
pub use html::HtmlExtractor;
pub use listing::{parse_listing, ListingPage};

use std::fmt;

/// A parsed HTML document
pub type Document = scraper::Html;

/// The fields the harvester knows how to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Links from a listing page to its articles
    ArticleLink,

    /// The listing page's "load more" affordance
    LoadMore,

    /// When the article was published
    PublishedDate,

    /// Article headline
    Title,

    /// One paragraph of article body
    Paragraph,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArticleLink => "article-link",
            Self::LoadMore => "load-more",
            Self::PublishedDate => "published-date",
            Self::Title => "title",
            Self::Paragraph => "paragraph",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads named fields out of a document
///
/// Implementations must be shareable across the concurrent article fetches
/// of one page.
pub trait Extractor: Send + Sync {
    /// First non-blank value of `field`, if any
    fn extract(&self, document: &Document, field: Field) -> Option<String>;

    /// Every non-blank value of `field`, in document order
    fn extract_all(&self, document: &Document, field: Field) -> Vec<String>;
}
