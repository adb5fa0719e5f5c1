//! CSS-selector extractor backed by `scraper`

use crate::config::{FieldSelector, SelectorConfig};
use crate::extract::{Document, Extractor, Field};
use crate::{ConfigError, ConfigResult};
use scraper::{ElementRef, Selector};

/// A parsed selector plus the attribute to read
#[derive(Debug, Clone)]
struct CompiledSelector {
    selector: Selector,
    attr: Option<String>,
}

impl CompiledSelector {
    fn compile(field: Field, config: &FieldSelector) -> ConfigResult<Self> {
        let selector = Selector::parse(&config.css).map_err(|e| ConfigError::InvalidSelector {
            field: field.as_str().to_string(),
            message: format!("'{}': {:?}", config.css, e),
        })?;

        Ok(Self {
            selector,
            attr: config.attr.clone(),
        })
    }

    /// Value of one matched element; blank values count as absent
    fn value_of(&self, element: ElementRef<'_>) -> Option<String> {
        let raw = match &self.attr {
            Some(attr) => element.value().attr(attr)?.trim().to_string(),
            None => element.text().collect::<String>().trim().to_string(),
        };

        if raw.is_empty() {
            None
        } else {
            Some(raw)
        }
    }
}

/// Extracts fields from HTML documents with configurable CSS selectors
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    article_link: CompiledSelector,
    load_more: CompiledSelector,
    published_date: CompiledSelector,
    title: CompiledSelector,
    paragraph: CompiledSelector,
}

impl HtmlExtractor {
    /// Compiles every selector in the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlExtractor)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - A selector did not parse
    pub fn from_config(config: &SelectorConfig) -> ConfigResult<Self> {
        Ok(Self {
            article_link: CompiledSelector::compile(Field::ArticleLink, &config.article_link)?,
            load_more: CompiledSelector::compile(Field::LoadMore, &config.load_more)?,
            published_date: CompiledSelector::compile(
                Field::PublishedDate,
                &config.published_date,
            )?,
            title: CompiledSelector::compile(Field::Title, &config.title)?,
            paragraph: CompiledSelector::compile(Field::Paragraph, &config.paragraph)?,
        })
    }

    fn selector_for(&self, field: Field) -> &CompiledSelector {
        match field {
            Field::ArticleLink => &self.article_link,
            Field::LoadMore => &self.load_more,
            Field::PublishedDate => &self.published_date,
            Field::Title => &self.title,
            Field::Paragraph => &self.paragraph,
        }
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, document: &Document, field: Field) -> Option<String> {
        let compiled = self.selector_for(field);
        document
            .select(&compiled.selector)
            .find_map(|element| compiled.value_of(element))
    }

    fn extract_all(&self, document: &Document, field: Field) -> Vec<String> {
        let compiled = self.selector_for(field);
        document
            .select(&compiled.selector)
            .filter_map(|element| compiled.value_of(element))
            .collect()
    }
}
