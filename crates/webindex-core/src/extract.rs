//! HTML extraction: title, outbound links, and term counts.
//!
//! The document is parsed with `scraper` (html5ever), which follows the
//! HTML tokenization rules: a bare `<` in text stays text, unknown or
//! unclosed tags never abort the parse, and character references are
//! decoded. The resulting tree is walked in document order. Text nodes feed
//! the term table, every element carrying an `href` attribute adds a link,
//! and the text of a `<title>` element becomes the document title (cleaned,
//! case preserved, not counted as terms). When several titles appear, the
//! last one wins.

use std::collections::BTreeMap;

use scraper::Html;
use thiserror::Error;

use crate::normalize::{clean_text, tokenize};

/// Why a document could not be parsed at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("document content is empty")]
    Empty,
}

/// Everything the index needs from one HTML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    /// Cleaned `<title>` text, empty if the document has none.
    pub title: String,
    /// Every `href` value in order of appearance, duplicates kept.
    pub links: Vec<String>,
    /// Lowercase term → occurrence count.
    pub terms: BTreeMap<String, u64>,
    /// Sum of all counts in `terms`.
    pub total_tokens: u64,
}

impl ExtractedContent {
    fn add_text(&mut self, text: &str) {
        for term in tokenize(text) {
            *self.terms.entry(term).or_insert(0) += 1;
            self.total_tokens += 1;
        }
    }
}

/// Parse `bytes` as HTML and collect title, links, and terms.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn extract_content(bytes: &[u8]) -> Result<ExtractedContent, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }

    let source = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&source);
    let mut content = ExtractedContent::default();

    for node in document.root_element().descendants() {
        if let Some(element) = node.value().as_element() {
            if let Some(href) = element.attr("href") {
                content.links.push(href.to_string());
            }
        } else if let Some(text) = node.value().as_text() {
            let in_title = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|e| e.name() == "title"))
                .unwrap_or(false);
            if in_title {
                content.title = clean_text(text);
            } else {
                content.add_text(text);
            }
        }
    }

    tracing::trace!(
        links = content.links.len(),
        terms = content.terms.len(),
        total_tokens = content.total_tokens,
        "extracted"
    );
    Ok(content)
}
