//! HTML document parsing and attribute extraction.
//!
//! A [`Document`] wraps a parsed `scraper` tree and supports two extraction
//! modes driven by an [`ExtractRule`]:
//!
//! - [`Document::attr_values`]: every matching node's attribute, in document
//!   order, up to a limit
//! - [`Document::first_attr`]: the attribute of the first matching node only
//!
//! A node that matches the selector but lacks the attribute contributes an
//! empty string rather than being skipped.
//!
//! `scraper::Html` is not `Send`, so documents are built and queried inside
//! synchronous helpers and never held across an `.await`.

mod error;

use scraper::{Html, Selector};

pub use error::ParseError;

/// A CSS selector paired with the attribute to read from matching nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRule {
    selector: String,
    attribute: String,
}

impl ExtractRule {
    /// Creates a rule, validating the selector up front.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidSelector`] if `selector` is not valid CSS.
    pub fn new(
        selector: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let rule = Self {
            selector: selector.into(),
            attribute: attribute.into(),
        };
        rule.compile()?;
        Ok(rule)
    }

    /// The CSS selector text.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The attribute read from each matching node.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    fn compile(&self) -> Result<Selector, ParseError> {
        Selector::parse(&self.selector)
            .map_err(|e| ParseError::invalid_selector(&self.selector, e.to_string()))
    }
}

/// A parsed, queryable HTML document.
#[derive(Debug)]
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a markup byte buffer.
    ///
    /// Tree construction is lenient (html5ever recovers from unbalanced or
    /// unknown tags); only undecodable input is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Encoding`] if `bytes` is not valid UTF-8.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|source| ParseError::Encoding { source })?;
        Ok(Self {
            html: Html::parse_document(text),
        })
    }

    /// Collects the rule's attribute from matching nodes, in document order,
    /// stopping after `limit` values.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidSelector`] if the rule's selector is invalid.
    pub fn attr_values(&self, rule: &ExtractRule, limit: usize) -> Result<Vec<String>, ParseError> {
        let selector = rule.compile()?;
        Ok(self
            .html
            .select(&selector)
            .take(limit)
            .map(|node| node.value().attr(rule.attribute()).unwrap_or_default().to_string())
            .collect())
    }

    /// Returns the rule's attribute from the first matching node.
    ///
    /// Yields an empty string when nothing matches or the first match has no
    /// such attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidSelector`] if the rule's selector is invalid.
    pub fn first_attr(&self, rule: &ExtractRule) -> Result<String, ParseError> {
        let selector = rule.compile()?;
        Ok(self
            .html
            .select(&selector)
            .next()
            .and_then(|node| node.value().attr(rule.attribute()))
            .unwrap_or_default()
            .to_string())
    }
}
