//! Error types for document parsing.

use thiserror::Error;

/// Errors that can occur while parsing markup or querying it.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document body is not valid UTF-8.
    #[error("document is not valid UTF-8: {source}")]
    Encoding {
        /// The underlying decoding error.
        #[source]
        source: std::str::Utf8Error,
    },

    /// A CSS selector could not be parsed.
    #[error("invalid CSS selector '{selector}': {message}")]
    InvalidSelector {
        /// The selector text as supplied.
        selector: String,
        /// Parser diagnostic.
        message: String,
    },
}

impl ParseError {
    /// Creates an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }
}
