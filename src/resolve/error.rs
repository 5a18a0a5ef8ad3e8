//! Error types for listing and detail resolution.

use thiserror::Error;

use crate::fetch::FetchError;
use crate::parse::ParseError;

/// Errors that can occur while resolving links from a catalog page.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The page could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The page was fetched but could not be parsed or queried.
    #[error("failed to parse {url}: {source}")]
    Parse {
        /// The page URL.
        url: String,
        /// The underlying parse error.
        #[source]
        source: ParseError,
    },
}

impl ResolveError {
    /// Creates a parse error for the given page.
    pub fn parse(url: impl Into<String>, source: ParseError) -> Self {
        Self::Parse {
            url: url.into(),
            source,
        }
    }

    /// Returns the HTTP status code if the page fetch was rejected by status.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Fetch(e) => e.status_code(),
            Self::Parse { .. } => None,
        }
    }
}
