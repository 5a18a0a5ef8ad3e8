//! Two-stage link resolution: listing page → item links → direct URLs.
//!
//! - [`fetch_listing`] turns the search-results page into an ordered,
//!   length-bounded list of [`ItemLink`]s
//! - [`DetailResolver`] turns one item's detail page into the address of the
//!   image itself
//!
//! Both stages share the same [`Fetcher`](crate::fetch::Fetcher) and report
//! failures as [`ResolveError`].

mod detail;
mod error;
mod listing;

use std::fmt;

use url::Url;

pub use detail::{DETAIL_ATTRIBUTE, DETAIL_SELECTOR, DetailResolver};
pub use error::ResolveError;
pub use listing::{
    LISTING_ATTRIBUTE, LISTING_SELECTOR, build_listing_url, fetch_listing, resolve_listing,
};

/// Raw link to one catalog item's detail page, exactly as found on the listing.
///
/// The value may be relative or empty; use [`ItemLink::to_absolute`] before
/// requesting it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemLink(String);

impl ItemLink {
    /// Wraps a raw attribute value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the listing node carried no address.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Resolves the link against the listing page's URL.
    ///
    /// Returns `None` for empty links and links that cannot be joined.
    #[must_use]
    pub fn to_absolute(&self, base: &Url) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        absolutize_url(self.0.trim(), base)
    }
}

impl fmt::Display for ItemLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves a possibly relative URL string against a base URL.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// otherwise joins with `base`, so `//host/...` inherits the base's scheme.
#[must_use]
pub fn absolutize_url(value: &str, base: &Url) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    base.join(value).ok().map(|url| url.to_string())
}
