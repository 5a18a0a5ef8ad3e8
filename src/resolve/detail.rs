//! Detail page resolution: one item page in, one direct-download URL out.

use tracing::{debug, instrument};
use url::Url;

use super::{ResolveError, absolutize_url};
use crate::fetch::Fetcher;
use crate::parse::{Document, ExtractRule, ParseError};

/// Default selector for the download trigger on an item's detail page.
pub const DETAIL_SELECTOR: &str =
    "aside .detail__actions .detail__download .selection-download-wrapper button";

/// Attribute on the download trigger that holds the direct image address.
pub const DETAIL_ATTRIBUTE: &str = "data-href";

/// Resolves item detail pages to direct-download URLs.
#[derive(Debug, Clone)]
pub struct DetailResolver {
    fetcher: Fetcher,
    rule: ExtractRule,
}

impl DetailResolver {
    /// Creates a resolver that fetches with `fetcher` and extracts with `rule`.
    #[must_use]
    pub fn new(fetcher: Fetcher, rule: ExtractRule) -> Self {
        Self { fetcher, rule }
    }

    /// Fetches `detail_url` and returns the download trigger's address.
    ///
    /// An empty string means the page offers no direct download; that is not
    /// an error and the caller should skip the item. Relative addresses are
    /// resolved against `detail_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Fetch`] if the page cannot be fetched and
    /// [`ResolveError::Parse`] if it cannot be parsed.
    #[instrument(skip(self), fields(url = %detail_url))]
    pub async fn resolve_direct_url(&self, detail_url: &str) -> Result<String, ResolveError> {
        let body = self.fetcher.fetch(detail_url).await?.bytes().await?;

        let raw = extract_trigger(&body, &self.rule)
            .map_err(|source| ResolveError::parse(detail_url, source))?;
        let raw = raw.trim();
        if raw.is_empty() {
            debug!("detail page has no download trigger");
            return Ok(String::new());
        }

        let resolved = Url::parse(detail_url)
            .ok()
            .and_then(|base| absolutize_url(raw, &base))
            .unwrap_or_else(|| raw.to_string());
        debug!(direct_url = %resolved, "resolved direct download URL");
        Ok(resolved)
    }
}

fn extract_trigger(body: &[u8], rule: &ExtractRule) -> Result<String, ParseError> {
    Document::parse(body)?.first_attr(rule)
}
