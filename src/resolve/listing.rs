//! Search-results page resolution.

use tracing::{debug, info, instrument};
use url::Url;

use super::{ItemLink, ResolveError};
use crate::fetch::Fetcher;
use crate::parse::{Document, ExtractRule, ParseError};

/// Default selector for item anchors on the search-results page.
pub const LISTING_SELECTOR: &str = ".list-content .showcase .showcase__item .showcase__content a";

/// Attribute holding the item's detail page address.
pub const LISTING_ATTRIBUTE: &str = "href";

/// Builds the search-results URL for `query` on the catalog at `base_url`.
///
/// The query is percent-encoded; the format and type parameters restrict the
/// results to photos.
#[must_use]
pub fn build_listing_url(base_url: &Url, query: &str) -> Url {
    let mut url = base_url.clone();
    url.set_path("/search");
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("format", "search")
        .append_pair("query", query)
        .append_pair("type", "photo");
    url
}

/// Collects up to `limit` item links from an already-parsed listing document.
///
/// Links keep page order. Duplicates are kept, and a matching node without
/// the attribute yields an empty link.
///
/// # Errors
///
/// Returns [`ParseError::InvalidSelector`] if the rule's selector is invalid.
pub fn resolve_listing(
    document: &Document,
    rule: &ExtractRule,
    limit: usize,
) -> Result<Vec<ItemLink>, ParseError> {
    Ok(document
        .attr_values(rule, limit)?
        .into_iter()
        .map(ItemLink::new)
        .collect())
}

/// Fetches the listing page at `listing_url` and resolves its item links.
///
/// # Errors
///
/// Returns [`ResolveError::Fetch`] if the page cannot be fetched (including
/// any non-200 status) and [`ResolveError::Parse`] if it cannot be parsed.
#[instrument(skip(fetcher, rule), fields(selector = rule.selector()))]
pub async fn fetch_listing(
    fetcher: &Fetcher,
    listing_url: &str,
    rule: &ExtractRule,
    limit: usize,
) -> Result<Vec<ItemLink>, ResolveError> {
    let body = fetcher.fetch(listing_url).await?.bytes().await?;
    debug!(bytes = body.len(), "listing page fetched");

    let links = parse_listing(&body, rule, limit)
        .map_err(|source| ResolveError::parse(listing_url, source))?;

    let empty = links.iter().filter(|link| link.is_empty()).count();
    info!(count = links.len(), empty, limit, "resolved listing");
    Ok(links)
}

fn parse_listing(body: &[u8], rule: &ExtractRule, limit: usize) -> Result<Vec<ItemLink>, ParseError> {
    let document = Document::parse(body)?;
    resolve_listing(&document, rule, limit)
}
