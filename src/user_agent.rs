//! User-Agent string shared by every request the fetcher issues.
//!
//! Listing, detail and download requests all go through one client, so the
//! catalog site sees a single consistent identity.

/// Default User-Agent for all requests (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("photoscrape/{version} (image-collector)")
}
