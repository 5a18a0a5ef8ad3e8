//! HTTP fetching for catalog pages and image downloads.
//!
//! This module provides the [`Fetcher`], a thin wrapper around a reqwest
//! client that classifies every failure:
//!
//! - Any status other than `200 OK` becomes [`FetchError::Status`]
//! - Connection-level failures become [`FetchError::Transport`]
//! - An elapsed optional deadline becomes [`FetchError::Timeout`]
//!
//! Successful responses are returned as a [`FetchedBody`], which can be
//! buffered (for HTML parsing) or streamed (for writing images to disk).
//!
//! There is no retry logic here. A failed request is reported to the caller
//! exactly once.

mod client;
mod constants;
mod error;

pub use client::{ByteStream, FetchedBody, Fetcher};
pub use constants::{CONNECT_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS};
pub use error::FetchError;
