//! Photoscrape Core Library
//!
//! This library provides the core functionality for the photoscrape tool,
//! which searches a photo catalog, follows each result to its detail page,
//! and stores the images it links to.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - HTTP GET with strict `200 OK` validation
//! - [`parse`] - HTML parsing and CSS-selector attribute extraction
//! - [`resolve`] - Listing page → item links, detail page → direct URL
//! - [`pool`] - Bounded worker pool with first-error cancellation
//! - [`storage`] - Destination directory and serialized file writes
//! - [`config`] - Validated run configuration
//! - [`app`] - One complete run, separating setup from pipeline failures

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod fetch;
pub mod parse;
pub mod pool;
pub mod resolve;
pub mod storage;
mod user_agent;

// Re-export commonly used types
pub use app::{RunReport, SetupError, build_fetcher, run, run_with_fetcher};
pub use config::{ConfigError, FailurePolicy, RunConfig, RunConfigBuilder};
pub use fetch::{FetchError, FetchedBody, Fetcher};
pub use parse::{Document, ExtractRule, ParseError};
pub use pool::{
    DEFAULT_WORKERS, DownloadPipeline, DownloadPool, DownloadStats, ItemOutcome, ItemProcessor,
    PoolError, RunContext, WorkItem,
};
pub use resolve::{DetailResolver, ItemLink, ResolveError, fetch_listing, resolve_listing};
pub use storage::{FilenamePolicy, StorageError, StorageSink, StoredFile};
