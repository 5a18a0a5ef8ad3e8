//! One complete run: destination → listing → worker pool.
//!
//! Errors before the pool starts are fatal and returned as [`SetupError`].
//! A pool failure is not: it is carried in the [`RunReport`] so the caller
//! can apply its [`FailurePolicy`](crate::config::FailurePolicy).

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::config::{ConfigError, FailurePolicy, RunConfig};
use crate::fetch::{FetchError, Fetcher};
use crate::pool::{DownloadPipeline, DownloadPool, DownloadStats, PoolError, RunContext};
use crate::resolve::{DetailResolver, ResolveError, fetch_listing};
use crate::storage::{StorageError, StorageSink};

/// Errors that stop a run before any item is processed.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The run configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] FetchError),

    /// The destination directory could not be prepared.
    #[error("failed to prepare destination: {0}")]
    Storage(#[from] StorageError),

    /// The listing page could not be fetched or parsed.
    #[error("failed to read listing {url}: {source}")]
    Listing {
        /// The listing page URL.
        url: String,
        /// The underlying resolution error.
        #[source]
        source: ResolveError,
    },
}

impl SetupError {
    /// HTTP status of a rejected listing response, if that is what failed.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Listing { source, .. } => source.status_code(),
            _ => None,
        }
    }
}

/// Summary of a run that got past setup.
#[derive(Debug)]
pub struct RunReport {
    /// Number of item links taken from the listing.
    pub links: usize,
    /// Pool counters, kept even when the pool stopped on an error.
    pub stats: DownloadStats,
    /// The pool's first error, if it failed.
    pub pipeline_error: Option<PoolError>,
}

impl RunReport {
    /// Whether the pool finished without an error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.pipeline_error.is_none()
    }

    /// Whether `policy` turns this report into a failed process exit.
    #[must_use]
    pub fn is_failure_under(&self, policy: FailurePolicy) -> bool {
        !self.succeeded() && policy == FailurePolicy::Fail
    }
}

/// Builds the run's single HTTP fetcher from its configuration.
///
/// # Errors
///
/// Returns [`SetupError::Client`] if the client cannot be built.
pub fn build_fetcher(config: &RunConfig) -> Result<Fetcher, SetupError> {
    Fetcher::with_request_timeout(config.request_timeout()).map_err(SetupError::Client)
}

/// Runs the whole pipeline for `config` with a freshly built fetcher.
///
/// # Errors
///
/// See [`run_with_fetcher`].
pub async fn run(config: &RunConfig, context: Arc<RunContext>) -> Result<RunReport, SetupError> {
    let fetcher = build_fetcher(config)?;
    run_with_fetcher(config, fetcher, context).await
}

/// Runs the whole pipeline for `config` using `fetcher` for every request.
///
/// The destination directory is created before any network request.
///
/// # Errors
///
/// Returns [`SetupError::Storage`] if the destination cannot be created and
/// [`SetupError::Listing`] if the listing page cannot be fetched or parsed
/// (including any non-200 status).
#[instrument(skip_all, fields(query = config.query(), limit = config.limit()))]
pub async fn run_with_fetcher(
    config: &RunConfig,
    fetcher: Fetcher,
    context: Arc<RunContext>,
) -> Result<RunReport, SetupError> {
    let sink = Arc::new(StorageSink::new(config.destination()));
    sink.ensure_directory().await?;

    let listing_url = config.listing_url().as_str();
    let links = fetch_listing(&fetcher, listing_url, config.listing_rule(), config.limit())
        .await
        .map_err(|source| SetupError::Listing {
            url: listing_url.to_string(),
            source,
        })?;

    let link_count = links.len();
    if link_count == 0 {
        info!("listing has no items");
        return Ok(RunReport {
            links: 0,
            stats: DownloadStats::new(),
            pipeline_error: None,
        });
    }

    let pool = DownloadPool::new(config.workers()).map_err(|_| {
        ConfigError::InvalidWorkerCount {
            value: config.workers(),
        }
    })?;
    let pipeline = DownloadPipeline::new(
        config.listing_url().clone(),
        DetailResolver::new(fetcher.clone(), config.detail_rule().clone()),
        fetcher,
        Arc::clone(&sink),
        config.naming(),
    );

    let (stats, pipeline_error) = pool
        .run_to_completion(links, Arc::new(pipeline), context)
        .await;
    Ok(RunReport {
        links: link_count,
        stats,
        pipeline_error,
    })
}
