//! Fixed-size worker pool that drains resolved item links.
//!
//! # Concurrency Model
//!
//! - Every item is loaded into a closed queue before any worker starts
//! - Exactly `workers` Tokio tasks run; each checks the shared
//!   [`RunContext`], takes one item, and processes it to completion
//!   (resolve → fetch → store) before checking again
//! - The first per-item error is recorded in the context and cancels the run;
//!   workers already processing an item finish it, then stop
//! - Items without a detail link or without a direct download are skipped and
//!   do not count as failures
//!
//! There is no retry. Files written before a failure stay on disk.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use photoscrape_core::fetch::Fetcher;
//! use photoscrape_core::parse::ExtractRule;
//! use photoscrape_core::pool::{DownloadPipeline, DownloadPool};
//! use photoscrape_core::resolve::{DETAIL_ATTRIBUTE, DETAIL_SELECTOR, DetailResolver, ItemLink};
//! use photoscrape_core::storage::{FilenamePolicy, StorageSink};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new()?;
//! let rule = ExtractRule::new(DETAIL_SELECTOR, DETAIL_ATTRIBUTE)?;
//! let pipeline = DownloadPipeline::new(
//!     Url::parse("https://ru.freepik.com/search?query=dog")?,
//!     DetailResolver::new(fetcher.clone(), rule),
//!     fetcher,
//!     Arc::new(StorageSink::new("upload/dog")),
//!     FilenamePolicy::Sequential,
//! );
//! let pool = DownloadPool::new(2)?;
//! let stats = pool
//!     .run(vec![ItemLink::new("/item1"), ItemLink::new("/item2")], Arc::new(pipeline))
//!     .await?;
//! println!("stored {}", stats.completed());
//! # Ok(())
//! # }
//! ```

mod context;
mod pipeline;

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub use context::RunContext;
pub use pipeline::DownloadPipeline;

use crate::fetch::FetchError;
use crate::resolve::{ItemLink, ResolveError};
use crate::storage::{StorageError, StoredFile};

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 16;

/// Default worker count.
pub const DEFAULT_WORKERS: usize = 2;

/// Errors produced by the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The item's detail page could not be resolved.
    #[error("failed to resolve item {link}: {source}")]
    Resolve {
        /// The item link as found on the listing.
        link: String,
        /// The underlying resolution error.
        #[source]
        source: ResolveError,
    },

    /// The direct download could not be fetched.
    #[error("failed to download {url} for item {link}: {source}")]
    Fetch {
        /// The item link as found on the listing.
        link: String,
        /// The direct-download URL.
        url: String,
        /// The underlying fetch error.
        #[source]
        source: FetchError,
    },

    /// The downloaded bytes could not be stored.
    #[error("failed to store item {link}: {source}")]
    Storage {
        /// The item link as found on the listing.
        link: String,
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    WorkerPanicked(String),
}

impl PoolError {
    /// Creates a resolve error for `link`.
    pub fn resolve(link: &ItemLink, source: ResolveError) -> Self {
        Self::Resolve {
            link: link.to_string(),
            source,
        }
    }

    /// Creates a fetch error for `link`'s direct download at `url`.
    pub fn fetch(link: &ItemLink, url: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch {
            link: link.to_string(),
            url: url.into(),
            source,
        }
    }

    /// Creates a storage error for `link`.
    pub fn storage(link: &ItemLink, source: StorageError) -> Self {
        Self::Storage {
            link: link.to_string(),
            source,
        }
    }
}

/// One queued unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 1-based position of the link in the listing.
    pub position: usize,
    /// The item's detail page link.
    pub link: ItemLink,
}

/// Everything known about one item once its detail page has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Absolute detail page URL.
    pub source_detail_url: String,
    /// Direct-download URL; empty when the page offers none.
    pub resolved_direct_url: String,
    /// Name the file is stored under.
    pub assigned_filename: String,
}

/// Why an item produced no file without failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The listing node carried no usable detail link.
    NoDetailLink,
    /// The detail page has no download trigger.
    NoDirectUrl,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDetailLink => f.write_str("no detail link"),
            Self::NoDirectUrl => f.write_str("no direct download"),
        }
    }
}

/// Result of processing one item successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The image was written.
    Stored(StoredFile),
    /// Nothing to download for this item.
    Skipped(SkipReason),
}

/// The per-item step the pool runs: resolve, fetch, store.
///
/// Implementations must be safe to call from several workers at once.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    /// Processes one item to completion.
    async fn process(&self, item: &WorkItem) -> Result<ItemOutcome, PoolError>;
}

/// Counters for one pool run.
///
/// Uses atomic counters for thread-safe updates from concurrent workers.
#[derive(Debug, Default)]
pub struct DownloadStats {
    completed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    not_started: AtomicUsize,
    cancelled: AtomicBool,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Items whose image was stored.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Items skipped for lack of a link or download.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Items that failed (at most one per worker).
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Items left in the queue when the run stopped.
    #[must_use]
    pub fn not_started(&self) -> usize {
        self.not_started.load(Ordering::SeqCst)
    }

    /// Items that were taken by a worker.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.completed() + self.skipped() + self.failed()
    }

    /// Whether the run stopped before draining the queue.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Self {
        Self {
            completed: AtomicUsize::new(self.completed()),
            skipped: AtomicUsize::new(self.skipped()),
            failed: AtomicUsize::new(self.failed()),
            not_started: AtomicUsize::new(self.not_started()),
            cancelled: AtomicBool::new(self.was_cancelled()),
        }
    }
}

/// Closed queue of work items; nothing is added after construction.
#[derive(Debug)]
struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    fn new(links: Vec<ItemLink>) -> Self {
        let items = links
            .into_iter()
            .enumerate()
            .map(|(index, link)| WorkItem {
                position: index + 1,
                link,
            })
            .collect();
        Self {
            items: Mutex::new(items),
        }
    }

    fn pop(&self) -> Option<WorkItem> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn remaining(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Worker pool with first-error-wins cancellation.
#[derive(Debug, Clone, Copy)]
pub struct DownloadPool {
    workers: usize,
}

impl DownloadPool {
    /// Creates a pool with `workers` concurrent workers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidWorkerCount`] if the value is outside
    /// `MIN_WORKERS..=MAX_WORKERS`.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(PoolError::InvalidWorkerCount { value: workers });
        }
        Ok(Self { workers })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Processes every item with `processor`, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first [`PoolError`] any worker hit. Items completed before
    /// the failure remain stored.
    pub async fn run<P>(
        &self,
        items: Vec<ItemLink>,
        processor: Arc<P>,
    ) -> Result<DownloadStats, PoolError>
    where
        P: ItemProcessor + ?Sized + 'static,
    {
        self.run_with_context(items, processor, Arc::new(RunContext::new()))
            .await
    }

    /// Same as [`run`](Self::run), sharing a caller-owned [`RunContext`].
    ///
    /// Cancelling `context` from outside (for example on Ctrl+C) stops workers
    /// from taking new items; in that case the run ends without an error.
    ///
    /// # Errors
    ///
    /// Returns the first [`PoolError`] any worker hit.
    pub async fn run_with_context<P>(
        &self,
        items: Vec<ItemLink>,
        processor: Arc<P>,
        context: Arc<RunContext>,
    ) -> Result<DownloadStats, PoolError>
    where
        P: ItemProcessor + ?Sized + 'static,
    {
        match self.run_to_completion(items, processor, context).await {
            (_, Some(error)) => Err(error),
            (stats, None) => Ok(stats),
        }
    }

    /// Like [`run_with_context`](Self::run_with_context), but returns the
    /// counters together with the first error instead of dropping them.
    #[instrument(skip(self, items, processor, context), fields(items = items.len(), workers = self.workers))]
    pub async fn run_to_completion<P>(
        &self,
        items: Vec<ItemLink>,
        processor: Arc<P>,
        context: Arc<RunContext>,
    ) -> (DownloadStats, Option<PoolError>)
    where
        P: ItemProcessor + ?Sized + 'static,
    {
        let queue = Arc::new(WorkQueue::new(items));
        let stats = Arc::new(DownloadStats::new());

        info!("starting worker pool");

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            workers.spawn(run_worker(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&processor),
                Arc::clone(&context),
                Arc::clone(&stats),
            ));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "worker task panicked");
                context.fail(PoolError::WorkerPanicked(e.to_string()));
            }
        }

        stats.not_started.store(queue.remaining(), Ordering::SeqCst);
        stats
            .cancelled
            .store(context.is_cancelled(), Ordering::SeqCst);

        info!(
            completed = stats.completed(),
            skipped = stats.skipped(),
            failed = stats.failed(),
            not_started = stats.not_started(),
            cancelled = stats.was_cancelled(),
            "worker pool finished"
        );

        // All workers have been joined, so this is normally the only handle.
        let stats = Arc::try_unwrap(stats).unwrap_or_else(|shared| shared.snapshot());
        (stats, context.take_error())
    }
}

async fn run_worker<P>(
    worker_id: usize,
    queue: Arc<WorkQueue>,
    processor: Arc<P>,
    context: Arc<RunContext>,
    stats: Arc<DownloadStats>,
) where
    P: ItemProcessor + ?Sized,
{
    loop {
        if context.is_cancelled() {
            debug!(worker_id, "run cancelled, worker stopping");
            return;
        }

        let Some(item) = queue.pop() else {
            debug!(worker_id, "queue drained, worker stopping");
            return;
        };

        match processor.process(&item).await {
            Ok(ItemOutcome::Stored(file)) => {
                info!(
                    worker_id,
                    position = item.position,
                    path = %file.path.display(),
                    bytes = file.bytes,
                    "item stored"
                );
                stats.increment_completed();
            }
            Ok(ItemOutcome::Skipped(reason)) => {
                info!(
                    worker_id,
                    position = item.position,
                    link = %item.link,
                    %reason,
                    "item skipped"
                );
                stats.increment_skipped();
            }
            Err(e) => {
                warn!(
                    worker_id,
                    position = item.position,
                    link = %item.link,
                    error = %e,
                    "item failed, cancelling run"
                );
                stats.increment_failed();
                context.fail(e);
                return;
            }
        }
    }
}
