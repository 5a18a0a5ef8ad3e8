//! Run configuration built once from command-line input.
//!
//! [`RunConfig`] is immutable after [`RunConfigBuilder::build`] validates it;
//! every component receives it (or pieces of it) by reference.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::fetch::MAX_REQUEST_TIMEOUT_SECS;
use crate::parse::{ExtractRule, ParseError};
use crate::pool::{DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS};
use crate::resolve::{
    DETAIL_ATTRIBUTE, DETAIL_SELECTOR, LISTING_ATTRIBUTE, LISTING_SELECTOR, build_listing_url,
};
use crate::storage::{FilenamePolicy, sanitize_filename};

/// Search term used when none is given.
pub const DEFAULT_QUERY: &str = "dog";

/// Maximum number of items fetched when no limit is given.
pub const DEFAULT_LIMIT: usize = 5;

/// Directory under which a per-query destination is created.
pub const DEFAULT_UPLOAD_ROOT: &str = "upload";

/// Catalog site origin.
pub const DEFAULT_BASE_URL: &str = "https://ru.freepik.com";

/// Errors raised while validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The search term is empty or whitespace.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The item limit is zero.
    #[error("limit must be at least 1")]
    ZeroLimit,

    /// The worker count is outside the supported range.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The rejected value.
        value: usize,
    },

    /// The catalog origin is not an absolute http(s) URL.
    #[error("invalid base URL '{value}': {reason}")]
    InvalidBaseUrl {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A request deadline of zero or above the supported maximum.
    #[error("request timeout must be between 1 and {MAX_REQUEST_TIMEOUT_SECS} seconds, got {secs}")]
    InvalidTimeout {
        /// The rejected value in seconds.
        secs: u64,
    },

    /// A listing or detail extraction rule has an invalid selector.
    #[error(transparent)]
    Selector(#[from] ParseError),
}

/// What a failed pipeline means for the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the error and finish normally.
    #[default]
    LogOnly,
    /// Log the error and report failure.
    Fail,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    query: String,
    limit: usize,
    destination: PathBuf,
    listing_url: Url,
    workers: usize,
    naming: FilenamePolicy,
    failure_policy: FailurePolicy,
    listing_rule: ExtractRule,
    detail_rule: ExtractRule,
    request_timeout: Option<Duration>,
}

impl RunConfig {
    /// Starts a builder for `query` with every other setting at its default.
    pub fn builder(query: impl Into<String>) -> RunConfigBuilder {
        RunConfigBuilder::new(query)
    }

    /// The search term.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Maximum number of items to fetch.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Directory that receives the stored files (`<upload root>/<query>`).
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Full search-results URL for the query.
    #[must_use]
    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    /// Worker pool size.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// How stored files are named.
    #[must_use]
    pub fn naming(&self) -> FilenamePolicy {
        self.naming
    }

    /// What a failed pipeline means for the exit status.
    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Rule extracting item links from the listing page.
    #[must_use]
    pub fn listing_rule(&self) -> &ExtractRule {
        &self.listing_rule
    }

    /// Rule extracting the direct download from a detail page.
    #[must_use]
    pub fn detail_rule(&self) -> &ExtractRule {
        &self.detail_rule
    }

    /// Optional deadline applied to every request.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    query: String,
    limit: usize,
    upload_root: PathBuf,
    base_url: String,
    workers: usize,
    naming: FilenamePolicy,
    failure_policy: FailurePolicy,
    listing_rule: (String, String),
    detail_rule: (String, String),
    request_timeout_secs: Option<u64>,
}

impl RunConfigBuilder {
    fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            upload_root: PathBuf::from(DEFAULT_UPLOAD_ROOT),
            base_url: DEFAULT_BASE_URL.to_string(),
            workers: DEFAULT_WORKERS,
            naming: FilenamePolicy::default(),
            failure_policy: FailurePolicy::default(),
            listing_rule: (LISTING_SELECTOR.to_string(), LISTING_ATTRIBUTE.to_string()),
            detail_rule: (DETAIL_SELECTOR.to_string(), DETAIL_ATTRIBUTE.to_string()),
            request_timeout_secs: None,
        }
    }

    /// Sets the maximum number of items.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the directory under which `<query>/` is created.
    #[must_use]
    pub fn with_upload_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.upload_root = root.into();
        self
    }

    /// Sets the catalog site origin.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the filename policy.
    #[must_use]
    pub fn with_naming(mut self, naming: FilenamePolicy) -> Self {
        self.naming = naming;
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Overrides the listing extraction rule.
    #[must_use]
    pub fn with_listing_rule(
        mut self,
        selector: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.listing_rule = (selector.into(), attribute.into());
        self
    }

    /// Overrides the detail extraction rule.
    #[must_use]
    pub fn with_detail_rule(
        mut self,
        selector: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.detail_rule = (selector.into(), attribute.into());
        self
    }

    /// Sets a per-request deadline in seconds; `None` disables it.
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Validates the settings and produces the run configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid setting.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        if self.query.trim().is_empty() {
            return Err(ConfigError::EmptyQuery);
        }
        if self.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(ConfigError::InvalidWorkerCount {
                value: self.workers,
            });
        }

        let request_timeout = match self.request_timeout_secs {
            None => None,
            Some(secs) if (1..=MAX_REQUEST_TIMEOUT_SECS).contains(&secs) => {
                Some(Duration::from_secs(secs))
            }
            Some(secs) => return Err(ConfigError::InvalidTimeout { secs }),
        };

        let base_url = parse_base_url(&self.base_url)?;
        let listing_url = build_listing_url(&base_url, &self.query);
        let destination = self.upload_root.join(sanitize_filename(self.query.trim()));

        let listing_rule = ExtractRule::new(self.listing_rule.0, self.listing_rule.1)?;
        let detail_rule = ExtractRule::new(self.detail_rule.0, self.detail_rule.1)?;

        Ok(RunConfig {
            query: self.query,
            limit: self.limit,
            destination,
            listing_url,
            workers: self.workers,
            naming: self.naming,
            failure_policy: self.failure_policy,
            listing_rule,
            detail_rule,
            request_timeout,
        })
    }
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}
