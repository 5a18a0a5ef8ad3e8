//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use photoscrape_core::config::{DEFAULT_BASE_URL, DEFAULT_QUERY, DEFAULT_UPLOAD_ROOT};
use photoscrape_core::fetch::MAX_REQUEST_TIMEOUT_SECS;
use photoscrape_core::{ConfigError, DEFAULT_WORKERS, FailurePolicy, FilenamePolicy, RunConfig};

/// Search a photo catalog and download the matching images.
///
/// Results for QUERY are stored as numbered .jpg files under
/// <UPLOAD_ROOT>/<QUERY>/.
#[derive(Parser, Debug)]
#[command(name = "photoscrape")]
#[command(author, version, about)]
pub struct Args {
    /// Search term
    #[arg(short = 'q', long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Maximum number of images to download (at least 1)
    #[arg(short = 'l', long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: u64,

    /// Concurrent download workers (1-16)
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub workers: u8,

    /// Directory under which the per-query folder is created
    #[arg(long, default_value = DEFAULT_UPLOAD_ROOT)]
    pub upload_root: PathBuf,

    /// Catalog site origin
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// File naming: 'sequential' (1.jpg, 2.jpg, ...) or 'basename' (from the image URL)
    #[arg(long, default_value_t = FilenamePolicy::Sequential)]
    pub naming: FilenamePolicy,

    /// Exit with status 1 when any download fails
    #[arg(long)]
    pub strict: bool,

    /// Deadline for each HTTP request in seconds (disabled by default)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=MAX_REQUEST_TIMEOUT_SECS))]
    pub request_timeout: Option<u64>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long)]
    pub quiet: bool,
}

impl Args {
    /// Default log filter directive from `--quiet` / `-v`.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Converts the parsed flags into a validated run configuration.
    pub fn to_run_config(&self) -> Result<RunConfig, ConfigError> {
        let policy = if self.strict {
            FailurePolicy::Fail
        } else {
            FailurePolicy::LogOnly
        };
        RunConfig::builder(self.query.clone())
            .with_limit(usize::try_from(self.limit).unwrap_or(usize::MAX))
            .with_workers(usize::from(self.workers))
            .with_upload_root(self.upload_root.clone())
            .with_base_url(self.base_url.clone())
            .with_naming(self.naming)
            .with_failure_policy(policy)
            .with_request_timeout_secs(self.request_timeout)
            .build()
    }
}
