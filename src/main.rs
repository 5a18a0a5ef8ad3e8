//! CLI entry point for the photoscrape tool.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use photoscrape_core::{RunContext, run};
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    match run_cli(&args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &Args) {
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one scrape; `Err` means setup failed before any item was processed.
async fn run_cli(args: &Args) -> Result<ExitCode> {
    let config = args.to_run_config().context("invalid configuration")?;

    info!(
        query = config.query(),
        limit = config.limit(),
        workers = config.workers(),
        destination = %config.destination().display(),
        "photoscrape starting"
    );

    let context = Arc::new(RunContext::new());
    let interrupt = Arc::clone(&context);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight downloads");
            interrupt.cancel();
        }
    });

    let report = run(&config, context).await.context("run failed")?;

    let stats = &report.stats;
    info!(
        links = report.links,
        stored = stats.completed(),
        skipped = stats.skipped(),
        failed = stats.failed(),
        not_started = stats.not_started(),
        interrupted = stats.was_cancelled(),
        "photoscrape finished"
    );

    if let Some(e) = &report.pipeline_error {
        info!(error = %e, "download pipeline stopped early");
    }

    if report.is_failure_under(config.failure_policy()) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
