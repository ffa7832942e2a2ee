//! CLI entry point for the house-downloader tool.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use house_downloader_core::download::constants::DEFAULT_BACKOFF_MULTIPLIER;
use house_downloader_core::{BatchConfig, BatchOrchestrator, HttpClient, RetryPolicy};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let start = Instant::now();

    let retry_policy = RetryPolicy::new(
        u32::from(args.max_attempts),
        Duration::from_millis(args.initial_backoff_ms),
        DEFAULT_BACKOFF_MULTIPLIER,
    );
    let config = BatchConfig::new(args.base_url, args.output_dir).with_retry_policy(retry_policy);
    let client = HttpClient::new().context("failed to build HTTP client")?;
    let orchestrator = BatchOrchestrator::new(client, config);

    // Fatal errors propagate out of main, which exits non-zero.
    let report = orchestrator.run(args.pages).await?;

    info!(
        pages = args.pages,
        pages_skipped = report.pages_skipped,
        downloads_completed = report.downloads_completed,
        downloads_skipped = report.downloads_skipped,
        "finished downloading all photos for the first {} pages",
        args.pages
    );
    info!(elapsed = ?start.elapsed(), "total execution time");

    Ok(())
}
