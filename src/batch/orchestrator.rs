//! Two-level fan-out of page fetches and photo downloads.
//!
//! The orchestrator spawns one task per listing page. Each page task fetches
//! its page and then spawns one task per record to download that record's
//! photo. Both levels register with the same [`TaskTracker`], so waiting on
//! the tracker only returns once every page task *and* every photo task
//! spawned from them has finished.
//!
//! # Failure containment
//!
//! - A page or photo that exhausts its retries is skipped; siblings continue.
//! - A fatal error (undecodable page, unwritable destination) cancels every
//!   outstanding task and is returned from [`BatchOrchestrator::run`] at once.
//!
//! # Example
//!
//! ```no_run
//! use house_downloader_core::batch::{BatchConfig, BatchOrchestrator};
//! use house_downloader_core::download::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = BatchOrchestrator::new(HttpClient::new()?, BatchConfig::default());
//! let report = orchestrator.run(10).await?;
//! println!("{} photos downloaded", report.downloads_completed);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument};
use url::Url;

use super::stats::{BatchReport, BatchStats};
use crate::download::constants::{DEFAULT_BASE_URL, DEFAULT_OUTPUT_DIR};
use crate::download::{
    DownloadError, DownloadOutcome, HttpClient, ImageDownloader, ImageTask, RetryPolicy,
};
use crate::listing::{ListingError, PageFetcher, PageOutcome};

/// Errors that end a batch run.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A listing page could not be decoded.
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// A photo could not be written to disk.
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Settings for a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Listing endpoint; `page=<n>` is appended per page.
    pub base_url: Url,
    /// Directory photos are written to.
    pub output_dir: PathBuf,
    /// Retry policy for both page fetches and photo downloads.
    pub retry_policy: RetryPolicy,
}

impl BatchConfig {
    /// Creates a config with the default retry policy.
    #[must_use]
    pub fn new(base_url: Url, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url,
            output_dir: output_dir.into(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

impl Default for BatchConfig {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("default listing URL is valid");
        Self::new(base_url, DEFAULT_OUTPUT_DIR)
    }
}

/// Runs the page-fetch and photo-download fan-out.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    fetcher: PageFetcher,
    downloader: ImageDownloader,
    output_dir: PathBuf,
}

impl BatchOrchestrator {
    /// Creates an orchestrator whose page fetches and downloads share `client`.
    #[must_use]
    pub fn new(client: HttpClient, config: BatchConfig) -> Self {
        let fetcher = PageFetcher::new(
            client.clone(),
            config.base_url,
            config.retry_policy.clone(),
        );
        let downloader = ImageDownloader::new(client, config.retry_policy);
        Self {
            fetcher,
            downloader,
            output_dir: config.output_dir,
        }
    }

    /// Fetches pages `1..=page_count` and downloads every photo they list.
    ///
    /// Returns once every page task and every photo task spawned from them
    /// has finished. Skipped pages and photos do not fail the run.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::OutputDir`] if the output directory cannot be
    /// created, and the first fatal error raised by any task otherwise. On a
    /// fatal error outstanding tasks are cancelled and not waited for.
    #[instrument(skip(self), fields(output_dir = %self.output_dir.display()))]
    pub async fn run(&self, page_count: u32) -> Result<BatchReport, BatchError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| BatchError::OutputDir {
                path: self.output_dir.clone(),
                source,
            })?;

        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(BatchContext {
            fetcher: self.fetcher.clone(),
            downloader: self.downloader.clone(),
            output_dir: self.output_dir.clone(),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            fatal_tx,
            stats: BatchStats::new(),
        });

        info!(page_count, "starting batch");

        for page in 1..=page_count {
            let page_ctx = Arc::clone(&ctx);
            ctx.spawn(run_page(page_ctx, page));
        }

        // Spawning after close is allowed; closing only lets `wait` finish once
        // the set of tracked tasks drains to zero.
        ctx.tracker.close();

        debug!("waiting for page and photo tasks");

        tokio::select! {
            () = ctx.tracker.wait() => {}
            Some(fatal) = fatal_rx.recv() => {
                ctx.cancel.cancel();
                return Err(fatal);
            }
        }

        // A fatal error can race with the last task finishing.
        if let Ok(fatal) = fatal_rx.try_recv() {
            return Err(fatal);
        }

        let report = ctx.stats.snapshot();

        info!(
            pages_fetched = report.pages_fetched,
            pages_skipped = report.pages_skipped,
            downloads_completed = report.downloads_completed,
            downloads_skipped = report.downloads_skipped,
            retried = report.retried,
            "batch complete"
        );

        Ok(report)
    }
}

/// State shared by every task of one run.
struct BatchContext {
    fetcher: PageFetcher,
    downloader: ImageDownloader,
    output_dir: PathBuf,
    tracker: TaskTracker,
    cancel: CancellationToken,
    fatal_tx: mpsc::UnboundedSender<BatchError>,
    stats: BatchStats,
}

impl BatchContext {
    /// Registers `task` with the run's join barrier and spawns it.
    ///
    /// The task stops early if the run is cancelled.
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => debug!("task cancelled"),
                () = task => {}
            }
        });
    }

    /// Reports a fatal error and cancels every outstanding task.
    fn fail(&self, fatal: BatchError) {
        error!(error = %fatal, "fatal error, aborting batch");
        self.cancel.cancel();
        if self.fatal_tx.send(fatal).is_err() {
            debug!("batch already finished, fatal error dropped");
        }
    }
}

#[instrument(skip(ctx))]
async fn run_page(ctx: Arc<BatchContext>, page: u32) {
    let outcome = match ctx.fetcher.fetch_page(page).await {
        Ok(outcome) => outcome,
        Err(e) => {
            ctx.fail(e.into());
            return;
        }
    };

    let attempts = outcome.attempts();
    if let PageOutcome::Skipped { .. } = outcome {
        ctx.stats.record_page_skipped(attempts);
        info!(page, "finished page (skipped)");
        return;
    }

    let houses = outcome.into_houses();
    ctx.stats.record_page_fetched(attempts, houses.len());

    for house in &houses {
        let task = ImageTask::for_house(house, &ctx.output_dir);
        let download_ctx = Arc::clone(&ctx);
        ctx.spawn(run_download(download_ctx, task));
    }

    info!(page, records = houses.len(), "finished page");
}

#[instrument(skip(ctx, task), fields(house_id = task.house_id))]
async fn run_download(ctx: Arc<BatchContext>, task: ImageTask) {
    match ctx.downloader.download_task(&task).await {
        Ok(DownloadOutcome::Completed { attempts, .. }) => {
            ctx.stats.record_download_completed(attempts);
        }
        Ok(DownloadOutcome::Skipped { attempts, .. }) => {
            ctx.stats.record_download_skipped(attempts);
        }
        Err(e) => ctx.fail(e.into()),
    }
}
