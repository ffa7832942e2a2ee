//! Retrying download of a single listing photo.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::HttpClient;
use super::error::DownloadError;
use super::filename::destination_path;
use super::retry::{FailureType, RetryError, RetryPolicy, Retryable, retry_with_backoff};
use crate::listing::House;

/// One photo to fetch: where it comes from and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    /// Record the photo belongs to.
    pub house_id: i64,
    /// Photo URL.
    pub url: String,
    /// Destination file, `<output_dir>/<id>-<address><extension>`.
    pub destination: PathBuf,
}

impl ImageTask {
    /// Derives the download task for a record.
    #[must_use]
    pub fn for_house(house: &House, output_dir: &Path) -> Self {
        Self {
            house_id: house.id,
            url: house.photo_url.clone(),
            destination: destination_path(output_dir, house.id, &house.address, &house.photo_url),
        }
    }
}

/// Result of downloading one photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The photo was written to disk.
    Completed {
        /// Written file.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
        /// Attempts made, including the successful one.
        attempts: u32,
    },

    /// The photo was given up on; sibling downloads are unaffected.
    Skipped {
        /// Attempts made before giving up.
        attempts: u32,
        /// Human-readable reason, e.g. "too many retries (5): HTTP 404 ...".
        reason: String,
    },
}

impl DownloadOutcome {
    /// Attempts made for this photo.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. } | Self::Skipped { attempts, .. } => *attempts,
        }
    }
}

/// Downloads photos to local files, retrying transient failures with backoff.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: HttpClient,
    retry_policy: RetryPolicy,
}

impl ImageDownloader {
    /// Creates a downloader using `client` for requests.
    #[must_use]
    pub fn new(client: HttpClient, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
        }
    }

    /// Downloads `url` into `destination`.
    ///
    /// Non-200 responses, transport failures and interrupted bodies are
    /// retried per the retry policy. The destination is created only once a
    /// `200 OK` response arrives, and the response and file handles are
    /// released at the end of every attempt.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] when the destination cannot be created or
    /// written. Such failures are not retried and end the run.
    #[instrument(skip(self), fields(url = %url, path = %destination.display()))]
    pub async fn download_file(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<DownloadOutcome, DownloadError> {
        let downloaded = retry_with_backoff(&self.retry_policy, |attempt| async move {
            debug!(attempt, "requesting photo");
            self.client.download_to_path(url, destination).await
        })
        .await;

        match downloaded {
            Ok(attempted) => {
                info!(
                    path = %destination.display(),
                    bytes = attempted.value,
                    attempts = attempted.attempts,
                    "photo downloaded"
                );
                Ok(DownloadOutcome::Completed {
                    path: destination.to_path_buf(),
                    bytes: attempted.value,
                    attempts: attempted.attempts,
                })
            }
            Err(RetryError::NotRetried { error, .. })
                if error.failure_type() == FailureType::Fatal =>
            {
                Err(error)
            }
            Err(err @ RetryError::Exhausted { .. }) => {
                warn!(
                    attempts = err.attempts(),
                    url = %url,
                    "too many retries when fetching photo, ignoring the URL"
                );
                Ok(DownloadOutcome::Skipped {
                    attempts: err.attempts(),
                    reason: err.to_string(),
                })
            }
            Err(err @ RetryError::NotRetried { .. }) => {
                warn!(url = %url, error = %err, "photo cannot be fetched, ignoring the URL");
                Ok(DownloadOutcome::Skipped {
                    attempts: err.attempts(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Downloads the photo described by `task`.
    ///
    /// # Errors
    ///
    /// Same as [`download_file`](Self::download_file).
    pub async fn download_task(&self, task: &ImageTask) -> Result<DownloadOutcome, DownloadError> {
        self.download_file(&task.url, &task.destination).await
    }
}
