//! Retrying fetch of a single listing page.

use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::ListingError;
use super::model::{HousePage, decode_page};
use crate::download::{HttpClient, RetryError, RetryPolicy, retry_with_backoff};

/// Result of fetching one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page answered `200 OK` and its body decoded.
    Fetched {
        /// Decoded records.
        page: HousePage,
        /// Attempts made, including the successful one.
        attempts: u32,
    },

    /// The page was given up on; the run continues with zero records for it.
    Skipped {
        /// Attempts made before giving up.
        attempts: u32,
        /// Human-readable reason, e.g. "too many retries (5): HTTP 503 ...".
        reason: String,
    },
}

impl PageOutcome {
    /// Records to download for this page (empty when skipped).
    #[must_use]
    pub fn into_houses(self) -> Vec<super::House> {
        match self {
            Self::Fetched { page, .. } => page.houses,
            Self::Skipped { .. } => Vec::new(),
        }
    }

    /// Attempts made for this page.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Fetched { attempts, .. } | Self::Skipped { attempts, .. } => *attempts,
        }
    }
}

/// Builds the URL of listing page `page` by appending `page=<n>` to `base`.
///
/// Query parameters already present on `base` are kept.
///
/// ```
/// use house_downloader_core::listing::page_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/api_project/houses").unwrap();
/// assert_eq!(page_url(&base, 3).as_str(), "https://example.com/api_project/houses?page=3");
/// ```
#[must_use]
pub fn page_url(base: &Url, page: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("page", &page.to_string());
    url
}

/// Fetches listing pages, retrying transient failures with backoff.
///
/// Every attempt owns its response; a non-200 response is dropped (and its
/// connection released) before the backoff wait starts. The body is decoded
/// once, after the first `200 OK`.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: HttpClient,
    base_url: Url,
    retry_policy: RetryPolicy,
}

impl PageFetcher {
    /// Creates a fetcher for the listing endpoint at `base_url`.
    #[must_use]
    pub fn new(client: HttpClient, base_url: Url, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url,
            retry_policy,
        }
    }

    /// Fetches and decodes listing page `page` (1-based).
    ///
    /// Non-200 responses and transport failures are retried per the retry
    /// policy. When the budget is spent (or the URL is unusable) the page is
    /// reported as [`PageOutcome::Skipped`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::Decode`] when a `200 OK` body is not a listing
    /// document. The run cannot safely continue after that.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn fetch_page(&self, page: u32) -> Result<PageOutcome, ListingError> {
        let url = page_url(&self.base_url, page);

        let url_str = url.as_str();
        let fetched = retry_with_backoff(&self.retry_policy, |attempt| async move {
            debug!(attempt, "requesting listing page");
            self.client.get_bytes(url_str).await
        })
        .await;

        match fetched {
            Ok(attempted) => {
                let decoded = decode_page(&attempted.value)
                    .map_err(|e| ListingError::decode(page, url.as_str(), e))?;
                debug!(
                    records = decoded.len(),
                    attempts = attempted.attempts,
                    "listing page decoded"
                );
                Ok(PageOutcome::Fetched {
                    page: decoded,
                    attempts: attempted.attempts,
                })
            }
            Err(err @ RetryError::Exhausted { .. }) => {
                warn!(
                    attempts = err.attempts(),
                    url = %url,
                    "too many retries when fetching listing page, ignoring it"
                );
                Ok(PageOutcome::Skipped {
                    attempts: err.attempts(),
                    reason: err.to_string(),
                })
            }
            Err(err @ RetryError::NotRetried { .. }) => {
                info!(url = %url, error = %err, "listing page cannot be fetched, ignoring it");
                Ok(PageOutcome::Skipped {
                    attempts: err.attempts(),
                    reason: err.to_string(),
                })
            }
        }
    }
}
