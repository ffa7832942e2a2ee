//! Error types for listing page fetches.

use thiserror::Error;

/// Errors that end a run while fetching listing pages.
///
/// Transient request failures never surface here: they are retried and, once
/// the budget is spent, reported as a skipped page.
#[derive(Debug, Error)]
pub enum ListingError {
    /// A `200 OK` body could not be decoded as a listing page.
    #[error("cannot decode listing page {page} from {url}: {source}")]
    Decode {
        /// 1-based page index.
        page: u32,
        /// The page URL that served the body.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ListingError {
    /// Creates a decode error.
    pub fn decode(page: u32, url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            page,
            url: url.into(),
            source,
        }
    }
}
