//! House Downloader Core Library
//!
//! This library paginates a house listing API and downloads the photo of every
//! listed house to local storage, retrying transient HTTP failures with
//! exponential backoff.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`batch`] - Two-level fan-out of page fetches and photo downloads
//! - [`download`] - HTTP client, retry policy and photo downloader
//! - [`listing`] - Listing page URLs, response schema and page fetcher

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]

pub mod batch;
pub mod download;
pub mod listing;

// Re-export commonly used types
pub use batch::{BatchConfig, BatchError, BatchOrchestrator, BatchReport};
pub use download::{
    DownloadError, DownloadOutcome, FailureType, HttpClient, ImageDownloader, RetryPolicy,
    classify_error,
};
pub use listing::{House, HousePage, ListingError, PageFetcher, PageOutcome};
