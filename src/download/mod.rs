//! HTTP download layer: client, retry policy, photo downloader and file naming.
//!
//! # Features
//!
//! - Streaming downloads (response bodies are never buffered whole for photos)
//! - One retry-with-backoff routine shared by page fetches and photo downloads
//! - Configurable timeouts (30s connect, 2min read by default)
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use house_downloader_core::download::{
//!     DownloadOutcome, HttpClient, ImageDownloader, RetryPolicy,
//! };
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = ImageDownloader::new(HttpClient::new()?, RetryPolicy::default());
//! let outcome = downloader
//!     .download_file("https://example.com/photo.jpg", Path::new("images/42-Oak St.jpg"))
//!     .await?;
//! if let DownloadOutcome::Completed { path, .. } = outcome {
//!     println!("Downloaded: {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod filename;
mod image;
mod retry;

pub use client::HttpClient;
pub use error::DownloadError;
pub use filename::{destination_file_name, destination_path};
pub use image::{DownloadOutcome, ImageDownloader, ImageTask};
pub use retry::{
    Attempted, FailureType, RetryDecision, RetryError, RetryPolicy, Retryable, classify_error,
    retry_with_backoff,
};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
