//! Listing API access: page URLs, the response schema, and the retrying page fetcher.
//!
//! # Example
//!
//! ```no_run
//! use house_downloader_core::download::{HttpClient, RetryPolicy};
//! use house_downloader_core::listing::{PageFetcher, PageOutcome};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base = Url::parse("https://example.com/api_project/houses")?;
//! let fetcher = PageFetcher::new(HttpClient::new()?, base, RetryPolicy::default());
//! if let PageOutcome::Fetched { page, .. } = fetcher.fetch_page(1).await? {
//!     println!("{} houses", page.len());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod fetcher;
mod model;

pub use error::ListingError;
pub use fetcher::{PageFetcher, PageOutcome, page_url};
pub use model::{House, HousePage, decode_page};
