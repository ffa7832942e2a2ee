//! Constants for the download module (timeouts, retry defaults, endpoints).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (2 minutes; listing photos are small).
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Listing endpoint queried when no `--base-url` is given.
pub const DEFAULT_BASE_URL: &str = "https://app-homevision-staging.herokuapp.com/api_project/houses";

/// Number of listing pages requested per run.
pub const DEFAULT_PAGE_COUNT: u32 = 10;

/// Maximum attempts (including the first) for a page fetch or an image download.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Wait inserted after the first failed attempt.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Factor applied to the wait after every failed attempt.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Directory images are written to when no `--output-dir` is given.
pub const DEFAULT_OUTPUT_DIR: &str = "images";
