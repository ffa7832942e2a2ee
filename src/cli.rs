//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use house_downloader_core::download::constants::{
    DEFAULT_BASE_URL, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_OUTPUT_DIR,
    DEFAULT_PAGE_COUNT,
};

/// Download the photo of every house on a listing API.
///
/// Fetches listing pages concurrently, then downloads each house's photo to
/// `<output-dir>/<id>-<address><extension>`, retrying failed requests with
/// exponential backoff.
#[derive(Parser, Debug)]
#[command(name = "house-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of listing pages to request, starting at page 1
    #[arg(short = 'p', long, default_value_t = DEFAULT_PAGE_COUNT)]
    pub pages: u32,

    /// Listing endpoint; `page=<n>` is appended for every page
    #[arg(short = 'u', long, default_value = DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// Directory photos are written to (created if missing)
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Total attempts per page or photo, first try included (1-10; 1 means no retry)
    #[arg(
        short = 'a',
        long,
        default_value_t = DEFAULT_MAX_ATTEMPTS as u8,
        value_parser = clap::value_parser!(u8).range(1..=10)
    )]
    pub max_attempts: u8,

    /// Wait after the first failed attempt in milliseconds; doubles after every failure
    #[arg(
        long,
        default_value_t = DEFAULT_INITIAL_BACKOFF.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(0..=60000)
    )]
    pub initial_backoff_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_match_fixed_constants() {
        let args = Args::try_parse_from(["house-downloader"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.pages, 10);
        assert_eq!(args.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(args.output_dir, PathBuf::from("images"));
        assert_eq!(args.max_attempts, 5);
        assert_eq!(args.initial_backoff_ms, 500);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["house-downloader", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["house-downloader", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["house-downloader", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::try_parse_from([
            "house-downloader",
            "--pages",
            "3",
            "--base-url",
            "http://127.0.0.1:8080/houses",
            "--output-dir",
            "/tmp/photos",
            "-a",
            "2",
            "--initial-backoff-ms",
            "10",
        ])
        .unwrap();
        assert_eq!(args.pages, 3);
        assert_eq!(args.base_url.as_str(), "http://127.0.0.1:8080/houses");
        assert_eq!(args.output_dir, PathBuf::from("/tmp/photos"));
        assert_eq!(args.max_attempts, 2);
        assert_eq!(args.initial_backoff_ms, 10);
    }

    #[test]
    fn test_cli_rejects_invalid_base_url() {
        let result = Args::try_parse_from(["house-downloader", "--base-url", "not a url"]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_attempts_zero_rejected() {
        let result = Args::try_parse_from(["house-downloader", "-a", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_max_attempts_long_flag() {
        let args = Args::try_parse_from(["house-downloader", "--max-attempts", "1"]).unwrap();
        assert_eq!(args.max_attempts, 1);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["house-downloader", "--help"]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["house-downloader", "--invalid-flag"]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
