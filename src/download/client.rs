//! HTTP client wrapper shared by page fetches and image downloads.
//!
//! This module provides the `HttpClient` struct which sends GET requests with
//! proper timeout configuration, treats anything but `200 OK` as an error, and
//! streams response bodies to disk.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/house-downloader";

/// HTTP client for listing pages and photo downloads.
///
/// Created once per run and cloned into every task; clones share the same
/// connection pool.
///
/// # Example
///
/// ```no_run
/// use house_downloader_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let bytes = client
///     .download_to_path("https://example.com/photo.jpg", Path::new("images/1-Oak St.jpg"))
///     .await?;
/// println!("Wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 2 minutes
    /// - Gzip decompression: enabled
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised.
    #[instrument(level = "debug")]
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = base_client_builder(connect_timeout_secs, read_timeout_secs).build()?;
        Ok(Self { client })
    }

    /// Sends a GET request and returns the response if the status is `200 OK`.
    ///
    /// Any other status is returned as [`DownloadError::HttpStatus`]; the
    /// response is dropped before returning, which releases its connection.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request cannot be built, the transport
    /// fails or times out, or the status is not 200.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get_ok(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                DownloadError::invalid_url(url)
            } else {
                DownloadError::transport(url, e)
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "non-200 response");
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }

    /// Fetches `url` and reads the full body into memory.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`get_ok`](Self::get_ok), plus transport
    /// errors raised while reading the body.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.get_ok(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::transport(url, e))?;
        Ok(body.to_vec())
    }

    /// Downloads `url` into the file at `destination`, returning bytes written.
    ///
    /// The file is created only after a `200 OK` response has been received.
    /// If the body stream fails midway the partial file is removed so the next
    /// attempt starts clean.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Io` if the file cannot be created or written,
    /// and the errors of [`get_ok`](Self::get_ok) otherwise.
    #[instrument(level = "debug", skip(self), fields(url = %url, path = %destination.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<u64, DownloadError> {
        let response = self.get_ok(url).await?;

        let mut file = File::create(destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        let stream_result = stream_to_file(&mut file, response, url, destination).await;
        drop(file);

        if let Err(DownloadError::Network { .. } | DownloadError::Timeout { .. }) = &stream_result {
            debug!(path = %destination.display(), "cleaning up partial file after stream error");
            if let Err(e) = tokio::fs::remove_file(destination).await {
                warn!(path = %destination.display(), error = %e, "failed to remove partial file");
            }
        }

        stream_result
    }
}

/// Streams response body to file, returning bytes written.
///
/// Extracted so the caller can clean up after a failed stream.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::transport(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

fn base_client_builder(connect_timeout_secs: u64, read_timeout_secs: u64) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(default_user_agent())
}

/// Default User-Agent for listing and photo requests (identifies the tool).
fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("house-downloader/{version} (+{PROJECT_UA_URL})")
}
