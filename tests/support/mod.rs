//! Shared helpers for integration tests: a mock listing API and flaky responders.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use house_downloader_core::RetryPolicy;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Path the mock listing endpoint is served on.
pub const LISTING_PATH: &str = "/api_project/houses";

/// Five attempts like the default policy, but with millisecond waits.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(5), 2)
}

/// Listing endpoint URL of `server`.
pub fn listing_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}{LISTING_PATH}", server.uri())).expect("mock URI is a valid URL")
}

/// Photo URL on `server` for `file_name`.
pub fn photo_url(server: &MockServer, file_name: &str) -> String {
    format!("{}/photos/{file_name}", server.uri())
}

/// JSON for one listing record.
pub fn house_json(id: i64, address: &str, photo_url: &str) -> Value {
    json!({
        "id": id,
        "address": address,
        "homeowner": "Test Owner",
        "price": 100_000,
        "photoURL": photo_url,
    })
}

/// Listing page body wrapping `houses`.
pub fn page_body(houses: Vec<Value>) -> Value {
    json!({ "houses": houses, "ok": true })
}

/// Serves `template` for listing page `page`.
pub async fn mount_page(server: &MockServer, page: u32, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Serves `body` with status 200 for `/photos/<file_name>`.
pub async fn mount_photo(server: &MockServer, file_name: &str, body: &[u8]) {
    mount_photo_template(
        server,
        file_name,
        ResponseTemplate::new(200).set_body_bytes(body.to_vec()),
    )
    .await;
}

/// Serves `template` for `/photos/<file_name>`.
pub async fn mount_photo_template(
    server: &MockServer,
    file_name: &str,
    template: ResponseTemplate,
) {
    Mock::given(method("GET"))
        .and(path(format!("/photos/{file_name}")))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Number of requests `server` received for `request_path`.
pub async fn request_count(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

/// Responder that answers `fail_status` for the first `fail_count` requests, then 200.
pub struct FlakyResponder {
    request_count: Arc<AtomicUsize>,
    fail_count: usize,
    fail_status: u16,
    fail_body: Vec<u8>,
    success: ResponseTemplate,
}

impl FlakyResponder {
    pub fn new(fail_count: usize, fail_status: u16, success: ResponseTemplate) -> Self {
        Self {
            request_count: Arc::new(AtomicUsize::new(0)),
            fail_count,
            fail_status,
            fail_body: b"<html>Service Unavailable</html>".to_vec(),
            success,
        }
    }

    /// Handle to the number of requests answered so far.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.request_count)
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(self.fail_status).set_body_bytes(self.fail_body.clone())
        } else {
            self.success.clone()
        }
    }
}

/// Names of the files in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}
