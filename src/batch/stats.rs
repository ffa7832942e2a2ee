//! Counters for a batch run.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Live statistics for a batch run.
///
/// Updated with atomic counters from concurrent page and photo tasks. Tasks
/// only ever add to the counters; nothing reads them until the run's join
/// barrier has been passed.
#[derive(Debug, Default)]
pub struct BatchStats {
    pages_fetched: AtomicUsize,
    pages_skipped: AtomicUsize,
    downloads_scheduled: AtomicUsize,
    downloads_completed: AtomicUsize,
    downloads_skipped: AtomicUsize,
    retried: AtomicUsize,
}

impl BatchStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_page_fetched(&self, attempts: u32, records: usize) {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst);
        self.downloads_scheduled.fetch_add(records, Ordering::SeqCst);
        self.add_retries(attempts);
    }

    pub(crate) fn record_page_skipped(&self, attempts: u32) {
        self.pages_skipped.fetch_add(1, Ordering::SeqCst);
        self.add_retries(attempts);
    }

    pub(crate) fn record_download_completed(&self, attempts: u32) {
        self.downloads_completed.fetch_add(1, Ordering::SeqCst);
        self.add_retries(attempts);
    }

    pub(crate) fn record_download_skipped(&self, attempts: u32) {
        self.downloads_skipped.fetch_add(1, Ordering::SeqCst);
        self.add_retries(attempts);
    }

    /// Every attempt after the first one is a retry.
    fn add_retries(&self, attempts: u32) {
        let retries = attempts.saturating_sub(1) as usize;
        if retries > 0 {
            self.retried.fetch_add(retries, Ordering::SeqCst);
        }
    }

    /// Takes a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> BatchReport {
        BatchReport {
            pages_fetched: self.pages_fetched.load(Ordering::SeqCst),
            pages_skipped: self.pages_skipped.load(Ordering::SeqCst),
            downloads_scheduled: self.downloads_scheduled.load(Ordering::SeqCst),
            downloads_completed: self.downloads_completed.load(Ordering::SeqCst),
            downloads_skipped: self.downloads_skipped.load(Ordering::SeqCst),
            retried: self.retried.load(Ordering::SeqCst),
        }
    }
}

/// Final counts of a completed batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Pages that answered `200 OK` and decoded.
    pub pages_fetched: usize,
    /// Pages given up on.
    pub pages_skipped: usize,
    /// Photo downloads spawned (one per record of a fetched page).
    pub downloads_scheduled: usize,
    /// Photos written to disk.
    pub downloads_completed: usize,
    /// Photos given up on.
    pub downloads_skipped: usize,
    /// Retries across all pages and photos.
    pub retried: usize,
}

impl BatchReport {
    /// Pages that finished, fetched or skipped.
    #[must_use]
    pub fn pages_total(&self) -> usize {
        self.pages_fetched + self.pages_skipped
    }

    /// Photo downloads that finished, completed or skipped.
    #[must_use]
    pub fn downloads_total(&self) -> usize {
        self.downloads_completed + self.downloads_skipped
    }
}
