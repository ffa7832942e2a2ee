//! Retry logic with exponential backoff for transient request failures.
//!
//! Page fetches and image downloads share one retry shape: a fixed attempt
//! budget, a wait that starts at [`DEFAULT_INITIAL_BACKOFF`] and is multiplied
//! after every failed attempt, and no wait after the final failure.
//!
//! # Overview
//!
//! Each error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - may succeed on retry (non-200 status, transport failure)
//! - [`FailureType::Permanent`] - will never succeed; the unit is skipped without retrying
//! - [`FailureType::Fatal`] - the local environment or upstream contract is broken; the run ends
//!
//! [`retry_with_backoff`] drives an async operation through a [`RetryPolicy`]
//! and reports either the value and the number of attempts it took, or a
//! [`RetryError`] saying why it gave up.
//!
//! # Example
//!
//! ```
//! use house_downloader_core::download::{FailureType, RetryDecision, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay, Duration::from_millis(500));
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::{DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS};

/// Classification of request failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: non-200 status, connection refused, timeout, body stream cut off.
    Transient,

    /// Failure that retrying cannot fix, but which only affects this unit of work.
    ///
    /// Example: a photo URL that does not parse.
    Permanent,

    /// Failure that invalidates the whole run.
    ///
    /// Examples: destination file cannot be created, listing body is not valid JSON.
    Fatal,
}

/// Errors that know how they should be treated by [`retry_with_backoff`].
pub trait Retryable {
    /// Returns the failure classification for this error.
    fn failure_type(&self) -> FailureType;
}

impl Retryable for DownloadError {
    fn failure_type(&self) -> FailureType {
        classify_error(self)
    }
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `initial_delay`: 500 ms
/// - `backoff_multiplier`: 2
///
/// # Delay Calculation
///
/// ```text
/// delay(attempt) = initial_delay * multiplier^(attempt - 1)
/// ```
///
/// With defaults the waits are 0.5s, 1s, 2s, 4s; the fifth failure ends the
/// loop without waiting. There is no jitter, so the total wait before a
/// success on attempt `k` is exactly `0.5s * (2^(k-1) - 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Wait after the first failed attempt.
    initial_delay: Duration,

    /// Multiplier applied after each failed attempt.
    backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum attempts including initial (clamped to >= 1)
    /// * `initial_delay` - Wait after the first failed attempt
    /// * `backoff_multiplier` - Factor applied after each failed attempt
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_multiplier,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the wait inserted after the first failed attempt.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Determines whether to retry after a failed attempt.
    ///
    /// `attempt` is the 1-indexed attempt that just failed.
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Fatal => {
                return RetryDecision::DoNotRetry {
                    reason: "fatal failure - run cannot continue".to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay_for(attempt),
            attempt: attempt + 1,
        }
    }

    /// Returns the wait after failed attempt `attempt` (1-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.backoff_multiplier.saturating_pow(exponent);
        self.initial_delay.saturating_mul(factor)
    }

    /// Returns the total time spent waiting before attempt `attempts` is made.
    #[must_use]
    pub fn total_delay_before(&self, attempts: u32) -> Duration {
        (1..attempts).map(|attempt| self.delay_for(attempt)).sum()
    }
}

/// A value produced by [`retry_with_backoff`] with the attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    /// The successful result.
    pub value: T,
    /// Number of attempts made, including the successful one.
    pub attempts: u32,
}

/// Why [`retry_with_backoff`] gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error.
    #[error("too many retries ({attempts}): {last_error}")]
    Exhausted {
        /// Attempts made before giving up.
        attempts: u32,
        /// Error from the final attempt.
        last_error: E,
    },

    /// An attempt failed with an error that is not worth retrying.
    #[error("attempt {attempt} failed without retry: {error}")]
    NotRetried {
        /// The attempt that failed.
        attempt: u32,
        /// The permanent or fatal error.
        error: E,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::NotRetried { attempt, .. } => *attempt,
        }
    }

    /// Consumes the error, returning the error from the last attempt.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last_error, .. } => last_error,
            Self::NotRetried { error, .. } => error,
        }
    }
}

/// Runs `operation` until it succeeds, fails without retry, or exhausts the policy.
///
/// The operation receives the 1-indexed attempt number. Between failed
/// attempts the calling task sleeps for [`RetryPolicy::delay_for`]; nothing
/// else suspends it. Retry state is local to this call.
///
/// # Errors
///
/// Returns [`RetryError::Exhausted`] when every attempt failed with a
/// transient error, and [`RetryError::NotRetried`] as soon as an attempt
/// fails with a permanent or fatal error.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<Attempted<T>, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempts = attempt, "succeeded after retry");
                }
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                });
            }
            Err(error) => {
                let failure_type = error.failure_type();
                match policy.should_retry(failure_type, attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        debug!(
                            attempt = next_attempt,
                            max_attempts = policy.max_attempts(),
                            delay_ms = delay.as_millis(),
                            error = %error,
                            "retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        debug!(attempt, %reason, "not retrying");
                        return Err(if failure_type == FailureType::Transient {
                            RetryError::Exhausted {
                                attempts: attempt,
                                last_error: error,
                            }
                        } else {
                            RetryError::NotRetried { attempt, error }
                        });
                    }
                }
            }
        }
    }
}

/// Classifies a download error into a failure type.
///
/// | Error | Type | Rationale |
/// |-------|------|-----------|
/// | HttpStatus (any non-200) | Transient | Upstream may recover |
/// | Timeout | Transient | Network may recover |
/// | Network | Transient | Server may come back |
/// | InvalidUrl | Permanent | Won't succeed; only this unit is affected |
/// | Io | Fatal | Local file system failures are not expected to be transient |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { .. }
        | DownloadError::Timeout { .. }
        | DownloadError::Network { .. } => FailureType::Transient,

        DownloadError::InvalidUrl { .. } => FailureType::Permanent,

        DownloadError::Io { .. } => FailureType::Fatal,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient error"),
                TestError::Permanent => write!(f, "permanent error"),
                TestError::Fatal => write!(f, "fatal error"),
            }
        }
    }

    impl Retryable for TestError {
        fn failure_type(&self) -> FailureType {
            match self {
                TestError::Transient => FailureType::Transient,
                TestError::Permanent => FailureType::Permanent,
                TestError::Fatal => FailureType::Fatal,
            }
        }
    }

    /// Operation that fails transiently until attempt `succeed_on`.
    async fn run_until(
        succeed_on: u32,
        calls: Arc<AtomicU32>,
    ) -> Result<Attempted<u32>, RetryError<TestError>> {
        retry_with_backoff(&RetryPolicy::default(), |attempt| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt >= succeed_on {
                    Ok(attempt)
                } else {
                    Err(TestError::Transient)
                }
            }
        })
        .await
    }

    /// The paused clock only moves by timer deadlines, so the elapsed time is the
    /// sum of backoff sleeps (allowing for millisecond tick rounding).
    fn assert_waited(start: tokio::time::Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "waited {elapsed:?}, expected {expected:?}"
        );
    }

    // ==================== RetryPolicy Tests ====================

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.initial_delay(), Duration::from_millis(500));
        assert_eq!(policy.backoff_multiplier, 2);
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_delay_doubles_from_half_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_with_custom_multiplier() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), 3);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(900));
    }

    #[test]
    fn test_total_delay_before_matches_closed_form() {
        let policy = RetryPolicy::default();
        for k in 1..=5u32 {
            let expected = Duration::from_millis(500) * (2u32.pow(k - 1) - 1);
            assert_eq!(policy.total_delay_before(k), expected, "k = {k}");
        }
    }

    // ==================== Should Retry Decision Tests ====================

    #[test]
    fn test_should_retry_transient_retries() {
        let policy = RetryPolicy::default();
        let decision = policy.should_retry(FailureType::Transient, 1);
        assert_eq!(
            decision,
            RetryDecision::Retry {
                delay: Duration::from_millis(500),
                attempt: 2
            }
        );
    }

    #[test]
    fn test_should_retry_permanent_does_not_retry() {
        let decision = RetryPolicy::default().should_retry(FailureType::Permanent, 1);
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("permanent"));
        } else {
            panic!("expected DoNotRetry, got {decision:?}");
        }
    }

    #[test]
    fn test_should_retry_fatal_does_not_retry() {
        let decision = RetryPolicy::default().should_retry(FailureType::Fatal, 1);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
    }

    #[test]
    fn test_should_retry_stops_on_fifth_failure() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 4),
            RetryDecision::Retry { attempt: 5, .. }
        ));
        let decision = policy.should_retry(FailureType::Transient, 5);
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("exhausted"));
        } else {
            panic!("expected DoNotRetry, got {decision:?}");
        }
    }

    // ==================== Error Classification Tests ====================

    #[test]
    fn test_classify_any_non_200_status_transient() {
        for status in [201, 204, 301, 404, 429, 500, 503] {
            let error = DownloadError::http_status("http://example.com", status);
            assert_eq!(classify_error(&error), FailureType::Transient, "status {status}");
        }
    }

    #[test]
    fn test_classify_timeout_transient() {
        let error = DownloadError::timeout("http://example.com");
        assert_eq!(classify_error(&error), FailureType::Transient);
    }

    #[test]
    fn test_classify_invalid_url_permanent() {
        let error = DownloadError::invalid_url("not-a-url");
        assert_eq!(classify_error(&error), FailureType::Permanent);
    }

    #[test]
    fn test_classify_io_error_fatal() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = DownloadError::io("/path/to/file", io_err);
        assert_eq!(classify_error(&error), FailureType::Fatal);
    }

    // ==================== retry_with_backoff Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_does_not_wait() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let result = run_until(1, Arc::clone(&calls)).await.unwrap();

        assert_eq!(result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_waited(start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_attempt_k_waits_exact_backoff() {
        for k in 2..=5u32 {
            let calls = Arc::new(AtomicU32::new(0));
            let start = tokio::time::Instant::now();

            let result = run_until(k, Arc::clone(&calls)).await.unwrap();

            let expected = Duration::from_millis(500) * (2u32.pow(k - 1) - 1);
            assert_eq!(result.attempts, k);
            assert_eq!(result.value, k);
            assert_eq!(calls.load(Ordering::SeqCst), k);
            assert_waited(start, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_five_attempts_and_four_waits() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let err = run_until(u32::MAX, Arc::clone(&calls)).await.unwrap_err();

        assert!(matches!(err, RetryError::Exhausted { attempts: 5, .. }));
        assert!(err.to_string().contains("too many retries (5)"));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // 0.5 + 1 + 2 + 4, no wait after the final failure
        assert_waited(start, Duration::from_millis(7500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let start = tokio::time::Instant::now();

        let err = retry_with_backoff(&RetryPolicy::default(), |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError::Permanent)
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, RetryError::NotRetried { attempt: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_waited(start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_after_transient_keeps_attempt_count() {
        let err = retry_with_backoff(&RetryPolicy::default(), |attempt| async move {
            if attempt < 3 {
                Err::<(), _>(TestError::Transient)
            } else {
                Err(TestError::Fatal)
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts(), 3);
        assert!(matches!(err.into_inner(), TestError::Fatal));
    }
}
