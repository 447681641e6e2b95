//! Bounded polling.
//!
//! Resolution is a snapshot: callers wait for a map to settle, or for a
//! selector to resolve to something, by polling with a timeout.
//!
//! - [`WaitOptions`]: timeout and poll interval
//! - [`CancellationToken`]: cooperative cancellation shared across threads
//! - [`poll_until`] / [`wait_until`]: the polling loops

use crate::result::{MapGrabError, MapGrabResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// CANCELLATION
// =============================================================================

/// Cooperative cancellation flag; clones share the flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a live token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Outcome of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the condition was evaluated
    pub attempts: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `probe` until it yields a value.
///
/// The probe runs at least once, even with a zero timeout. Between attempts
/// the loop sleeps for the poll interval, never past the deadline.
///
/// # Errors
///
/// Returns `Cancelled` once the token is cancelled and `Timeout` when the
/// deadline passes without a value.
pub fn poll_until<T, F>(
    options: &WaitOptions,
    token: &CancellationToken,
    description: &str,
    mut probe: F,
) -> MapGrabResult<(T, WaitResult)>
where
    F: FnMut() -> Option<T>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts = 0;

    loop {
        if token.is_cancelled() {
            return Err(MapGrabError::Cancelled);
        }

        attempts += 1;
        if let Some(value) = probe() {
            let result = WaitResult {
                elapsed: start.elapsed(),
                attempts,
                waited_for: description.to_string(),
            };
            return Ok((value, result));
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            trace!(waited_for = description, attempts, "wait timed out");
            return Err(MapGrabError::Timeout {
                ms: options.timeout_ms,
            });
        }
        std::thread::sleep(options.poll_interval().min(timeout - elapsed));
    }
}

/// Poll a boolean condition until it holds
///
/// # Errors
///
/// See [`poll_until`].
pub fn wait_until<F>(
    options: &WaitOptions,
    token: &CancellationToken,
    description: &str,
    mut condition: F,
) -> MapGrabResult<WaitResult>
where
    F: FnMut() -> bool,
{
    poll_until(options, token, description, || condition().then_some(()))
        .map(|((), result)| result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_wait_options_default() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_wait_options_chained() {
            let opts = WaitOptions::new().with_timeout(200).with_poll_interval(5);
            assert_eq!(opts.timeout(), Duration::from_millis(200));
            assert_eq!(opts.poll_interval(), Duration::from_millis(5));
        }
    }

    mod poll_tests {
        use super::*;

        #[test]
        fn test_immediate_success() {
            let token = CancellationToken::new();
            let (value, result) =
                poll_until(&WaitOptions::new(), &token, "answer", || Some(42)).unwrap();
            assert_eq!(value, 42);
            assert_eq!(result.attempts, 1);
            assert_eq!(result.waited_for, "answer");
        }

        #[test]
        fn test_succeeds_after_retries() {
            let token = CancellationToken::new();
            let mut calls = 0;
            let options = WaitOptions::new().with_timeout(1_000).with_poll_interval(1);
            let result = wait_until(&options, &token, "third call", || {
                calls += 1;
                calls == 3
            })
            .unwrap();
            assert_eq!(result.attempts, 3);
        }

        #[test]
        fn test_zero_timeout_still_probes_once() {
            let token = CancellationToken::new();
            let options = WaitOptions::new().with_timeout(0);
            let mut calls = 0;
            let err = wait_until(&options, &token, "never", || {
                calls += 1;
                false
            })
            .unwrap_err();
            assert!(matches!(err, MapGrabError::Timeout { ms: 0 }));
            assert_eq!(calls, 1);
        }

        #[test]
        fn test_timeout() {
            let token = CancellationToken::new();
            let options = WaitOptions::new().with_timeout(30).with_poll_interval(5);
            let start = Instant::now();
            let err = wait_until(&options, &token, "never", || false).unwrap_err();
            assert!(matches!(err, MapGrabError::Timeout { ms: 30 }));
            assert!(start.elapsed() >= Duration::from_millis(30));
        }

        #[test]
        fn test_cancelled_token_stops_wait() {
            let token = CancellationToken::new();
            token.cancel();
            let err = wait_until(&WaitOptions::new(), &token, "never", || true).unwrap_err();
            assert!(matches!(err, MapGrabError::Cancelled));
        }

        #[test]
        fn test_cancel_from_other_thread() {
            let token = CancellationToken::new();
            let remote = token.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                remote.cancel();
            });
            let options = WaitOptions::new().with_timeout(5_000).with_poll_interval(5);
            let err = wait_until(&options, &token, "never", || false).unwrap_err();
            assert!(matches!(err, MapGrabError::Cancelled));
        }
    }
}
