//! Error types for staff-harvest
//!
//! Two layers of errors exist here:
//! - [`FetchError`] classifies a *single attempt* against the search endpoint
//!   and drives the retry engine's transient/permanent decision.
//! - [`Error`] is the crate-wide error for everything that escapes the
//!   attempt → page → partition containment chain (configuration, export I/O,
//!   or a run where no partition succeeded at all).

use std::time::Duration;
use thiserror::Error;

/// Result type alias for staff-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for staff-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "endpoint.base_url")
        key: Option<String>,
    },

    /// Network error outside the per-page retry scope (e.g., client construction)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export error
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    /// Whole-run failure: every partition stopped without completing
    #[error("no partitions succeeded: all {attempted} partitions failed")]
    AllPartitionsFailed {
        /// Number of partitions that were attempted
        attempted: usize,
    },
}

/// Error for a single fetch attempt against the search endpoint
///
/// The retry engine consults [`crate::retry::IsRetryable`] to decide whether
/// an attempt failure is transient (retried with backoff) or terminal for the
/// page.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The endpoint answered with a non-2xx status
    #[error("HTTP status {status} from search endpoint")]
    Status {
        /// The HTTP status code that was returned
        status: u16,
    },

    /// The request did not complete within the configured timeout
    #[error("request timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded
        timeout: Duration,
    },

    /// Connection-level failure (DNS, refused, reset, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not valid JSON
    #[error("response body was not valid JSON: {0}")]
    InvalidBody(String),
}

impl FetchError {
    /// Classify a reqwest error from one attempt
    ///
    /// Timeouts keep the configured timeout for the message; status errors
    /// keep the code; everything else is a transport failure.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { timeout }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_message() {
        let err = Error::Config {
            message: "base_url is not a valid URL".to_string(),
            key: Some("endpoint.base_url".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "configuration error: base_url is not a valid URL"
        );
    }

    #[test]
    fn all_partitions_failed_display_includes_count() {
        let err = Error::AllPartitionsFailed { attempted: 26 };
        assert!(err.to_string().contains("all 26 partitions failed"));
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn fetch_error_status_display_includes_code() {
        let err = FetchError::Status { status: 503 };
        assert_eq!(err.to_string(), "HTTP status 503 from search endpoint");
    }

    #[test]
    fn fetch_error_timeout_display_includes_duration() {
        let err = FetchError::Timeout {
            timeout: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn fetch_error_invalid_body_display_includes_cause() {
        let err = FetchError::InvalidBody("expected value at line 1".to_string());
        assert!(err.to_string().contains("not valid JSON"));
        assert!(err.to_string().contains("expected value at line 1"));
    }
}
