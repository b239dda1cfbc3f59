//! Metrics collection for search-job traffic.
//!
//! This module records:
//! - Request latency histograms and attempt/retry counters
//! - Errors, categorized for labeling
//! - Job-state poll iterations and decoded result records
//!
//! # What this module does NOT handle:
//! - Metrics exposition/export (install a recorder in the host application)
//! - Persistent storage of metrics
//!
//! # Invariants
//! - All metrics use consistent label names: `endpoint`, `method`, `status`, `error_category`
//! - Metric recording is infallible
//! - Zero-cost when no metrics recorder is installed

use crate::error::ClientError;
use std::time::Duration;

/// Metric name for request duration histogram.
pub const METRIC_REQUEST_DURATION: &str = "splunk_jobs_request_duration_seconds";

/// Metric name for total request counter.
pub const METRIC_REQUESTS_TOTAL: &str = "splunk_jobs_requests_total";

/// Metric name for retry counter.
pub const METRIC_RETRIES_TOTAL: &str = "splunk_jobs_retries_total";

/// Metric name for error counter.
pub const METRIC_ERRORS_TOTAL: &str = "splunk_jobs_errors_total";

/// Metric name for job-state poll iterations.
pub const METRIC_POLLS_TOTAL: &str = "splunk_jobs_polls_total";

/// Metric name for decoded result records.
pub const METRIC_RECORDS_TOTAL: &str = "splunk_jobs_records_total";

/// Error categories for metrics labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport-level errors (connection refused, DNS, reset streams)
    Transport,
    /// HTTP 4xx client errors
    Http4xx,
    /// HTTP 5xx server errors
    Http5xx,
    /// Rejected search strings and other API-level refusals
    Api,
    /// Bounded waits that ran out of time
    Timeout,
    /// Malformed results data
    Parse,
    /// Unknown/unclassified errors
    Unknown,
}

impl ErrorCategory {
    /// Returns the string label for this error category.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Http4xx => "http_4xx",
            ErrorCategory::Http5xx => "http_5xx",
            ErrorCategory::Api => "api",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl From<&ClientError> for ErrorCategory {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::OperationTimeout { .. } => ErrorCategory::Timeout,
            ClientError::StreamInterrupted(_) => ErrorCategory::Transport,
            ClientError::Parse { .. } | ClientError::InvalidResponse(_) => ErrorCategory::Parse,
            ClientError::SearchSyntax { .. } => ErrorCategory::Api,
            ClientError::JobNotFound { .. } => ErrorCategory::Http4xx,
            ClientError::ApiError { status, .. } => {
                if (400..500).contains(status) {
                    ErrorCategory::Http4xx
                } else if (500..600).contains(status) {
                    ErrorCategory::Http5xx
                } else {
                    ErrorCategory::Api
                }
            }
            ClientError::HttpError(e) => {
                if e.is_timeout() {
                    ErrorCategory::Timeout
                } else if e.is_connect() || e.is_request() || e.is_body() {
                    ErrorCategory::Transport
                } else {
                    ErrorCategory::Unknown
                }
            }
            ClientError::MaxRetriesExceeded(_, inner) => ErrorCategory::from(inner.as_ref()),
            _ => ErrorCategory::Unknown,
        }
    }
}

/// Metrics collector for search-job calls.
///
/// Thin wrapper over the `metrics` crate macros so that every call site uses
/// the same names and labels.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    enabled: bool,
}

impl MetricsCollector {
    /// Create an enabled metrics collector.
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Create a collector that records nothing.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Check if metrics collection is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the duration of a request.
    ///
    /// `status` is `None` when the request failed before a response arrived.
    pub fn record_request_duration(
        &self,
        endpoint: &str,
        method: &str,
        duration: Duration,
        status: Option<u16>,
    ) {
        if !self.enabled {
            return;
        }

        let status_label = status.map_or("error".to_string(), |s| s.to_string());

        metrics::histogram!(METRIC_REQUEST_DURATION,
            "endpoint" => endpoint.to_string(),
            "method" => method.to_string(),
            "status" => status_label,
        )
        .record(duration.as_secs_f64());
    }

    /// Record a request attempt, including retries.
    pub fn record_request(&self, endpoint: &str, method: &str) {
        if !self.enabled {
            return;
        }

        metrics::counter!(METRIC_REQUESTS_TOTAL,
            "endpoint" => endpoint.to_string(),
            "method" => method.to_string(),
        )
        .increment(1);
    }

    /// Record a retry attempt (1-based, not counting the initial request).
    pub fn record_retry(&self, endpoint: &str, method: &str, attempt: usize) {
        if !self.enabled {
            return;
        }

        metrics::counter!(METRIC_RETRIES_TOTAL,
            "endpoint" => endpoint.to_string(),
            "method" => method.to_string(),
            "attempt" => attempt.to_string(),
        )
        .increment(1);
    }

    /// Record a categorized error.
    pub fn record_error(&self, endpoint: &str, method: &str, category: ErrorCategory) {
        if !self.enabled {
            return;
        }

        metrics::counter!(METRIC_ERRORS_TOTAL,
            "endpoint" => endpoint.to_string(),
            "method" => method.to_string(),
            "error_category" => category.as_str(),
        )
        .increment(1);
    }

    /// Record an error from a [`ClientError`], categorizing it automatically.
    pub fn record_client_error(&self, endpoint: &str, method: &str, error: &ClientError) {
        self.record_error(endpoint, method, ErrorCategory::from(error));
    }

    /// Record one refresh performed by a job-state wait.
    pub fn record_poll(&self, operation: &'static str) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_POLLS_TOTAL, "operation" => operation).increment(1);
    }

    /// Record one decoded result record of the given kind.
    pub fn record_result_record(&self, kind: &'static str) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_RECORDS_TOTAL, "kind" => kind).increment(1);
    }
}
