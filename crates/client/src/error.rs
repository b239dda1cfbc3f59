//! Error types for the search-job client.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during search-job client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Authentication configuration is missing or unusable.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API error response from Splunk.
    #[error("API error ({status}) at {url}: {message}{}", .request_id.as_ref().map(|id| format!(" [Request ID: {id}]")).unwrap_or_default())]
    ApiError {
        status: u16,
        url: String,
        message: String,
        request_id: Option<String>,
    },

    /// Invalid response format from Splunk.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A disallowed option or argument, rejected before any request is sent.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// The search service rejected the query string.
    #[error("Search syntax error: {message}")]
    SearchSyntax { message: String },

    /// The referenced job no longer exists on the service.
    #[error("Search job not found: {sid}")]
    JobNotFound { sid: String },

    /// A bounded wait exceeded its deadline.
    #[error("Operation '{operation}' did not complete within {timeout:?}")]
    OperationTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Non-blocking results retrieval was requested before the job finished.
    #[error("Search job {sid} is not done; wait for completion or pass a timeout")]
    JobNotDone { sid: String },

    /// Malformed results-stream data.
    #[error("Failed to parse results stream at byte {position} near {fragment}: {message}")]
    Parse {
        position: u64,
        fragment: String,
        message: String,
    },

    /// The transport failed while a results stream was being read.
    #[error("Results stream interrupted: {0}")]
    StreamInterrupted(String),

    /// Maximum retries exceeded.
    #[error("Maximum retries exceeded ({0} attempts): {1}")]
    MaxRetriesExceeded(usize, Box<ClientError>),
}

impl ClientError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(e) => e.is_timeout() || e.is_connect(),
            Self::ApiError { status, .. } => Self::is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if an HTTP status code is retryable.
    ///
    /// Retryable status codes:
    /// - 429: Too Many Requests (rate limiting)
    /// - 502: Bad Gateway (transient server error)
    /// - 503: Service Unavailable (transient server error)
    /// - 504: Gateway Timeout (transient server error)
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 429 | 502 | 503 | 504)
    }

    /// Whether this error came from a bounded wait that ran out of time.
    ///
    /// Callers may extend the deadline and wait again.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::OperationTimeout { .. })
    }

    /// Whether the referenced job is gone from the service.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound { .. })
    }

    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::MaxRetriesExceeded(_, inner) => inner.status(),
            _ => None,
        }
    }

    /// Translate a 404 on a per-job path into [`ClientError::JobNotFound`].
    pub(crate) fn for_job(self, sid: &str) -> Self {
        match self {
            Self::ApiError { status: 404, .. } => Self::JobNotFound {
                sid: sid.to_string(),
            },
            other => other,
        }
    }

    /// Translate a 400 on a search-submission path into [`ClientError::SearchSyntax`].
    pub(crate) fn for_search(self) -> Self {
        match self {
            Self::ApiError {
                status: 400,
                message,
                ..
            } => Self::SearchSyntax { message },
            other => other,
        }
    }
}
