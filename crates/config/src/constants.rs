//! Centralized constants for the splunk-jobs workspace.
//!
//! This module contains default values used across crates to avoid
//! magic number duplication.

// =============================================================================
// Connection & Timeout Defaults
// =============================================================================

/// Default HTTP connect/read timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum allowed connection timeout in seconds (1 hour).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Default Splunk management port.
pub const DEFAULT_SPLUNK_PORT: u16 = 8089;

/// Default maximum number of HTTP redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Default maximum number of retries for failed read requests.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Upper bound accepted for `SPLUNK_MAX_RETRIES`.
pub const MAX_MAX_RETRIES: usize = 10;

// =============================================================================
// Job Polling Defaults
// =============================================================================

/// Default polling interval for job status checks in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Smallest polling interval accepted from configuration, in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Default maximum time to wait for a job to converge, in seconds.
pub const DEFAULT_MAX_WAIT_SECS: u64 = 300;

/// Highest job priority the search service accepts.
pub const MAX_JOB_PRIORITY: u8 = 10;

// =============================================================================
// Results Streaming Defaults
// =============================================================================

/// Capacity of the buffered reader sitting between the transport and the
/// results decoder. Bounds decoder memory independent of result-set size.
pub const DEFAULT_RESULTS_CHUNK_SIZE: usize = 8 * 1024;

/// Default page size for paginated results retrieval.
pub const DEFAULT_RESULTS_PAGE_SIZE: u64 = 100;
