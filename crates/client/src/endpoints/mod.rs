//! REST endpoint implementations for search jobs.
//!
//! Each function issues one logical call against the jobs collection at
//! `jobs_url` (either `/services/search/jobs` or a `servicesNS` variant) and
//! translates the response. Higher-level behaviour such as waiting and result
//! readiness lives in [`crate::job`] and [`crate::jobs`].

mod jobs;
mod request;
mod results;
pub mod url_encoding;

pub use jobs::{control_job, create_job, get_job, job_exists, list_jobs};
pub use request::{send_once, send_request_with_retry};
pub use results::{ResultsKind, export, oneshot, open_results};
pub use url_encoding::encode_path_segment;

use serde_json::Value;

use crate::error::{ClientError, Result};

/// The `content` object of the first entry in an Atom-style JSON document.
pub(crate) fn extract_entry_content(resp: &Value) -> Result<&Value> {
    resp.get("entry")
        .and_then(|e| e.as_array())
        .and_then(|a| a.first())
        .and_then(|e| e.get("content"))
        .ok_or_else(|| ClientError::InvalidResponse("Missing entry content".to_string()))
}

/// Prefix a bare query with the implicit `search` command.
///
/// The jobs endpoints require the query to start with a generating command;
/// interactive users usually omit the leading `search`.
pub(crate) fn normalize_search(query: &str) -> String {
    let trimmed = query.trim_start();
    if trimmed.starts_with('|')
        || trimmed == "search"
        || trimmed.starts_with("search ")
        || trimmed.starts_with("search\t")
        || trimmed.starts_with("search\n")
    {
        query.to_string()
    } else {
        format!("search {query}")
    }
}

/// Render a query for logs without leaking its contents.
pub(crate) fn redact_query(query: &str) -> String {
    let command = query
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '|')
        .find(|s| !s.is_empty())
        .unwrap_or("");
    format!("{command} ... ({} chars)", query.len())
}
