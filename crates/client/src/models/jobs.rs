//! Search job models.
//!
//! # What this module handles:
//! - The immutable, string-valued job snapshot and its typed views
//! - Job control actions and their form encoding
//! - Options for creating jobs
//!
//! # What this module does NOT handle:
//! - HTTP transport (see [`crate::endpoints`])
//! - Waiting for state changes (see [`crate::poll`])

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::serde_helpers::{parse_wire_bool, parse_wire_f64, parse_wire_u64, to_wire_string};

/// A job's properties as of one refresh.
///
/// Every value is kept in the service's string form. Lookups never coerce;
/// the typed accessors below are read-only views over the same strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobContent {
    properties: BTreeMap<String, String>,
}

impl JobContent {
    /// Build a snapshot from a job document's `content` object.
    pub fn from_json(content: &Value) -> Result<Self> {
        let object = content.as_object().ok_or_else(|| {
            ClientError::InvalidResponse("job content is not a JSON object".to_string())
        })?;

        Ok(Self {
            properties: object
                .iter()
                .map(|(key, value)| (key.clone(), to_wire_string(value)))
                .collect(),
        })
    }

    /// Raw string value of a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True iff every key is present with exactly the expected string.
    pub fn matches(&self, expected: &[(&str, &str)]) -> bool {
        expected
            .iter()
            .all(|(key, value)| self.get(key) == Some(*value))
    }

    /// Keys from `expected` that are absent or hold a different value.
    pub fn mismatches<'a>(&self, expected: &[(&'a str, &str)]) -> Vec<&'a str> {
        expected
            .iter()
            .filter(|(key, value)| self.get(key) != Some(*value))
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn sid(&self) -> Option<&str> {
        self.get("sid")
    }

    pub fn search(&self) -> Option<&str> {
        self.get("search")
    }

    pub fn is_done(&self) -> bool {
        self.flag("isDone")
    }

    pub fn is_failed(&self) -> bool {
        self.flag("isFailed")
    }

    pub fn is_finalized(&self) -> bool {
        self.flag("isFinalized")
    }

    pub fn is_paused(&self) -> bool {
        self.flag("isPaused")
    }

    pub fn is_preview_enabled(&self) -> bool {
        self.flag("isPreviewEnabled")
    }

    /// Done or failed: no further results will be produced.
    pub fn is_terminal(&self) -> bool {
        self.is_done() || self.is_failed()
    }

    pub fn dispatch_state(&self) -> Option<DispatchState> {
        self.get("dispatchState").map(DispatchState::from_wire)
    }

    /// Completion fraction in `0.0..=1.0`.
    pub fn done_progress(&self) -> Option<f64> {
        self.get("doneProgress").and_then(parse_wire_f64)
    }

    pub fn event_count(&self) -> Option<u64> {
        self.number("eventCount")
    }

    pub fn result_count(&self) -> Option<u64> {
        self.number("resultCount")
    }

    pub fn scan_count(&self) -> Option<u64> {
        self.number("scanCount")
    }

    pub fn ttl(&self) -> Option<u64> {
        self.number("ttl")
    }

    pub fn priority(&self) -> Option<u64> {
        self.number("priority")
    }

    /// Run duration in seconds.
    pub fn run_duration(&self) -> Option<f64> {
        self.get("runDuration").and_then(parse_wire_f64)
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(parse_wire_bool).unwrap_or(false)
    }

    fn number(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(parse_wire_u64)
    }
}

impl<K, V> FromIterator<(K, V)> for JobContent
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Dispatch state reported in `dispatchState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchState {
    Queued,
    Parsing,
    Running,
    Paused,
    Finalizing,
    Failed,
    Done,
    /// A state this client does not know about, kept verbatim.
    Other(String),
}

impl DispatchState {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "QUEUED" => Self::Queued,
            "PARSING" => Self::Parsing,
            "RUNNING" => Self::Running,
            "PAUSED" => Self::Paused,
            "FINALIZING" => Self::Finalizing,
            "FAILED" => Self::Failed,
            "DONE" => Self::Done,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "QUEUED",
            Self::Parsing => "PARSING",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Finalizing => "FINALIZING",
            Self::Failed => "FAILED",
            Self::Done => "DONE",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state-changing request against one job's `control` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Cancel,
    Pause,
    Unpause,
    Finalize,
    /// Reset the inactivity expiry clock.
    Touch,
    EnablePreview,
    DisablePreview,
    /// Set the inactivity time-to-live, in seconds.
    SetTtl(u64),
    /// Set the scheduling priority (0-10).
    SetPriority(u8),
}

impl JobAction {
    /// Value of the `action` form field.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Finalize => "finalize",
            Self::Touch => "touch",
            Self::EnablePreview => "enablepreview",
            Self::DisablePreview => "disablepreview",
            Self::SetTtl(_) => "setttl",
            Self::SetPriority(_) => "setpriority",
        }
    }

    /// Form body sent to the `control` endpoint.
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("action", self.wire_name().to_string())];
        match self {
            Self::SetTtl(ttl) => params.push(("ttl", ttl.to_string())),
            Self::SetPriority(priority) => params.push(("priority", priority.to_string())),
            _ => {}
        }
        params
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Execution mode for a new search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecMode {
    /// Return the sid immediately and run asynchronously.
    #[default]
    Normal,
    /// Return the sid once the job is done.
    Blocking,
    /// Return results inline with no job resource. Only valid for oneshot searches.
    Oneshot,
}

impl ExecMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Blocking => "blocking",
            Self::Oneshot => "oneshot",
        }
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search mode for new jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Normal,
    Realtime,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchMode::Normal => "normal",
            SearchMode::Realtime => "realtime",
        };
        f.write_str(s)
    }
}

/// Options for submitting a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateJobOptions {
    pub exec_mode: Option<ExecMode>,
    /// Earliest time bound (e.g., "-24h").
    pub earliest_time: Option<String>,
    /// Latest time bound (e.g., "now").
    pub latest_time: Option<String>,
    pub max_count: Option<u64>,
    pub status_buckets: Option<u64>,
    /// Inactivity time-to-live in seconds.
    pub ttl: Option<u64>,
    pub search_mode: Option<SearchMode>,
    /// Caller-chosen sid (the service's `id` option).
    pub custom_sid: Option<String>,
    /// Additional service options passed through unchanged.
    pub extra: Vec<(String, String)>,
}

impl CreateJobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exec_mode(mut self, mode: ExecMode) -> Self {
        self.exec_mode = Some(mode);
        self
    }

    pub fn earliest_time(mut self, earliest: impl Into<String>) -> Self {
        self.earliest_time = Some(earliest.into());
        self
    }

    pub fn latest_time(mut self, latest: impl Into<String>) -> Self {
        self.latest_time = Some(latest.into());
        self
    }

    pub fn max_count(mut self, max_count: u64) -> Self {
        self.max_count = Some(max_count);
        self
    }

    /// Number of timeline buckets the job keeps (needed for field summaries).
    pub fn status_buckets(mut self, buckets: u64) -> Self {
        self.status_buckets = Some(buckets);
        self
    }

    pub fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = Some(mode);
        self
    }

    pub fn custom_sid(mut self, sid: impl Into<String>) -> Self {
        self.custom_sid = Some(sid.into());
        self
    }

    /// Add an arbitrary service option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Whether any setting asks for oneshot execution.
    pub fn requests_oneshot(&self) -> bool {
        self.exec_mode == Some(ExecMode::Oneshot)
            || self
                .extra
                .iter()
                .any(|(k, v)| k == "exec_mode" && v.trim().eq_ignore_ascii_case("oneshot"))
    }

    /// Form fields for these options, excluding `search`, `exec_mode` and `output_mode`.
    ///
    /// Blank time bounds are skipped; Splunk answers them with a 400.
    pub(crate) fn form_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(earliest) = self.earliest_time.as_deref()
            && !earliest.trim().is_empty()
        {
            params.push(("earliest_time".to_string(), earliest.to_string()));
        }
        if let Some(latest) = self.latest_time.as_deref()
            && !latest.trim().is_empty()
        {
            params.push(("latest_time".to_string(), latest.to_string()));
        }
        if let Some(max_count) = self.max_count {
            params.push(("max_count".to_string(), max_count.to_string()));
        }
        if let Some(buckets) = self.status_buckets {
            params.push(("status_buckets".to_string(), buckets.to_string()));
        }
        if let Some(ttl) = self.ttl {
            params.push(("timeout".to_string(), ttl.to_string()));
        }
        if let Some(mode) = self.search_mode {
            params.push(("search_mode".to_string(), mode.to_string()));
        }
        if let Some(sid) = &self.custom_sid {
            params.push(("id".to_string(), sid.clone()));
        }
        params.extend(
            self.extra
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "exec_mode" | "search" | "output_mode"))
                .cloned(),
        );
        params
    }

    /// Exec mode requested through `extra`, if any.
    pub(crate) fn extra_exec_mode(&self) -> Option<&str> {
        self.extra
            .iter()
            .rev()
            .find(|(k, _)| k == "exec_mode")
            .map(|(_, v)| v.as_str())
    }
}
