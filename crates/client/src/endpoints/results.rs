//! Result-producing endpoints. Every response is handed to the streaming
//! decoder instead of being buffered.

use std::io;

use futures::{StreamExt, TryStreamExt};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, Response};
use tokio::io::BufReader;
use tokio_util::io::StreamReader;
use tracing::debug;

use splunk_jobs_config::constants::DEFAULT_RESULTS_CHUNK_SIZE;

use crate::endpoints::{encode_path_segment, normalize_search, redact_query, send_once, send_request_with_retry};
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{CreateJobOptions, ResultsParams};
use crate::reader::{ResultsReader, ResultsStream};

/// Which per-job collection to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsKind {
    /// Final transformed results.
    Results,
    /// Whatever the job has produced so far.
    Preview,
    /// Untransformed events.
    Events,
}

impl ResultsKind {
    fn path(&self) -> &'static str {
        match self {
            Self::Results => "results",
            Self::Preview => "results_preview",
            Self::Events => "events",
        }
    }
}

/// Open a streaming read of a job's results, preview, or events.
#[allow(clippy::too_many_arguments)]
pub async fn open_results(
    client: &Client,
    jobs_url: &str,
    auth: &HeaderValue,
    sid: &str,
    kind: ResultsKind,
    params: &ResultsParams,
    max_retries: usize,
    metrics: Option<&MetricsCollector>,
) -> Result<ResultsStream> {
    let url = format!("{}/{}/{}", jobs_url, encode_path_segment(sid), kind.path());
    let endpoint = match kind {
        ResultsKind::Results => "/search/jobs/{sid}/results",
        ResultsKind::Preview => "/search/jobs/{sid}/results_preview",
        ResultsKind::Events => "/search/jobs/{sid}/events",
    };
    debug!(sid, kind = kind.path(), count = params.count, offset = params.offset, "Opening results stream");

    let builder = client
        .get(&url)
        .header(AUTHORIZATION, auth.clone())
        .query(&params.query_params());
    let response = send_request_with_retry(builder, max_retries, endpoint, "GET", metrics)
        .await
        .map_err(|e| e.for_job(sid))?;

    into_results_stream(response, metrics).await
}

/// Run a search synchronously and stream its results back.
pub async fn oneshot(
    client: &Client,
    jobs_url: &str,
    auth: &HeaderValue,
    query: &str,
    options: &CreateJobOptions,
    metrics: Option<&MetricsCollector>,
) -> Result<ResultsStream> {
    debug!(query = %redact_query(query), "Running oneshot search");

    let mut form = search_form(query, options);
    form.push(("exec_mode".to_string(), "oneshot".to_string()));
    if !options.extra.iter().any(|(k, _)| k == "count") {
        form.push(("count".to_string(), "0".to_string()));
    }

    let builder = client
        .post(jobs_url)
        .header(AUTHORIZATION, auth.clone())
        .form(&form);
    let response = send_once(builder, "/search/jobs", "POST", metrics)
        .await
        .map_err(ClientError::for_search)?;

    into_results_stream(response, metrics).await
}

/// Run a search through the export endpoint, streaming previews and final results.
pub async fn export(
    client: &Client,
    jobs_url: &str,
    auth: &HeaderValue,
    query: &str,
    options: &CreateJobOptions,
    metrics: Option<&MetricsCollector>,
) -> Result<ResultsStream> {
    debug!(query = %redact_query(query), "Running export search");

    let url = format!("{jobs_url}/export");
    let form = search_form(query, options);

    let builder = client
        .post(&url)
        .header(AUTHORIZATION, auth.clone())
        .form(&form);
    let response = send_once(builder, "/search/jobs/export", "POST", metrics)
        .await
        .map_err(ClientError::for_search)?;

    into_results_stream(response, metrics).await
}

fn search_form(query: &str, options: &CreateJobOptions) -> Vec<(String, String)> {
    let mut form = vec![
        ("search".to_string(), normalize_search(query)),
        ("output_mode".to_string(), "xml".to_string()),
    ];
    form.extend(options.form_params());
    form
}

/// Wrap a response body in the decoder.
///
/// The body is read through a buffer of `DEFAULT_RESULTS_CHUNK_SIZE` bytes;
/// dropping the returned stream releases the connection.
async fn into_results_stream(
    response: Response,
    metrics: Option<&MetricsCollector>,
) -> Result<ResultsStream> {
    let body = response.bytes_stream().map_err(io::Error::other).boxed();
    let source = BufReader::with_capacity(DEFAULT_RESULTS_CHUNK_SIZE, StreamReader::new(body));
    Ok(ResultsReader::open(source)
        .await?
        .with_metrics(metrics.cloned()))
}
