//! Job lifecycle endpoints: create, fetch, list, and control.

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::endpoints::{
    encode_path_segment, extract_entry_content, normalize_search, redact_query, send_once,
    send_request_with_retry,
};
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{CreateJobOptions, JobAction, JobContent};

/// Submit a new search job and return its sid.
///
/// The caller is responsible for rejecting oneshot execution beforehand.
pub async fn create_job(
    client: &Client,
    jobs_url: &str,
    auth: &HeaderValue,
    query: &str,
    options: &CreateJobOptions,
    metrics: Option<&MetricsCollector>,
) -> Result<String> {
    debug!(query = %redact_query(query), "Creating search job");

    let mut form: Vec<(String, String)> = vec![
        ("search".to_string(), normalize_search(query)),
        ("output_mode".to_string(), "json".to_string()),
    ];
    if let Some(mode) = options.exec_mode {
        form.push(("exec_mode".to_string(), mode.to_string()));
    } else if let Some(mode) = options.extra_exec_mode() {
        form.push(("exec_mode".to_string(), mode.to_string()));
    }
    form.extend(options.form_params());

    for (key, value) in &form {
        if key != "search" {
            debug!("  {}: {}", key, value);
        }
    }

    let builder = client
        .post(jobs_url)
        .header(AUTHORIZATION, auth.clone())
        .form(&form);
    let response = send_once(builder, "/search/jobs", "POST", metrics)
        .await
        .map_err(ClientError::for_search)?;

    let resp: Value = response.json().await?;

    // Splunk returns either `{"sid": ...}` or `{"entry": [{"content": {"sid": ...}}]}`
    // depending on version and output mode.
    let sid = resp
        .get("sid")
        .and_then(Value::as_str)
        .or_else(|| {
            extract_entry_content(&resp)
                .ok()
                .and_then(|c| c.get("sid"))
                .and_then(Value::as_str)
        })
        .ok_or_else(|| ClientError::InvalidResponse("Missing sid in response".to_string()))?;

    debug!(sid, "Search job created");
    Ok(sid.to_string())
}

/// Fetch the current snapshot of one job.
pub async fn get_job(
    client: &Client,
    jobs_url: &str,
    auth: &HeaderValue,
    sid: &str,
    max_retries: usize,
    metrics: Option<&MetricsCollector>,
) -> Result<JobContent> {
    let url = format!("{}/{}", jobs_url, encode_path_segment(sid));

    let builder = client
        .get(&url)
        .header(AUTHORIZATION, auth.clone())
        .query(&[("output_mode", "json")]);
    let response = send_request_with_retry(builder, max_retries, "/search/jobs/{sid}", "GET", metrics)
        .await
        .map_err(|e| e.for_job(sid))?;

    let resp: Value = response.json().await?;
    JobContent::from_json(extract_entry_content(&resp)?)
}

/// Whether the service still knows about `sid`.
pub async fn job_exists(
    client: &Client,
    jobs_url: &str,
    auth: &HeaderValue,
    sid: &str,
    max_retries: usize,
    metrics: Option<&MetricsCollector>,
) -> Result<bool> {
    match get_job(client, jobs_url, auth, sid, max_retries, metrics).await {
        Ok(_) => Ok(true),
        Err(ClientError::JobNotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// List jobs visible to the session.
///
/// `count == 0` asks the service for every job.
pub async fn list_jobs(
    client: &Client,
    jobs_url: &str,
    auth: &HeaderValue,
    count: u64,
    offset: u64,
    max_retries: usize,
    metrics: Option<&MetricsCollector>,
) -> Result<Vec<JobContent>> {
    let builder = client
        .get(jobs_url)
        .header(AUTHORIZATION, auth.clone())
        .query(&[
            ("output_mode", "json".to_string()),
            ("count", count.to_string()),
            ("offset", offset.to_string()),
        ]);
    let response =
        send_request_with_retry(builder, max_retries, "/search/jobs", "GET", metrics).await?;

    let resp: Value = response.json().await?;
    let entries = resp
        .get("entry")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::InvalidResponse("Missing entry array".to_string()))?;

    entries
        .iter()
        .map(|entry| {
            let mut content = entry.get("content").cloned().ok_or_else(|| {
                ClientError::InvalidResponse("Job entry without content".to_string())
            })?;
            // Older servers only carry the sid as the entry name.
            if let (Some(object), Some(name)) = (content.as_object_mut(), entry.get("name"))
                && !object.contains_key("sid")
            {
                object.insert("sid".to_string(), name.clone());
            }
            JobContent::from_json(&content)
        })
        .collect()
}

/// Issue a control action against one job.
pub async fn control_job(
    client: &Client,
    jobs_url: &str,
    auth: &HeaderValue,
    sid: &str,
    action: JobAction,
    metrics: Option<&MetricsCollector>,
) -> Result<()> {
    debug!(sid, %action, "Sending job control action");

    let url = format!("{}/{}/control", jobs_url, encode_path_segment(sid));
    let mut form = action.form_params();
    form.push(("output_mode", "json".to_string()));

    let builder = client
        .post(&url)
        .header(AUTHORIZATION, auth.clone())
        .form(&form);
    send_once(builder, "/search/jobs/{sid}/control", "POST", metrics)
        .await
        .map_err(|e| e.for_job(sid))?;

    Ok(())
}
