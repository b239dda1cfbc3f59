//! Sending requests and turning failures into [`ClientError`]s.
//!
//! Read requests go through [`send_request_with_retry`], which retries
//! transient failures (HTTP 429/502/503/504, connect and timeout errors) with
//! exponential backoff. Mutating requests go through [`send_once`] and are
//! never retried.

use std::time::{Duration, Instant};

use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;

/// Header Splunk uses to correlate a request with its server-side logs.
const REQUEST_ID_HEADER: &str = "X-Splunk-Request-Id";

/// Splunk's JSON error document.
#[derive(Debug, Deserialize)]
struct SplunkMessages {
    #[serde(default)]
    messages: Vec<SplunkMessage>,
}

#[derive(Debug, Deserialize)]
struct SplunkMessage {
    #[serde(default)]
    text: String,
}

/// Sends a read request, retrying transient failures.
///
/// - Backoff is `2^attempt` seconds (1s, 2s, 4s, ...).
/// - At most `max_retries` retries follow the first attempt.
/// - Exhausted retries yield [`ClientError::MaxRetriesExceeded`] wrapping the last failure.
/// - Other non-success statuses are returned immediately as [`ClientError::ApiError`].
pub async fn send_request_with_retry(
    builder: RequestBuilder,
    max_retries: usize,
    endpoint: &str,
    method: &str,
    metrics: Option<&MetricsCollector>,
) -> Result<Response> {
    let mut attempt = 0usize;
    loop {
        let Some(attempt_builder) = builder.try_clone() else {
            debug!(endpoint, "Request body is not clonable, single attempt only");
            return send_once(builder, endpoint, method, metrics).await;
        };

        if attempt > 0
            && let Some(m) = metrics
        {
            m.record_retry(endpoint, method, attempt);
        }

        let err = match send_once(attempt_builder, endpoint, method, metrics).await {
            Ok(response) => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, endpoint, "Request succeeded after retry");
                }
                return Ok(response);
            }
            Err(e) => e,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt == max_retries {
            debug!(attempts = attempt + 1, endpoint, "Retries exhausted");
            return Err(ClientError::MaxRetriesExceeded(attempt + 1, Box::new(err)));
        }

        let backoff_secs = 2u64.pow(attempt as u32);
        debug!(
            attempt = attempt + 1,
            max_retries = max_retries + 1,
            backoff_secs,
            status = ?err.status(),
            endpoint,
            "Transient failure, retrying with exponential backoff"
        );
        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
        attempt += 1;
    }
}

/// Sends a request exactly once.
pub async fn send_once(
    builder: RequestBuilder,
    endpoint: &str,
    method: &str,
    metrics: Option<&MetricsCollector>,
) -> Result<Response> {
    if let Some(m) = metrics {
        m.record_request(endpoint, method);
    }
    let started = Instant::now();

    let result = match builder.send().await {
        Ok(response) if response.status().is_success() => Ok(response),
        Ok(response) => Err(error_from_response(response).await),
        Err(e) => Err(ClientError::from(e)),
    };

    if let Some(m) = metrics {
        let status = match &result {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => e.status(),
        };
        m.record_request_duration(endpoint, method, started.elapsed(), status);
        if let Err(e) = &result {
            m.record_client_error(endpoint, method, e);
        }
    }

    result
}

/// Build an [`ClientError::ApiError`] from a non-success response.
async fn error_from_response(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response body".to_string());

    ClientError::ApiError {
        status,
        url,
        message: extract_error_message(&body),
        request_id,
    }
}

/// Pull the human-readable diagnostics out of a Splunk error body.
///
/// Understands the JSON (`{"messages":[...]}`) and XML
/// (`<response><messages><msg>`) forms; anything else is returned trimmed.
pub(crate) fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();

    if let Ok(parsed) = serde_json::from_str::<SplunkMessages>(trimmed) {
        let texts = parsed
            .messages
            .into_iter()
            .map(|m| m.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>();
        if !texts.is_empty() {
            return texts.join("; ");
        }
    }

    if trimmed.starts_with('<')
        && let Some(texts) = xml_messages(trimmed)
        && !texts.is_empty()
    {
        return texts.join("; ");
    }

    trimmed.to_string()
}

fn xml_messages(body: &str) -> Option<Vec<String>> {
    let mut reader = Reader::from_str(body);
    let mut texts = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) if e.local_name().as_ref() == b"msg" => current = Some(String::new()),
            Event::Text(t) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&t.unescape().ok()?);
                }
            }
            Event::CData(c) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"msg" => {
                if let Some(text) = current.take() {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        texts.push(text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Some(texts)
}
