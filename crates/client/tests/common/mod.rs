//! Shared helpers for the search-job integration tests.
//!
//! # Invariants
//! - Fixtures are loaded from the `fixtures/` directory relative to the crate root
//! - Sessions built here poll every 10ms so waits converge quickly
//!
//! # What this does NOT handle
//! - Mock server setup (use wiremock directly in tests)

use std::time::Duration;

use secrecy::SecretString;
use serde_json::Value;

#[allow(unused_imports)]
pub use splunk_jobs::testing::generators::{JobDocumentBuilder, ResultsXmlGenerator};
#[allow(unused_imports)]
pub use splunk_jobs::testing::{load_fixture, load_fixture_text};
#[allow(unused_imports)]
pub use splunk_jobs::{ClientError, CreateJobOptions, ExecMode, Job, PollSettings, ResultsParams, Session};
#[allow(unused_imports)]
pub use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub const JOBS_PATH: &str = "/services/search/jobs";

/// Poll settings used by tests: fast cadence, short deadline.
#[allow(dead_code)]
pub fn fast_poll(timeout: Duration) -> PollSettings {
    PollSettings::new(Duration::from_millis(10), timeout)
}

/// Session against `server` with no retries and fast polling.
#[allow(dead_code)]
pub fn session(server: &MockServer) -> Session {
    session_with_retries(server, 0)
}

#[allow(dead_code)]
pub fn session_with_retries(server: &MockServer, retries: usize) -> Session {
    Session::builder()
        .base_url(server.uri())
        .credentials(splunk_jobs::Credentials::ApiToken(SecretString::new(
            "test-token".to_string().into(),
        )))
        .max_retries(retries)
        .poll_settings(fast_poll(Duration::from_secs(2)))
        .build()
        .expect("session should build")
}

/// Path of one job under the default namespace.
#[allow(dead_code)]
pub fn job_path(sid: &str) -> String {
    format!("{JOBS_PATH}/{sid}")
}

/// A `200 OK` carrying a job document.
#[allow(dead_code)]
pub fn job_response(document: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(document)
}

/// A `200 OK` carrying an XML results body.
#[allow(dead_code)]
pub fn xml_response(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/xml; charset=UTF-8")
        .set_body_string(body.into())
}

/// A handle to `sid` without contacting the server.
#[allow(dead_code)]
pub fn job_handle(session: &Session, sid: &str) -> Job {
    Job::new(
        session.clone(),
        sid,
        splunk_jobs::JobContent::from_iter([("sid", sid)]),
    )
}
