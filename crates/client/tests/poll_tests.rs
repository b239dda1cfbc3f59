//! Convergence tests for job-state waits.
//!
//! The service applies control actions asynchronously, so these tests serve
//! stale snapshots first and check that waits keep refreshing until the new
//! state shows up, time out on schedule, or stop on a refresh error.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use common::*;
use serde_json::json;
use splunk_jobs::poll;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Request, Respond};

const SID: &str = "1700000000.42";

/// Serve `stale` for the first `stale_count` refreshes, then `fresh`.
async fn mount_converging(
    server: &MockServer,
    stale: serde_json::Value,
    stale_count: u64,
    fresh: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(job_response(stale))
        .up_to_n_times(stale_count)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(job_response(fresh))
        .mount(server)
        .await;
}

/// Serves job documents in order, repeating the last one once exhausted.
struct SnapshotSequence {
    documents: Vec<serde_json::Value>,
    served: AtomicUsize,
}

impl SnapshotSequence {
    fn new(documents: Vec<serde_json::Value>) -> Self {
        Self {
            documents,
            served: AtomicUsize::new(0),
        }
    }
}

impl Respond for SnapshotSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.served.fetch_add(1, Ordering::SeqCst);
        job_response(self.documents[index.min(self.documents.len() - 1)].clone())
    }
}

async fn mount_control(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{}/control", job_path(SID))))
        .and(body_string_contains(body))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

async fn refresh_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count()
}

#[tokio::test]
async fn test_priority_change_converges() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/control", job_path(SID))))
        .and(body_string_contains("priority=9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_converging(
        &mock_server,
        JobDocumentBuilder::new(SID).build(),
        2,
        JobDocumentBuilder::new(SID).with("priority", json!(9)).build(),
    )
    .await;

    let mut job = job_handle(&session(&mock_server), SID);
    job.set_priority(9).await.unwrap();
    poll::wait_for_properties(&mut job, &[("priority", "9")], &fast_poll(Duration::from_secs(2)))
        .await
        .unwrap();

    assert_eq!(job.get("priority"), Some("9"));
    assert_eq!(job.content().priority(), Some(9));
    assert_eq!(refresh_count(&mock_server).await, 3);
}

#[tokio::test]
async fn test_control_sequence_converges_on_every_property() {
    let mock_server = MockServer::start().await;

    for body in [
        "action=disablepreview",
        "action=pause",
        "action=setttl",
        "action=setpriority",
        "action=enablepreview",
        "action=unpause",
        "action=finalize",
    ] {
        mount_control(&mock_server, body).await;
    }

    let initial = JobDocumentBuilder::new(SID).with("priority", json!(3));
    let partial = JobDocumentBuilder::new(SID)
        .with("priority", json!(3))
        .with("isPreviewEnabled", json!(false))
        .with("isPaused", json!(true));
    let adjusted = JobDocumentBuilder::new(SID)
        .with("isPreviewEnabled", json!(false))
        .with("isPaused", json!(true))
        .with("ttl", json!(1000))
        .with("priority", json!(5));
    let finalized = JobDocumentBuilder::new(SID)
        .with("ttl", json!(1000))
        .with("isFinalized", json!(true))
        .done();

    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(SnapshotSequence::new(vec![
            initial.build(),
            partial.build(),
            adjusted.build(),
            adjusted.build(),
            finalized.build(),
        ]))
        .mount(&mock_server)
        .await;

    let mut job = job_handle(&session(&mock_server), SID);
    let settings = fast_poll(Duration::from_secs(2));

    job.disable_preview().await.unwrap();
    job.pause().await.unwrap();
    job.set_ttl(1000).await.unwrap();
    job.set_priority(5).await.unwrap();
    poll::wait_for_properties(
        &mut job,
        &[
            ("isPreviewEnabled", "0"),
            ("isPaused", "1"),
            ("ttl", "1000"),
            ("priority", "5"),
        ],
        &settings,
    )
    .await
    .unwrap();
    assert_eq!(refresh_count(&mock_server).await, 3);
    assert_eq!(job.content().priority(), Some(5));

    job.enable_preview().await.unwrap();
    job.unpause().await.unwrap();
    job.finalize().await.unwrap();
    poll::wait_for_properties(
        &mut job,
        &[("isPreviewEnabled", "1"), ("isPaused", "0"), ("isFinalized", "1")],
        &settings,
    )
    .await
    .unwrap();

    assert_eq!(refresh_count(&mock_server).await, 5);
    assert_eq!(job.get("isFinalized"), Some("1"));
    assert_eq!(job.get("ttl"), Some("1000"));
}

#[tokio::test]
async fn test_zero_event_search_completes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(JOBS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": SID})))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_converging(
        &mock_server,
        JobDocumentBuilder::new(SID).build(),
        2,
        JobDocumentBuilder::new(SID)
            .done()
            .with("eventCount", json!(0))
            .with("resultCount", json!(0))
            .build(),
    )
    .await;

    let mut job = session(&mock_server)
        .jobs()
        .create("index=_internal | head 0", &CreateJobOptions::default())
        .await
        .unwrap();
    poll::wait_for_done(&mut job, &fast_poll(Duration::from_secs(2)))
        .await
        .unwrap();

    assert_eq!(job.get("isDone"), Some("1"));
    assert_eq!(job.get("eventCount"), Some("0"));
    assert_eq!(job.get("resultCount"), Some("0"));
}

#[tokio::test]
async fn test_absent_property_is_not_yet() {
    let mock_server = MockServer::start().await;

    mount_converging(
        &mock_server,
        JobDocumentBuilder::new(SID).build(),
        1,
        JobDocumentBuilder::new(SID).with("label", json!("nightly")).build(),
    )
    .await;

    let mut job = job_handle(&session(&mock_server), SID);
    poll::wait_for_properties(
        &mut job,
        &[("label", "nightly"), ("isDone", "0")],
        &fast_poll(Duration::from_secs(2)),
    )
    .await
    .unwrap();
    assert_eq!(refresh_count(&mock_server).await, 2);
}

#[tokio::test]
async fn test_properties_time_out_with_last_snapshot() {
    let mock_server = MockServer::start().await;
    mount_job_forever(&mock_server).await;

    let mut job = job_handle(&session(&mock_server), SID);
    let started = Instant::now();
    let err = poll::wait_for_properties(
        &mut job,
        &[("isPaused", "1")],
        &fast_poll(Duration::from_millis(150)),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ClientError::OperationTimeout {
            operation: "wait_for_properties",
            timeout
        } if timeout == Duration::from_millis(150)
    ));
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(job.get("isPaused"), Some("0"));
}

#[tokio::test]
async fn test_refresh_error_ends_wait() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut job = job_handle(&session(&mock_server), SID);
    let err = poll::wait_for_done(&mut job, &fast_poll(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_done_with_progress_reports_each_tick() {
    let mock_server = MockServer::start().await;
    mount_converging(
        &mock_server,
        JobDocumentBuilder::new(SID).with("doneProgress", json!(0.4)).build(),
        2,
        JobDocumentBuilder::new(SID).done().build(),
    )
    .await;

    let mut job = job_handle(&session(&mock_server), SID);
    let mut seen = Vec::new();
    poll::wait_for_done_with_progress(&mut job, &fast_poll(Duration::from_secs(2)), |p| {
        seen.push(p)
    })
    .await
    .unwrap();

    assert_eq!(seen, vec![0.4, 0.4, 1.0]);
    assert!(job.content().is_done());
}

#[tokio::test]
async fn test_cancel_then_wait_for_absence() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/control", job_path(SID))))
        .and(body_string_contains("action=cancel"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(job_response(JobDocumentBuilder::new(SID).build()))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let session = session(&mock_server);
    let jobs = session.jobs();
    job_handle(&session, SID).cancel().await.unwrap();

    poll::wait_for_absence(&jobs, SID, &fast_poll(Duration::from_secs(2)))
        .await
        .unwrap();
    assert!(!jobs.contains(SID).await.unwrap());
}

#[tokio::test]
async fn test_absence_times_out_while_job_lingers() {
    let mock_server = MockServer::start().await;
    mount_job_forever(&mock_server).await;

    let jobs = session(&mock_server).jobs();
    let err = poll::wait_for_absence(&jobs, SID, &fast_poll(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::OperationTimeout {
            operation: "wait_for_absence",
            ..
        }
    ));
}

async fn mount_job_forever(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(job_response(JobDocumentBuilder::new(SID).build()))
        .mount(server)
        .await;
}
