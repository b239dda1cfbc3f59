//! Results retrieval tests.
//!
//! # Invariants
//! - Final results are only requested once the job is done or failed
//! - Preview and events are readable at any time
//! - Rows stream in service order; truncated tails fail without partial rows

mod common;

use std::time::Duration;

use common::*;
use wiremock::matchers::{method, path, query_param};

const SID: &str = "1700000000.42";

fn results_path(kind: &str) -> String {
    format!("{}/{kind}", job_path(SID))
}

async fn mount_job(server: &MockServer, document: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(job_response(document))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_results_without_timeout_requires_done() {
    let mock_server = MockServer::start().await;
    mount_job(&mock_server, JobDocumentBuilder::new(SID).build()).await;

    Mock::given(method("GET"))
        .and(path(results_path("results")))
        .respond_with(xml_response(load_fixture_text("results/count.xml")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut job = job_handle(&session(&mock_server), SID);

    let err = job.results(None, &ResultsParams::default()).await.unwrap_err();
    assert!(matches!(err, ClientError::JobNotDone { ref sid } if sid == SID));

    let err = job
        .results(Some(Duration::ZERO), &ResultsParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::JobNotDone { .. }));
}

#[tokio::test]
async fn test_results_timeout_when_job_never_finishes() {
    let mock_server = MockServer::start().await;
    mount_job(&mock_server, JobDocumentBuilder::new(SID).build()).await;

    let mut job = job_handle(&session(&mock_server), SID);
    let started = std::time::Instant::now();

    let err = job
        .results(Some(Duration::from_millis(200)), &ResultsParams::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::OperationTimeout { operation: "results", .. }
    ));
    assert!(err.is_timeout());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "deadline fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test]
async fn test_results_wait_for_completion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(job_response(JobDocumentBuilder::new(SID).build()))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    mount_job(&mock_server, JobDocumentBuilder::new(SID).done().build()).await;

    Mock::given(method("GET"))
        .and(path(results_path("results")))
        .and(query_param("output_mode", "xml"))
        .and(query_param("count", "100"))
        .and(query_param("offset", "0"))
        .respond_with(xml_response(load_fixture_text("results/multi_value.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut job = job_handle(&session(&mock_server), SID);
    let mut results = job
        .results(Some(Duration::from_secs(5)), &ResultsParams::default())
        .await
        .unwrap();

    assert!(job.content().is_done());
    assert!(!results.is_preview());
    assert_eq!(results.field_order(), ["host", "sourcetype", "_raw"]);

    let first = results.next_result().await.unwrap().unwrap();
    assert_eq!(first.offset(), Some(0));
    assert_eq!(first.get_str("host"), Some("web-01"));
    let sourcetype = first.get("sourcetype").unwrap();
    assert!(sourcetype.is_multi());
    assert_eq!(sourcetype.values(), ["access_combined", "access_common"]);
    assert_eq!(
        first.get_str("_raw"),
        Some("127.0.0.1 - - \"GET /index.html\" 404 512")
    );

    let second = results.next_result().await.unwrap().unwrap();
    assert_eq!(second.get_str("_raw"), Some("10.0.0.7 - - \"POST /login\" 200 & 88"));
    assert!(results.next_result().await.unwrap().is_none());
    assert_eq!(results.results_read(), 2);
}

#[tokio::test]
async fn test_failed_job_results_are_readable() {
    let mock_server = MockServer::start().await;
    mount_job(&mock_server, JobDocumentBuilder::new(SID).failed().build()).await;

    Mock::given(method("GET"))
        .and(path(results_path("results")))
        .respond_with(xml_response(""))
        .mount(&mock_server)
        .await;

    let mut job = job_handle(&session(&mock_server), SID);
    let mut results = job.results(None, &ResultsParams::all()).await.unwrap();
    assert!(results.next_record().await.unwrap().is_none());
}

#[tokio::test]
async fn test_results_for_missing_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(job_path(SID)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut job = job_handle(&session(&mock_server), SID);
    let err = job
        .results(Some(Duration::from_secs(1)), &ResultsParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::JobNotFound { .. }));
}

#[tokio::test]
async fn test_preview_of_running_job() {
    let mock_server = MockServer::start().await;

    let xml = ResultsXmlGenerator::new()
        .with_preview(true)
        .with_fields(["count"])
        .with_row_count(1)
        .generate();
    Mock::given(method("GET"))
        .and(path(results_path("results_preview")))
        .respond_with(xml_response(xml))
        .expect(1)
        .mount(&mock_server)
        .await;

    let job = job_handle(&session(&mock_server), SID);
    let mut results = job.results_preview(&ResultsParams::default()).await.unwrap();

    assert!(results.is_preview());
    let row = results.next_result().await.unwrap().unwrap();
    assert_eq!(row.get_str("count"), Some("count-0"));
}

#[tokio::test]
async fn test_events_pass_paging_and_fields() {
    let mock_server = MockServer::start().await;

    let xml = ResultsXmlGenerator::new()
        .with_fields(["host"])
        .with_raw()
        .with_row_count(5)
        .generate();
    Mock::given(method("GET"))
        .and(path(results_path("events")))
        .and(query_param("count", "5"))
        .and(query_param("offset", "10"))
        .and(query_param("f", "host"))
        .and(query_param("search", "search host=web*"))
        .respond_with(xml_response(xml))
        .expect(1)
        .mount(&mock_server)
        .await;

    let params = ResultsParams::page(5, 10)
        .fields(["host"])
        .post_process("search host=web*");
    let job = job_handle(&session(&mock_server), SID);
    let records = job.events(&params).await.unwrap().collect().await.unwrap();

    assert_eq!(records.len(), 5);
    let row = records[3].as_result().unwrap();
    assert_eq!(row.get_str("_raw"), Some(ResultsXmlGenerator::raw_value(3).as_str()));

    let next = params.next_page(records.len() as u64).unwrap();
    assert_eq!(next.offset, 15);
}

#[tokio::test]
async fn test_truncated_stream_fails_after_complete_rows() {
    let mock_server = MockServer::start().await;
    mount_job(&mock_server, JobDocumentBuilder::new(SID).done().build()).await;

    Mock::given(method("GET"))
        .and(path(results_path("results")))
        .respond_with(xml_response(load_fixture_text("results/truncated.xml")))
        .mount(&mock_server)
        .await;

    let mut job = job_handle(&session(&mock_server), SID);
    let mut results = job.results(None, &ResultsParams::default()).await.unwrap();

    let first = results.next_result().await.unwrap().unwrap();
    assert_eq!(first.get_str("count"), Some("1"));

    let err = results.next_record().await.unwrap_err();
    match err {
        ClientError::Parse { fragment, .. } => assert_eq!(fragment, "<result offset='1'>"),
        other => panic!("expected Parse, got {other:?}"),
    }
    assert!(results.next_record().await.unwrap().is_none());
}
