//! Testing utilities for search-job client tests.
//!
//! Fixture loading, document builders, and byte sources that deliver data in
//! chosen chunk sizes. Available when running tests or when the `test-utils`
//! feature is enabled.
//!
//! # Example
//! ```ignore
//! use splunk_jobs::testing::{load_fixture, generators::ResultsXmlGenerator};
//!
//! let job = load_fixture("jobs/get_job_done.json");
//! let xml = ResultsXmlGenerator::new().with_row_count(100).generate();
//! ```

pub mod generators;

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::io::StreamReader;

fn fixture_path(fixture_path: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(fixture_path)
}

/// Load a JSON fixture file from the fixtures directory.
///
/// # Panics
/// - If the fixture file cannot be read
/// - If the file content is not valid JSON
pub fn load_fixture(fixture_path: &str) -> serde_json::Value {
    let content = load_fixture_text(fixture_path);
    serde_json::from_str(&content).expect("Invalid JSON in fixture")
}

/// Load a fixture file verbatim (e.g. an XML results document).
///
/// # Panics
/// If the fixture file cannot be read.
pub fn load_fixture_text(fixture_path: &str) -> String {
    let full_path = self::fixture_path(fixture_path);
    std::fs::read_to_string(&full_path)
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", full_path.display()))
}

/// A buffered source that yields `data` in chunks of at most `chunk_size` bytes,
/// read through a buffer of `buffer_capacity` bytes.
pub fn chunked_source(
    data: impl Into<Vec<u8>>,
    chunk_size: usize,
    buffer_capacity: usize,
) -> impl AsyncBufRead + Unpin {
    let data = data.into();
    let chunks: Vec<io::Result<Bytes>> = data
        .chunks(chunk_size.max(1))
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    BufReader::with_capacity(
        buffer_capacity.max(1),
        StreamReader::new(stream::iter(chunks).boxed()),
    )
}

/// A source that yields `data` and then fails like a dropped connection.
pub fn interrupted_source(data: impl Into<Vec<u8>>) -> impl AsyncBufRead + Unpin {
    let chunks: Vec<io::Result<Bytes>> = vec![
        Ok(Bytes::from(data.into())),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer")),
    ];
    BufReader::new(StreamReader::new(stream::iter(chunks).boxed()))
}
