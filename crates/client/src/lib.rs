//! Client for Splunk search jobs.
//!
//! Submit searches, follow a job's state until it converges, control it
//! (pause, ttl, priority, preview, finalize, cancel), and decode its results
//! incrementally from the service's XML results stream.
//!
//! ```no_run
//! use std::time::Duration;
//! use secrecy::SecretString;
//! use splunk_jobs::{CreateJobOptions, Credentials, ResultsParams, Session};
//!
//! # async fn run() -> splunk_jobs::Result<()> {
//! let session = Session::builder()
//!     .base_url("https://localhost:8089")
//!     .credentials(Credentials::ApiToken(SecretString::new("token".to_string().into())))
//!     .build()?;
//!
//! let mut job = session
//!     .jobs()
//!     .create("search index=_internal | head 5", &CreateJobOptions::default())
//!     .await?;
//! let mut results = job
//!     .results(Some(Duration::from_secs(60)), &ResultsParams::all())
//!     .await?;
//! while let Some(row) = results.next_result().await? {
//!     println!("{:?}", row.get_str("_raw"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod endpoints;
pub mod error;
pub mod job;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod poll;
pub mod reader;
mod serde_helpers;
pub mod session;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use error::{ClientError, Result};
pub use job::Job;
pub use jobs::Jobs;
pub use metrics::{ErrorCategory, MetricsCollector};
pub use models::{
    CreateJobOptions, DispatchState, ExecMode, FieldValue, JobAction, JobContent, Message,
    MessageLevel, RecordKind, ResultRecord, ResultRow, ResultsParams, SearchMode,
};
pub use poll::PollSettings;
pub use reader::{ResultsReader, ResultsStream};
pub use session::{Credentials, Session, SessionBuilder};
