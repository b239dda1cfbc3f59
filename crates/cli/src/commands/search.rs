//! Search command: create a job, wait for it, print results, clean up.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use splunk_jobs::{CreateJobOptions, ResultsParams, Session};
use tracing::{info, warn};

use super::write_records;

pub async fn run<W: Write>(
    session: &Session,
    query: &str,
    options: &CreateJobOptions,
    count: u64,
    wait: Duration,
    keep: bool,
    out: &mut W,
) -> Result<()> {
    let mut job = session
        .jobs()
        .create(query, options)
        .await
        .context("failed to create search job")?;
    info!(sid = job.sid(), "Waiting for search job");

    let params = if count > 0 {
        ResultsParams::page(count, 0)
    } else {
        ResultsParams::all()
    };

    let outcome = async {
        let mut results = job.results(Some(wait), &params).await?;
        let rows = write_records(&mut results, out, count).await?;
        info!(sid = job.sid(), rows, "Search results written");
        Ok::<_, anyhow::Error>(())
    }
    .await;

    if !keep && let Err(e) = job.cancel().await {
        warn!(sid = job.sid(), error = %e, "Failed to remove search job");
    }

    outcome.with_context(|| format!("search job {} failed", job.sid()))
}
