//! Oneshot command: run a search synchronously and print its results.

use std::io::Write;

use anyhow::{Context, Result};
use splunk_jobs::{CreateJobOptions, Session};
use tracing::info;

use super::write_records;

pub async fn run<W: Write>(
    session: &Session,
    query: &str,
    options: CreateJobOptions,
    count: Option<u64>,
    out: &mut W,
) -> Result<()> {
    let options = match count {
        Some(count) => options.option("count", count.to_string()),
        None => options,
    };

    let mut results = session
        .jobs()
        .oneshot(query, &options)
        .await
        .context("oneshot search failed")?;
    let rows = write_records(&mut results, out, 0).await?;
    info!(rows, preview = results.is_preview(), "Oneshot results written");
    Ok(())
}
