//! Status command: print a job's properties, optionally after it finishes.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use splunk_jobs::{Session, poll};
use tracing::info;

pub async fn run<W: Write>(
    session: &Session,
    sid: &str,
    wait: Option<Duration>,
    out: &mut W,
) -> Result<()> {
    let mut job = session
        .jobs()
        .get(sid)
        .await
        .with_context(|| format!("failed to fetch job {sid}"))?;

    if let Some(timeout) = wait {
        let settings = session.poll_settings().with_timeout(timeout);
        let mut last_reported = -1.0;
        poll::wait_for_done_with_progress(&mut job, &settings, |progress| {
            if progress > last_reported {
                info!(sid, progress = %format!("{:.0}%", progress * 100.0), "Job progress");
                last_reported = progress;
            }
        })
        .await?;
    }

    serde_json::to_writer_pretty(&mut *out, job.content()).context("failed to encode job")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}
