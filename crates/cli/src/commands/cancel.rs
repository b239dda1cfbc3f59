//! Cancel command.

use anyhow::{Context, Result};
use splunk_jobs::{Session, poll};
use tracing::info;

pub async fn run(session: &Session, sid: &str, wait: bool) -> Result<()> {
    let jobs = session.jobs();
    let job = splunk_jobs::Job::new(session.clone(), sid, Default::default());
    job.cancel()
        .await
        .with_context(|| format!("failed to cancel job {sid}"))?;

    if wait {
        poll::wait_for_absence(&jobs, sid, &session.poll_settings()).await?;
        info!(sid, "Job removed");
    }
    Ok(())
}
