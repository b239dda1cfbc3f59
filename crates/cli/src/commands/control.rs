//! Control command: send one action and optionally wait for it to take effect.

use anyhow::{Context, Result};
use splunk_jobs::{JobAction, Session, poll};
use tracing::info;

pub async fn run(
    session: &Session,
    sid: &str,
    action: JobAction,
    wait_for: &[(String, String)],
) -> Result<()> {
    let mut job = splunk_jobs::Job::new(session.clone(), sid, Default::default());
    job.control(action)
        .await
        .with_context(|| format!("failed to {action} job {sid}"))?;
    info!(sid, %action, "Control action sent");

    if !wait_for.is_empty() {
        let expected: Vec<(&str, &str)> = wait_for
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        poll::wait_for_properties(&mut job, &expected, &session.poll_settings()).await?;
        info!(sid, "Job reached the requested state");
    }
    Ok(())
}
