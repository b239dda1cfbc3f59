//! Waiting for a job's remote state to converge.
//!
//! Every wait repeats *refresh, test, sleep* until its condition holds or the
//! deadline passes. The deadline covers the whole wait, including a refresh
//! that is still in flight, and is measured on tokio's monotonic clock.
//!
//! Only "property absent" or "value differs" count as *not yet*. Any error
//! from a refresh ends the wait and is returned as-is.

use std::future::Future;
use std::time::Duration;

use splunk_jobs_config::PollConfig;
use splunk_jobs_config::constants::{DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_MS};
use tracing::{debug, trace};

use crate::error::{ClientError, Result};
use crate::job::Job;
use crate::jobs::Jobs;
use crate::models::JobContent;

/// Poll cadence and overall deadline for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Sleep between refreshes.
    pub interval: Duration,
    /// Deadline for the whole wait.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
        }
    }
}

impl From<&PollConfig> for PollSettings {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: config.interval,
            timeout: config.max_wait,
        }
    }
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Run `wait` under the deadline of `settings`, naming `operation` in the timeout error.
async fn with_deadline<F>(operation: &'static str, settings: &PollSettings, wait: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match tokio::time::timeout(settings.timeout, wait).await {
        Ok(result) => result,
        Err(_) => {
            debug!(operation, timeout = ?settings.timeout, "Wait deadline exceeded");
            Err(ClientError::OperationTimeout {
                operation,
                timeout: settings.timeout,
            })
        }
    }
}

/// Refresh `job` until `predicate` holds for its snapshot.
///
/// The predicate sees each fresh snapshot exactly once and should not keep
/// state between calls.
pub async fn wait_until<P>(
    job: &mut Job,
    settings: &PollSettings,
    operation: &'static str,
    mut predicate: P,
) -> Result<()>
where
    P: FnMut(&JobContent) -> bool,
{
    let interval = settings.interval;
    let sid = job.sid().to_string();

    let wait = async {
        let mut ticks: u64 = 0;
        loop {
            job.refresh().await?;
            ticks += 1;
            if let Some(metrics) = job.session().metrics() {
                metrics.record_poll(operation);
            }
            if predicate(job.content()) {
                trace!(sid = %sid, operation, ticks, "Wait condition satisfied");
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    };

    with_deadline(operation, settings, wait).await
}

/// Wait until every `(property, value)` pair matches the job's snapshot exactly.
pub async fn wait_for_properties(
    job: &mut Job,
    expected: &[(&str, &str)],
    settings: &PollSettings,
) -> Result<()> {
    let result = wait_until(job, settings, "wait_for_properties", |content| {
        content.matches(expected)
    })
    .await;

    if result.as_ref().is_err_and(ClientError::is_timeout) {
        debug!(
            sid = job.sid(),
            unmatched = ?job.content().mismatches(expected),
            "Properties did not converge"
        );
    }
    result
}

/// Wait until the job is done or failed.
pub async fn wait_for_done(job: &mut Job, settings: &PollSettings) -> Result<()> {
    wait_until(job, settings, "wait_for_done", JobContent::is_terminal).await
}

/// Like [`wait_for_done`], reporting `doneProgress` (0.0 to 1.0) after every refresh.
pub async fn wait_for_done_with_progress<F>(
    job: &mut Job,
    settings: &PollSettings,
    mut on_progress: F,
) -> Result<()>
where
    F: FnMut(f64),
{
    wait_until(job, settings, "wait_for_done", |content| {
        on_progress(content.done_progress().unwrap_or(0.0).clamp(0.0, 1.0));
        content.is_terminal()
    })
    .await
}

/// Wait until `sid` is no longer a member of `jobs`, e.g. after a cancel.
pub async fn wait_for_absence(jobs: &Jobs, sid: &str, settings: &PollSettings) -> Result<()> {
    let interval = settings.interval;
    let wait = async {
        loop {
            if let Some(metrics) = jobs.session().metrics() {
                metrics.record_poll("wait_for_absence");
            }
            if !jobs.contains(sid).await? {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    };

    with_deadline("wait_for_absence", settings, wait).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_poll_config() {
        let config = PollConfig {
            interval: Duration::from_millis(20),
            max_wait: Duration::from_secs(9),
        };
        let settings = PollSettings::from(&config);
        assert_eq!(settings.interval, Duration::from_millis(20));
        assert_eq!(settings.timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_builders() {
        let settings = PollSettings::default()
            .with_interval(Duration::from_millis(5))
            .with_timeout(Duration::from_secs(1));
        assert_eq!(settings, PollSettings::new(Duration::from_millis(5), Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out_on_monotonic_clock() {
        let settings = PollSettings::new(Duration::from_millis(10), Duration::from_secs(3));
        let started = tokio::time::Instant::now();
        let err = with_deadline("test", &settings, std::future::pending::<Result<()>>())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::OperationTimeout { operation: "test", timeout } if timeout == Duration::from_secs(3)
        ));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3100));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_through_errors() {
        let settings = PollSettings::default();
        let err = with_deadline("test", &settings, async {
            Err(ClientError::JobNotFound {
                sid: "gone".to_string(),
            })
        })
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }
}
