//! Handle to one remote search job.
//!
//! Responsibilities:
//! - Refresh the job's snapshot from the service.
//! - Send control actions (cancel, pause, ttl, priority, preview, finalize, touch).
//! - Open result, preview, and event streams, enforcing result readiness.
//!
//! Does NOT handle:
//! - Creating jobs or checking collection membership (see [`crate::jobs`]).
//!
//! Invariants:
//! - Snapshots are never mutated; `refresh` swaps in a new `Arc<JobContent>`.
//! - Control actions are sent once. The service applies them asynchronously, so
//!   the next refresh may still show the old state; use [`crate::poll`] to wait.

use std::sync::Arc;
use std::time::Duration;

use splunk_jobs_config::constants::MAX_JOB_PRIORITY;
use tracing::{debug, info};

use crate::endpoints::{self, ResultsKind};
use crate::error::{ClientError, Result};
use crate::models::{JobAction, JobContent, ResultsParams};
use crate::poll::{self, PollSettings};
use crate::reader::ResultsStream;
use crate::session::Session;

/// A search job identified by its sid.
#[derive(Debug, Clone)]
pub struct Job {
    session: Session,
    sid: String,
    content: Arc<JobContent>,
}

impl Job {
    /// Handle for `sid` with an initial snapshot.
    pub fn new(session: Session, sid: impl Into<String>, content: JobContent) -> Self {
        Self {
            session,
            sid: sid.into(),
            content: Arc::new(content),
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The most recent snapshot.
    pub fn content(&self) -> &JobContent {
        &self.content
    }

    /// Shared handle to the most recent snapshot, unaffected by later refreshes.
    pub fn snapshot(&self) -> Arc<JobContent> {
        Arc::clone(&self.content)
    }

    /// Raw property from the most recent snapshot.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.content.get(key)
    }

    /// Fetch a new snapshot from the service.
    ///
    /// Fails with [`ClientError::JobNotFound`] once the job is gone.
    pub async fn refresh(&mut self) -> Result<&mut Self> {
        let content = endpoints::get_job(
            self.session.http(),
            self.session.jobs_url(),
            self.session.authorization(),
            &self.sid,
            self.session.max_retries(),
            self.session.metrics(),
        )
        .await?;
        self.content = Arc::new(content);
        Ok(self)
    }

    /// Refresh and report whether the job is done (or failed).
    pub async fn is_done(&mut self) -> Result<bool> {
        Ok(self.refresh().await?.content.is_terminal())
    }

    /// Send one control action.
    pub async fn control(&self, action: JobAction) -> Result<()> {
        if let JobAction::SetPriority(priority) = action
            && priority > MAX_JOB_PRIORITY
        {
            return Err(ClientError::Validation {
                field: "priority".to_string(),
                message: format!("{priority} is outside 0-{MAX_JOB_PRIORITY}"),
            });
        }

        endpoints::control_job(
            self.session.http(),
            self.session.jobs_url(),
            self.session.authorization(),
            &self.sid,
            action,
            self.session.metrics(),
        )
        .await
    }

    /// Delete the job. Cancelling a job that is already gone fails with
    /// [`ClientError::JobNotFound`].
    pub async fn cancel(&self) -> Result<()> {
        self.control(JobAction::Cancel).await?;
        info!(sid = %self.sid, "Search job cancelled");
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        self.control(JobAction::Pause).await
    }

    pub async fn unpause(&self) -> Result<()> {
        self.control(JobAction::Unpause).await
    }

    /// Stop accumulating results and move to done. Does not wait.
    pub async fn finalize(&self) -> Result<()> {
        self.control(JobAction::Finalize).await
    }

    /// Reset the inactivity expiry clock.
    pub async fn touch(&self) -> Result<()> {
        self.control(JobAction::Touch).await
    }

    pub async fn enable_preview(&self) -> Result<()> {
        self.control(JobAction::EnablePreview).await
    }

    pub async fn disable_preview(&self) -> Result<()> {
        self.control(JobAction::DisablePreview).await
    }

    /// Set the inactivity time-to-live in seconds.
    pub async fn set_ttl(&self, seconds: u64) -> Result<()> {
        self.control(JobAction::SetTtl(seconds)).await
    }

    /// Set the scheduling priority (0-10).
    pub async fn set_priority(&self, priority: u8) -> Result<()> {
        self.control(JobAction::SetPriority(priority)).await
    }

    /// Stream the job's final results.
    ///
    /// - `timeout` of `None` or zero: the job must already be done (or failed),
    ///   otherwise [`ClientError::JobNotDone`].
    /// - a positive `timeout`: wait for completion first, failing with
    ///   [`ClientError::OperationTimeout`] if the deadline passes.
    pub async fn results(
        &mut self,
        timeout: Option<Duration>,
        params: &ResultsParams,
    ) -> Result<ResultsStream> {
        match timeout.filter(|t| !t.is_zero()) {
            None => {
                if !self.is_done().await? {
                    debug!(sid = %self.sid, "Results requested before completion");
                    return Err(ClientError::JobNotDone {
                        sid: self.sid.clone(),
                    });
                }
            }
            Some(timeout) => {
                let settings = PollSettings {
                    timeout,
                    ..self.session.poll_settings()
                };
                poll::wait_until(self, &settings, "results", JobContent::is_terminal).await?;
            }
        }

        self.open(ResultsKind::Results, params).await
    }

    /// Stream whatever results exist right now, done or not.
    pub async fn results_preview(&self, params: &ResultsParams) -> Result<ResultsStream> {
        self.open(ResultsKind::Preview, params).await
    }

    /// Stream the job's untransformed events, done or not.
    pub async fn events(&self, params: &ResultsParams) -> Result<ResultsStream> {
        self.open(ResultsKind::Events, params).await
    }

    async fn open(&self, kind: ResultsKind, params: &ResultsParams) -> Result<ResultsStream> {
        endpoints::open_results(
            self.session.http(),
            self.session.jobs_url(),
            self.session.authorization(),
            &self.sid,
            kind,
            params,
            self.session.max_retries(),
            self.session.metrics(),
        )
        .await
    }
}
