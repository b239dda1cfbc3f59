//! The search-job collection: create, run oneshot/export searches, and look up jobs.

use tracing::{debug, info};

use crate::endpoints;
use crate::error::{ClientError, Result};
use crate::job::Job;
use crate::models::{CreateJobOptions, JobContent};
use crate::reader::ResultsStream;
use crate::session::Session;

/// Search jobs reachable through one session.
#[derive(Debug, Clone)]
pub struct Jobs {
    session: Session,
}

impl Jobs {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Submit an asynchronous search and return its handle.
    ///
    /// The handle's snapshot only holds the assigned `sid` until the first refresh.
    /// Oneshot execution is rejected here, before anything is sent: use
    /// [`Jobs::oneshot`], which returns results instead of a job.
    pub async fn create(&self, query: &str, options: &CreateJobOptions) -> Result<Job> {
        validate_query(query)?;
        if options.requests_oneshot() {
            return Err(ClientError::Validation {
                field: "exec_mode".to_string(),
                message: "oneshot searches return results directly; use Jobs::oneshot"
                    .to_string(),
            });
        }

        let sid = endpoints::create_job(
            self.session.http(),
            self.session.jobs_url(),
            self.session.authorization(),
            query,
            options,
            self.session.metrics(),
        )
        .await?;

        info!(sid = %sid, "Search job submitted");
        let content = JobContent::from_iter([("sid", sid.as_str())]);
        Ok(Job::new(self.session.clone(), sid, content))
    }

    /// Run a search to completion on the server and stream its results.
    ///
    /// Any `exec_mode` in `options` is ignored.
    pub async fn oneshot(&self, query: &str, options: &CreateJobOptions) -> Result<ResultsStream> {
        validate_query(query)?;
        endpoints::oneshot(
            self.session.http(),
            self.session.jobs_url(),
            self.session.authorization(),
            query,
            options,
            self.session.metrics(),
        )
        .await
    }

    /// Run a search through the export endpoint. The stream carries preview
    /// blocks followed by the final results.
    pub async fn export(&self, query: &str, options: &CreateJobOptions) -> Result<ResultsStream> {
        validate_query(query)?;
        endpoints::export(
            self.session.http(),
            self.session.jobs_url(),
            self.session.authorization(),
            query,
            options,
            self.session.metrics(),
        )
        .await
    }

    /// Whether the service currently knows `sid`.
    ///
    /// Membership is eventually consistent: a freshly cancelled job can remain
    /// visible for a while (see [`crate::poll::wait_for_absence`]).
    pub async fn contains(&self, sid: &str) -> Result<bool> {
        let present = endpoints::job_exists(
            self.session.http(),
            self.session.jobs_url(),
            self.session.authorization(),
            sid,
            self.session.max_retries(),
            self.session.metrics(),
        )
        .await?;
        debug!(sid, present, "Checked job membership");
        Ok(present)
    }

    /// Handle to an existing job, refreshed once.
    pub async fn get(&self, sid: &str) -> Result<Job> {
        let mut job = Job::new(self.session.clone(), sid, JobContent::default());
        job.refresh().await?;
        Ok(job)
    }

    /// Jobs visible to the session, newest first. `count == 0` lists all.
    pub async fn list(&self, count: u64) -> Result<Vec<Job>> {
        let contents = endpoints::list_jobs(
            self.session.http(),
            self.session.jobs_url(),
            self.session.authorization(),
            count,
            0,
            self.session.max_retries(),
            self.session.metrics(),
        )
        .await?;

        Ok(contents
            .into_iter()
            .filter_map(|content| {
                let sid = content.sid()?.to_string();
                Some(Job::new(self.session.clone(), sid, content))
            })
            .collect())
    }
}

fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(ClientError::Validation {
            field: "search".to_string(),
            message: "search string must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert!(validate_query("search *").is_ok());
        assert!(matches!(
            validate_query("   "),
            Err(ClientError::Validation { field, .. }) if field == "search"
        ));
    }
}
