//! Explicit service connection shared by the job collection and job handles.
//!
//! Responsibilities:
//! - Own the HTTP client, base URL, credentials, and retry/poll settings.
//! - Resolve the jobs collection path, including an optional owner/app namespace.
//!
//! Does NOT handle:
//! - Logging in or renewing sessions; callers supply a token or session key.
//!
//! Invariants:
//! - The base URL never ends with `/`.
//! - Cloning a `Session` is cheap and every clone talks to the same service.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use splunk_jobs_config::Config;
use splunk_jobs_config::TokenKind;
use splunk_jobs_config::constants::{DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};

use crate::endpoints::encode_path_segment;
use crate::error::{ClientError, Result};
use crate::jobs::Jobs;
use crate::metrics::MetricsCollector;
use crate::poll::PollSettings;

/// How the session authenticates.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Splunk authentication token (`Authorization: Bearer <token>`).
    ApiToken(SecretString),
    /// Session key from a prior login (`Authorization: Splunk <key>`).
    SessionKey(SecretString),
}

impl Credentials {
    fn authorization(&self) -> Result<HeaderValue> {
        let raw = match self {
            Self::ApiToken(token) => format!("Bearer {}", token.expose_secret()),
            Self::SessionKey(key) => format!("Splunk {}", key.expose_secret()),
        };
        let mut value = HeaderValue::from_str(&raw).map_err(|_| {
            ClientError::AuthFailed("credentials contain characters not allowed in a header".to_string())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

struct SessionInner {
    http: Client,
    base_url: String,
    jobs_url: String,
    authorization: HeaderValue,
    uses_api_token: bool,
    max_retries: usize,
    poll: PollSettings,
    metrics: Option<MetricsCollector>,
}

/// Authenticated connection to one search head.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.base_url)
            .field("jobs_url", &self.inner.jobs_url)
            .field("max_retries", &self.inner.max_retries)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// The job collection bound to this session.
    pub fn jobs(&self) -> Jobs {
        Jobs::new(self.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Full URL of the jobs collection.
    pub fn jobs_url(&self) -> &str {
        &self.inner.jobs_url
    }

    pub fn uses_api_token(&self) -> bool {
        self.inner.uses_api_token
    }

    pub fn max_retries(&self) -> usize {
        self.inner.max_retries
    }

    /// Default cadence and deadline for job-state waits.
    pub fn poll_settings(&self) -> PollSettings {
        self.inner.poll
    }

    pub fn metrics(&self) -> Option<&MetricsCollector> {
        self.inner.metrics.as_ref()
    }

    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    pub(crate) fn authorization(&self) -> &HeaderValue {
        &self.inner.authorization
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    base_url: Option<String>,
    credentials: Option<Credentials>,
    skip_verify: bool,
    timeout: Duration,
    max_retries: usize,
    owner: Option<String>,
    app: Option<String>,
    poll: PollSettings,
    metrics: Option<MetricsCollector>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            credentials: None,
            skip_verify: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            owner: None,
            app: None,
            poll: PollSettings::default(),
            metrics: None,
        }
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    /// Connect and per-read timeout. Long result streams are not cut off as
    /// long as data keeps arriving.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Scope job endpoints to `servicesNS/{owner}/{app}`. A missing half becomes `-`.
    pub fn namespace(mut self, owner: Option<String>, app: Option<String>) -> Self {
        self.owner = owner;
        self.app = app;
        self
    }

    pub fn poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn from_config(mut self, config: &Config) -> Self {
        let token = config.auth.token.clone();
        self.credentials = Some(match config.auth.kind {
            TokenKind::ApiToken => Credentials::ApiToken(token),
            TokenKind::SessionKey => Credentials::SessionKey(token),
        });
        self.base_url = Some(config.connection.base_url.clone());
        self.skip_verify = config.connection.skip_verify;
        self.timeout = config.connection.timeout;
        self.max_retries = config.connection.max_retries;
        self.owner = config.namespace.owner.clone();
        self.app = config.namespace.app.clone();
        self.poll = PollSettings::from(&config.poll);
        self
    }

    fn normalize_base_url(url: String) -> String {
        url.trim().trim_end_matches('/').to_string()
    }

    fn jobs_url(base_url: &str, owner: Option<&str>, app: Option<&str>) -> String {
        if owner.is_none() && app.is_none() {
            return format!("{base_url}/services/search/jobs");
        }
        format!(
            "{}/servicesNS/{}/{}/search/jobs",
            base_url,
            encode_path_segment(owner.unwrap_or("-")),
            encode_path_segment(app.unwrap_or("-")),
        )
    }

    pub fn build(self) -> Result<Session> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::InvalidUrl("base_url is required".to_string()))?;
        let base_url = Self::normalize_base_url(base_url);
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ClientError::InvalidUrl(format!(
                "base_url must start with http:// or https://: {base_url}"
            )));
        }

        let credentials = self
            .credentials
            .ok_or_else(|| ClientError::AuthFailed("credentials are required".to_string()))?;
        let authorization = credentials.authorization()?;

        let mut http_builder = reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .read_timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(DEFAULT_MAX_REDIRECTS));

        if self.skip_verify {
            if base_url.starts_with("https://") {
                http_builder = http_builder.danger_accept_invalid_certs(true);
            } else {
                tracing::warn!(
                    "skip_verify=true has no effect on HTTP URLs. TLS verification only applies to HTTPS connections."
                );
            }
        }

        let http = http_builder.build()?;
        let jobs_url = Self::jobs_url(&base_url, self.owner.as_deref(), self.app.as_deref());

        Ok(Session {
            inner: Arc::new(SessionInner {
                http,
                base_url,
                jobs_url,
                authorization,
                uses_api_token: matches!(credentials, Credentials::ApiToken(_)),
                max_retries: self.max_retries,
                poll: self.poll,
                metrics: self.metrics,
            }),
        })
    }
}
