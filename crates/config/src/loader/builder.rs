//! Configuration loader builder implementation.
//!
//! Responsibilities:
//! - Provide a builder-pattern `ConfigLoader` for layered configuration.
//! - Support loading from environment variables and direct builder methods.
//! - Validate and build the final `Config`.
//!
//! Invariants / Assumptions:
//! - Builder methods called after `from_env()` override environment values.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.
//! - The `DOTENV_DISABLED` variable is checked before `dotenvy::dotenv()` is called.
//! - An API token takes precedence over a session key when both are present.

use secrecy::SecretString;
use std::time::Duration;

use super::env::apply_env;
use super::error::ConfigError;
use crate::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_SECS,
    MAX_TIMEOUT_SECS, MIN_POLL_INTERVAL_MS,
};
use crate::types::{
    AuthConfig, Config, ConnectionConfig, NamespaceConfig, PollConfig, TokenKind,
};

/// Configuration loader that builds config from environment variables and overrides.
#[derive(Default)]
pub struct ConfigLoader {
    base_url: Option<String>,
    api_token: Option<SecretString>,
    session_key: Option<SecretString>,
    skip_verify: Option<bool>,
    timeout: Option<Duration>,
    max_retries: Option<usize>,
    owner: Option<String>,
    app: Option<String>,
    poll_interval: Option<Duration>,
    max_wait: Option<Duration>,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if dotenv loading is disabled via environment variable.
    fn dotenv_disabled() -> bool {
        matches!(
            std::env::var("DOTENV_DISABLED").ok().as_deref(),
            Some("true") | Some("1")
        )
    }

    /// Load environment variables from .env file if present.
    ///
    /// If `DOTENV_DISABLED` is set to "true" or "1", the .env file is not loaded.
    /// Missing `.env` files are silently ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DotenvParse` for invalid syntax and
    /// `ConfigError::DotenvIo` when the file exists but cannot be read.
    pub fn load_dotenv(self) -> Result<Self, ConfigError> {
        if Self::dotenv_disabled() {
            return Ok(self);
        }

        match dotenvy::dotenv() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "Loaded .env file");
                Ok(self)
            }
            Err(e) if Self::is_not_found(&e) => Ok(self),
            Err(dotenvy::Error::LineParse(_, idx)) => {
                Err(ConfigError::DotenvParse { error_index: idx })
            }
            Err(dotenvy::Error::Io(io_err)) => Err(ConfigError::DotenvIo {
                kind: io_err.kind(),
            }),
            Err(_) => Err(ConfigError::DotenvUnknown),
        }
    }

    fn is_not_found(err: &dotenvy::Error) -> bool {
        matches!(
            err,
            dotenvy::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Read configuration from environment variables.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        apply_env(&mut self)?;
        Ok(self)
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    pub fn with_api_token(mut self, token: String) -> Self {
        self.api_token = Some(SecretString::new(token.into()));
        self
    }

    pub fn with_session_key(mut self, key: String) -> Self {
        self.session_key = Some(SecretString::new(key.into()));
        self
    }

    pub fn with_skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = Some(skip);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn with_namespace(mut self, owner: Option<String>, app: Option<String>) -> Self {
        self.owner = owner.or(self.owner);
        self.app = app.or(self.app);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub(crate) fn set_base_url(&mut self, url: String) {
        self.base_url = Some(url);
    }

    pub(crate) fn set_api_token(&mut self, token: SecretString) {
        self.api_token = Some(token);
    }

    pub(crate) fn set_session_key(&mut self, key: SecretString) {
        self.session_key = Some(key);
    }

    pub(crate) fn set_skip_verify(&mut self, skip: bool) {
        self.skip_verify = Some(skip);
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub(crate) fn set_max_retries(&mut self, retries: usize) {
        self.max_retries = Some(retries);
    }

    pub(crate) fn set_owner(&mut self, owner: String) {
        self.owner = Some(owner);
    }

    pub(crate) fn set_app(&mut self, app: String) {
        self.app = Some(app);
    }

    pub(crate) fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = Some(interval);
    }

    pub(crate) fn set_max_wait(&mut self, max_wait: Duration) {
        self.max_wait = Some(max_wait);
    }

    /// Build the final configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let base_url = self
            .base_url
            .as_deref()
            .map(validate_and_normalize_base_url)
            .transpose()?
            .ok_or(ConfigError::MissingBaseUrl)?;

        let auth = if let Some(token) = self.api_token {
            AuthConfig {
                kind: TokenKind::ApiToken,
                token,
            }
        } else if let Some(token) = self.session_key {
            AuthConfig {
                kind: TokenKind::SessionKey,
                token,
            }
        } else {
            return Err(ConfigError::MissingAuth);
        };

        let connection = ConnectionConfig {
            base_url,
            skip_verify: self.skip_verify.unwrap_or(false),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        };
        validate_timeout(&connection)?;

        let poll = PollConfig {
            interval: self
                .poll_interval
                .unwrap_or(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)),
            max_wait: self
                .max_wait
                .unwrap_or(Duration::from_secs(DEFAULT_MAX_WAIT_SECS)),
        };
        validate_poll(&poll)?;

        Ok(Config {
            connection,
            auth,
            namespace: NamespaceConfig {
                owner: self.owner,
                app: self.app,
            },
            poll,
        })
    }
}

fn validate_timeout(connection: &ConnectionConfig) -> Result<(), ConfigError> {
    let timeout_secs = connection.timeout.as_secs();
    if timeout_secs == 0 {
        return Err(ConfigError::InvalidTimeout {
            message: "timeout must be greater than 0 seconds".to_string(),
        });
    }
    if timeout_secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::InvalidTimeout {
            message: format!(
                "timeout exceeds maximum allowed value of {} seconds",
                MAX_TIMEOUT_SECS
            ),
        });
    }
    Ok(())
}

fn validate_poll(poll: &PollConfig) -> Result<(), ConfigError> {
    if poll.interval < Duration::from_millis(MIN_POLL_INTERVAL_MS) {
        return Err(ConfigError::InvalidPoll {
            message: format!(
                "poll interval must be at least {} ms",
                MIN_POLL_INTERVAL_MS
            ),
        });
    }
    if poll.max_wait < poll.interval {
        return Err(ConfigError::InvalidPoll {
            message: "max wait must not be shorter than the poll interval".to_string(),
        });
    }
    Ok(())
}

fn validate_and_normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ConfigError::MissingBaseUrl);
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        var: "base_url".into(),
        message: format!(
            "must be an absolute http(s) URL with a host (e.g. https://localhost:8089): {e}"
        ),
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::InvalidValue {
            var: "base_url".into(),
            message: format!(
                "scheme must be http or https (e.g. https://localhost:8089), got: {scheme}"
            ),
        });
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidValue {
            var: "base_url".into(),
            message: "host is required (e.g. https://localhost:8089)".into(),
        });
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
