//! Environment variable parsing for configuration.
//!
//! Responsibilities:
//! - Read and parse environment variables for the client configuration.
//! - Apply environment variable values to a `ConfigLoader` instance.
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Returned values are trimmed (leading/trailing whitespace removed).
//! - Invalid numeric values return `ConfigError::InvalidValue`.

use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

use super::builder::ConfigLoader;
use super::error::ConfigError;
use crate::constants::MAX_MAX_RETRIES;

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
/// Returns the trimmed value (leading/trailing whitespace removed) if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_env<T: FromStr>(var: &str, message: &str) -> Result<Option<T>, ConfigError> {
    env_var_or_none(var)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                message: message.to_string(),
            })
        })
        .transpose()
}

/// Apply environment variable configuration to the loader.
pub fn apply_env(loader: &mut ConfigLoader) -> Result<(), ConfigError> {
    if let Some(url) = env_var_or_none("SPLUNK_BASE_URL") {
        loader.set_base_url(url);
    }
    if let Some(token) = env_var_or_none("SPLUNK_API_TOKEN") {
        loader.set_api_token(SecretString::new(token.into()));
    }
    if let Some(key) = env_var_or_none("SPLUNK_SESSION_KEY") {
        loader.set_session_key(SecretString::new(key.into()));
    }
    if let Some(skip) = parse_env::<bool>("SPLUNK_SKIP_VERIFY", "must be true or false")? {
        loader.set_skip_verify(skip);
    }
    if let Some(secs) = parse_env::<u64>("SPLUNK_TIMEOUT", "must be a number")? {
        loader.set_timeout(Duration::from_secs(secs));
    }
    if let Some(retries) =
        parse_env::<usize>("SPLUNK_MAX_RETRIES", "must be a non-negative integer")?
    {
        if retries > MAX_MAX_RETRIES {
            return Err(ConfigError::InvalidMaxRetries {
                message: format!(
                    "must be between 0 and {} (got {})",
                    MAX_MAX_RETRIES, retries
                ),
            });
        }
        loader.set_max_retries(retries);
    }
    if let Some(owner) = env_var_or_none("SPLUNK_OWNER") {
        loader.set_owner(owner);
    }
    if let Some(app) = env_var_or_none("SPLUNK_APP") {
        loader.set_app(app);
    }
    if let Some(ms) = parse_env::<u64>("SPLUNK_POLL_INTERVAL_MS", "must be a number")? {
        loader.set_poll_interval(Duration::from_millis(ms));
    }
    if let Some(secs) = parse_env::<u64>("SPLUNK_MAX_WAIT_SECS", "must be a number")? {
        loader.set_max_wait(Duration::from_secs(secs));
    }
    Ok(())
}
