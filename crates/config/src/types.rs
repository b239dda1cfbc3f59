//! Configuration types for the search-job client.
//!
//! Responsibilities:
//! - Define connection settings (URL, TLS verification, timeouts, retries).
//! - Define credentials, the optional owner/app namespace, and poll settings.
//! - Provide convenience constructors for common config patterns.
//!
//! Does NOT handle:
//! - Loading configuration from `.env`/environment (see `loader` module).
//! - Actual network connections (see the client crate).
//!
//! Invariants:
//! - All duration fields are serialized as seconds or milliseconds (integers).
//! - Default values come from `constants`, not magic numbers.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SPLUNK_PORT,
    DEFAULT_TIMEOUT_SECS,
};

/// Module for serializing Duration as seconds (integer).
mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Module for serializing Duration as milliseconds (integer).
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Connection configuration for the Splunk management port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the Splunk server (e.g., https://localhost:8089)
    pub base_url: String,
    /// Whether to skip TLS verification (for self-signed certificates)
    pub skip_verify: bool,
    /// Connect/read timeout (serialized as seconds)
    #[serde(with = "duration_seconds")]
    pub timeout: Duration,
    /// Maximum number of retries for failed read requests
    pub max_retries: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: format!("https://localhost:{}", DEFAULT_SPLUNK_PORT),
            skip_verify: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Which kind of token the session presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Splunk authentication token, sent as `Authorization: Bearer <token>`.
    ApiToken,
    /// Session key from a prior login, sent as `Authorization: Splunk <key>`.
    SessionKey,
}

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub kind: TokenKind,
    pub token: SecretString,
}

/// Optional `servicesNS/{owner}/{app}` namespace for job endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub owner: Option<String>,
    pub app: Option<String>,
}

impl NamespaceConfig {
    /// Whether either namespace component is set.
    pub fn is_set(&self) -> bool {
        self.owner.is_some() || self.app.is_some()
    }
}

/// Polling cadence for job-state waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Sleep between refreshes (serialized as milliseconds)
    #[serde(with = "duration_millis")]
    pub interval: Duration,
    /// Default deadline for waits that do not specify one (serialized as seconds)
    #[serde(with = "duration_seconds")]
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub auth: AuthConfig,
    pub namespace: NamespaceConfig,
    pub poll: PollConfig,
}

impl Config {
    /// Create a new config with the specified base URL and API token.
    pub fn with_api_token(base_url: String, token: SecretString) -> Self {
        Self::with_token(base_url, TokenKind::ApiToken, token)
    }

    /// Create a new config with the specified base URL and session key.
    pub fn with_session_key(base_url: String, key: SecretString) -> Self {
        Self::with_token(base_url, TokenKind::SessionKey, key)
    }

    fn with_token(base_url: String, kind: TokenKind, token: SecretString) -> Self {
        Self {
            connection: ConnectionConfig {
                base_url,
                ..ConnectionConfig::default()
            },
            auth: AuthConfig { kind, token },
            namespace: NamespaceConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_connection_config_serializes_timeout_as_seconds() {
        let config = ConnectionConfig {
            timeout: Duration::from_secs(45),
            ..ConnectionConfig::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 45);
        assert_eq!(json["base_url"], "https://localhost:8089");
    }

    #[test]
    fn test_poll_config_round_trips_units() {
        let json = r#"{"interval": 250, "max_wait": 60}"#;
        let poll: PollConfig = serde_json::from_str(json).unwrap();
        assert_eq!(poll.interval, Duration::from_millis(250));
        assert_eq!(poll.max_wait, Duration::from_secs(60));
    }

    #[test]
    fn test_with_session_key_sets_kind() {
        let config = Config::with_session_key(
            "https://splunk.example.com:8089".to_string(),
            SecretString::new("abc".to_string().into()),
        );
        assert_eq!(config.auth.kind, TokenKind::SessionKey);
        assert_eq!(config.auth.token.expose_secret(), "abc");
        assert!(!config.namespace.is_set());
    }
}
