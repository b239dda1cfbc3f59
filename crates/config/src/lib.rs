//! Configuration management for the splunk-jobs client.
//!
//! This crate provides types and loaders for the Splunk connection, credentials,
//! namespace, and job-polling settings, sourced from `.env` files, environment
//! variables, and explicit overrides.

pub mod constants;
mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, env_var_or_none};
pub use types::{
    AuthConfig, Config, ConnectionConfig, NamespaceConfig, PollConfig, TokenKind,
};
