//! CLI argument definitions and parsing.
//!
//! Responsibilities:
//! - Define the CLI structure using clap derive macros.
//! - Map global connection flags onto the config loader.
//!
//! Non-responsibilities:
//! - Does not execute commands (see `commands`).

use std::time::Duration;

use clap::{Parser, Subcommand};
use splunk_jobs::JobAction;
use splunk_jobs_config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(name = "splunk-jobs")]
#[command(about = "Run and manage Splunk search jobs from the command line", long_about = None)]
#[command(version)]
#[command(
    after_help = "Examples:\n  splunk-jobs search 'index=_internal | head 10'\n  splunk-jobs oneshot '| makeresults count=3'\n  splunk-jobs status 1700000000.42 --wait\n  splunk-jobs control 1700000000.42 set-priority 7 --wait-for priority=7\n  splunk-jobs cancel 1700000000.42 --wait\n"
)]
pub struct Cli {
    /// Base URL of the Splunk management port (e.g., https://localhost:8089)
    #[arg(short, long, global = true, env = "SPLUNK_BASE_URL")]
    pub base_url: Option<String>,

    /// Authentication token (sent as a Bearer token)
    #[arg(short, long, global = true, env = "SPLUNK_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Session key from a prior login
    #[arg(long, global = true, env = "SPLUNK_SESSION_KEY", hide_env_values = true)]
    pub session_key: Option<String>,

    /// Namespace owner for job endpoints
    #[arg(long, global = true, env = "SPLUNK_OWNER")]
    pub owner: Option<String>,

    /// Namespace app for job endpoints
    #[arg(long, global = true, env = "SPLUNK_APP")]
    pub app: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, global = true, env = "SPLUNK_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Maximum number of retries for failed reads
    #[arg(long, global = true, env = "SPLUNK_MAX_RETRIES")]
    pub max_retries: Option<usize>,

    /// Skip TLS certificate verification (for self-signed certificates)
    #[arg(long, global = true)]
    pub skip_verify: bool,

    /// Interval between job-state refreshes, in milliseconds
    #[arg(long, global = true, env = "SPLUNK_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply the connection flags on top of `loader`.
    pub fn apply_overrides(&self, mut loader: ConfigLoader) -> ConfigLoader {
        if let Some(url) = &self.base_url {
            loader = loader.with_base_url(url.clone());
        }
        if let Some(token) = &self.api_token {
            loader = loader.with_api_token(token.clone());
        }
        if let Some(key) = &self.session_key {
            loader = loader.with_session_key(key.clone());
        }
        if self.owner.is_some() || self.app.is_some() {
            loader = loader.with_namespace(self.owner.clone(), self.app.clone());
        }
        if let Some(secs) = self.timeout {
            loader = loader.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.max_retries {
            loader = loader.with_max_retries(retries);
        }
        if self.skip_verify {
            loader = loader.with_skip_verify(true);
        }
        if let Some(ms) = self.poll_interval_ms {
            loader = loader.with_poll_interval(Duration::from_millis(ms));
        }
        loader
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a search job, wait for it, and print its results as JSON lines
    Search {
        /// The search query (a leading `search` command is added when missing)
        query: String,

        /// Earliest time bound (e.g., '-24h')
        #[arg(short, long, allow_hyphen_values = true)]
        earliest: Option<String>,

        /// Latest time bound (e.g., 'now')
        #[arg(short, long, allow_hyphen_values = true)]
        latest: Option<String>,

        /// Maximum number of results to print (0 prints all)
        #[arg(short, long, default_value = "0")]
        count: u64,

        /// Seconds to wait for the job to finish (defaults to SPLUNK_MAX_WAIT_SECS)
        #[arg(long)]
        wait_secs: Option<u64>,

        /// Keep the job on the server instead of cancelling it afterwards
        #[arg(long)]
        keep: bool,
    },

    /// Run a search in oneshot mode and print its results as JSON lines
    Oneshot {
        /// The search query
        query: String,

        /// Earliest time bound (e.g., '-24h')
        #[arg(short, long, allow_hyphen_values = true)]
        earliest: Option<String>,

        /// Latest time bound (e.g., 'now')
        #[arg(short, long, allow_hyphen_values = true)]
        latest: Option<String>,

        /// Maximum number of results to return (service default when omitted is all)
        #[arg(short, long)]
        count: Option<u64>,
    },

    /// Print a job's current properties as JSON
    Status {
        /// Search job id
        sid: String,

        /// Wait until the job is done, logging progress
        #[arg(long)]
        wait: bool,

        /// Seconds to wait with --wait (defaults to SPLUNK_MAX_WAIT_SECS)
        #[arg(long, requires = "wait")]
        wait_secs: Option<u64>,
    },

    /// Cancel a job
    Cancel {
        /// Search job id
        sid: String,

        /// Wait until the job disappears from the job list
        #[arg(long)]
        wait: bool,
    },

    /// Send a control action to a job
    Control {
        /// Search job id
        sid: String,

        #[command(subcommand)]
        action: ControlAction,

        /// Wait until the job shows PROPERTY=VALUE (repeatable)
        #[arg(long = "wait-for", value_name = "PROPERTY=VALUE", value_parser = parse_property, global = true)]
        wait_for: Vec<(String, String)>,
    },
}

/// Control actions exposed on the command line.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Unpause,
    /// Stop the search and keep the results gathered so far
    Finalize,
    /// Reset the job's inactivity timer
    Touch,
    EnablePreview,
    DisablePreview,
    /// Set the inactivity time-to-live
    SetTtl {
        /// Seconds
        seconds: u64,
    },
    /// Set the scheduling priority (0-10)
    SetPriority { priority: u8 },
}

impl From<ControlAction> for JobAction {
    fn from(action: ControlAction) -> Self {
        match action {
            ControlAction::Pause => JobAction::Pause,
            ControlAction::Unpause => JobAction::Unpause,
            ControlAction::Finalize => JobAction::Finalize,
            ControlAction::Touch => JobAction::Touch,
            ControlAction::EnablePreview => JobAction::EnablePreview,
            ControlAction::DisablePreview => JobAction::DisablePreview,
            ControlAction::SetTtl { seconds } => JobAction::SetTtl(seconds),
            ControlAction::SetPriority { priority } => JobAction::SetPriority(priority),
        }
    }
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected PROPERTY=VALUE, got '{raw}'")),
    }
}
