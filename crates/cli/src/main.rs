//! splunk-jobs - command-line front end for the search-job client.
//!
//! Responsibilities:
//! - Parse command-line arguments and environment variables.
//! - Build a session from the layered configuration and run one command.
//! - Map failures onto structured exit codes.
//!
//! Does NOT handle:
//! - Job or results semantics (see `crates/client`).
//!
//! Invariants:
//! - `load_dotenv()` is called BEFORE CLI parsing so `.env` can provide clap defaults.
//! - Only command output goes to stdout; logs go to stderr.

mod args;
mod commands;
mod error;

use std::time::Duration;

use anyhow::{Context, Result};
use args::{Cli, Commands};
use clap::Parser;
use error::{ExitCode, ExitCodeExt};
use splunk_jobs::Session;
use splunk_jobs_config::{Config, ConfigLoader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let loader = match ConfigLoader::new().load_dotenv() {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Failed to load environment: {}", e);
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    };

    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = match build_config(&cli, loader) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    };

    let exit_code = tokio::select! {
        result = run(cli.command, config) => match result {
            Ok(()) => ExitCode::Success,
            Err(e) => {
                eprintln!("{:#}", e);
                e.exit_code()
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            ExitCode::Interrupted
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_config(cli: &Cli, loader: ConfigLoader) -> Result<Config> {
    let loader = loader
        .from_env()
        .context("Failed to load configuration from environment")?;
    cli.apply_overrides(loader)
        .build()
        .context("Failed to build configuration")
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let session = Session::builder().from_config(&config).build()?;
    let max_wait = config.poll.max_wait;
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Search {
            query,
            earliest,
            latest,
            count,
            wait_secs,
            keep,
        } => {
            let options = commands::time_bounds(earliest, latest);
            let wait = wait_secs.map(Duration::from_secs).unwrap_or(max_wait);
            commands::search::run(&session, &query, &options, count, wait, keep, &mut stdout).await
        }
        Commands::Oneshot {
            query,
            earliest,
            latest,
            count,
        } => {
            let options = commands::time_bounds(earliest, latest);
            commands::oneshot::run(&session, &query, options, count, &mut stdout).await
        }
        Commands::Status {
            sid,
            wait,
            wait_secs,
        } => {
            let wait = wait.then(|| wait_secs.map(Duration::from_secs).unwrap_or(max_wait));
            commands::status::run(&session, &sid, wait, &mut stdout).await
        }
        Commands::Cancel { sid, wait } => commands::cancel::run(&session, &sid, wait).await,
        Commands::Control {
            sid,
            action,
            wait_for,
        } => commands::control::run(&session, &sid, action.into(), &wait_for).await,
    }
}
