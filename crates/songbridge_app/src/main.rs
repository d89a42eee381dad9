//! Songbridge command-line host: validates payloads, submits generation jobs,
//! and resolves audio links against the configured provider.
mod cli;
mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use songbridge_logging::{bridge_error, LogDestination, DEFAULT_LOG_FILE};

use cli::{Cli, Command, LogTarget};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Command::Validate { family, file } => commands::validate(*family, file).await,
        Command::Submit { config, request } => commands::submit(config, request).await,
        Command::Resolve {
            config,
            job_id,
            attempts,
            interval_secs,
        } => {
            commands::resolve(config, job_id, *attempts, Duration::from_secs(*interval_secs)).await
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            bridge_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    let destination = match cli.log {
        LogTarget::Terminal => LogDestination::Terminal,
        LogTarget::File => LogDestination::File(file),
        LogTarget::Both => LogDestination::Both(file),
    };
    songbridge_logging::initialize(destination, level);
}
