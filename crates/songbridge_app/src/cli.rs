use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Songbridge - music-generation provider integration tools
#[derive(Debug, Parser)]
#[command(name = "songbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal, global = true)]
    pub log: LogTarget,

    /// Log file used by `--log file` and `--log both`
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a JSON payload file against one payload family
    Validate {
        /// Payload family to validate against
        #[arg(value_enum)]
        family: Family,

        /// Path to the JSON payload
        file: PathBuf,
    },

    /// Validate a generation request and submit it to the provider
    Submit {
        /// Provider configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Path to the generation request (JSON)
        request: PathBuf,
    },

    /// Resolve the audio links of a job, polling until they are ready
    Resolve {
        /// Provider configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Job identifier returned by `submit`
        job_id: String,

        /// How many lookups to attempt before giving up
        #[arg(long, default_value_t = 1)]
        attempts: u32,

        /// Seconds to wait between attempts
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Family {
    Request,
    Callback,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}
