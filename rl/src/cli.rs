//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Ratelane - adaptive pacing for rate-limited APIs
#[derive(Parser)]
#[command(
    name = "rl",
    about = "Adaptive pacing and priority admission for rate-limited APIs",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the resolved configuration
    Config {
        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Drive a simulated provider through its lane
    Simulate {
        /// Provider whose lane settings to use
        #[arg(short, long, default_value = "primary")]
        provider: String,

        /// Number of requests to submit
        #[arg(short = 'n', long, default_value = "10")]
        requests: u64,

        /// Answer every Nth call with a 429 (0 disables)
        #[arg(short, long, default_value = "4")]
        overload_every: u64,

        /// Simulated call latency in milliseconds
        #[arg(long, default_value = "50")]
        latency_ms: u64,
    },
}

/// Output format for printed data
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}
