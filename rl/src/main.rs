//! Ratelane - adaptive pacing for rate-limited APIs
//!
//! CLI entry point for inspecting configuration and simulating load.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use futures::future::join_all;
use tracing::{debug, info};

use ratelane::cli::{Cli, Command, OutputFormat};
use ratelane::config::Config;
use ratelane::domain::Priority;
use ratelane::lanes::ProviderLanes;
use ratelane::simulate::{Provider, SimulatedProvider};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ratelane")
        .join("logs");

    let log_file = fs::create_dir_all(&log_dir).and_then(|_| fs::File::create(log_dir.join("ratelane.log")));

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    match log_file {
        Ok(file) => tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init(),
        Err(e) => {
            eprintln!("Warning: Failed to open log file in {}: {}", log_dir.display(), e);
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init()
        }
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("Ratelane loaded config: default-provider={}", config.default_provider);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Config { format } => cmd_config(&config, format),
        Command::Simulate {
            provider,
            requests,
            overload_every,
            latency_ms,
        } => cmd_simulate(config, &provider, requests, overload_every, latency_ms).await,
    }
}

fn cmd_config(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_config: called");
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(config).context("Failed to render config as YAML")?,
        OutputFormat::Json => serde_json::to_string_pretty(config).context("Failed to render config as JSON")?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

async fn cmd_simulate(config: Config, provider: &str, requests: u64, overload_every: u64, latency_ms: u64) -> Result<()> {
    debug!(%provider, requests, overload_every, latency_ms, "cmd_simulate: called");
    let lanes = ProviderLanes::new(config);
    let queue = lanes.lane(provider).await?;
    let api = Arc::new(
        SimulatedProvider::new(queue.name())
            .with_latency(Duration::from_millis(latency_ms), Duration::from_millis(latency_ms / 5))
            .with_overload_every(overload_every),
    );

    println!(
        "{} {} requests through lane '{}'",
        "Simulating".bold(),
        requests,
        queue.name().cyan()
    );

    let priorities = [Priority::LOW, Priority::NORMAL, Priority::HIGH, Priority::CRITICAL];
    let mut tickets = Vec::new();
    for request in 0..requests {
        let priority = priorities[(request % priorities.len() as u64) as usize];
        let api = api.clone();
        let ticket = queue
            .submit(priority, move || async move { api.call(request).await })
            .context("Lane closed while submitting")?;
        tickets.push((request, priority, ticket));
    }

    let outcomes = join_all(tickets.into_iter().map(|(request, priority, ticket)| async move {
        (request, priority, ticket.await)
    }))
    .await;

    for (request, priority, outcome) in outcomes {
        match outcome {
            Ok(body) => println!("  {} #{:<4} {:<9} {}", "ok".green(), request, priority.to_string(), body),
            Err(e) => println!("  {} #{:<4} {:<9} {}", "err".red(), request, priority.to_string(), e),
        }
    }

    let state = queue.state().await?;
    println!();
    println!("{:<16} {:?}", "current delay:".bold(), state.current_delay);
    println!("{:<16} {}", "succeeded:".bold(), state.stats.total_succeeded);
    println!("{:<16} {}", "failed:".bold(), state.stats.total_failed);
    println!("{:<16} {}", "overloads:".bold(), state.stats.total_overloads);
    println!("{:<16} {}", "peak depth:".bold(), state.stats.peak_queue_depth);
    println!("{:<16} {}", "provider calls:".bold(), api.calls());
    Ok(())
}
