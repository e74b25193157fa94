//! CLI Entry Point for multiserial-logger
//!
//! Provides command-line interface for:
//! - Running the logger until interrupted
//! - Checking a configuration file without touching any port
//!
//! # Usage
//!
//! ```bash
//! multiserial-logger run --config /etc/multiserial/logger.toml
//! multiserial-logger run --config settings.txt --log-level debug
//! multiserial-logger check --config /etc/multiserial/logger.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use multiserial_logger::acquisition::open_port;
use multiserial_logger::app;
use multiserial_logger::clock::SystemClock;
use multiserial_logger::config::LoggerConfig;
use multiserial_logger::scheduler::StopSignal;
use multiserial_logger::tracing_setup;
use multiserial_logger::upload::uploader_from_config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "multiserial-logger")]
#[command(about = "Log line-oriented serial instruments into daily files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open every configured port and log until Ctrl+C
    Run {
        /// Path to logger.toml or a legacy settings.txt
        #[arg(long)]
        config: PathBuf,

        /// Override the configured diagnostic level
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Load and validate a configuration, then print its summary
    Check {
        /// Path to logger.toml or a legacy settings.txt
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, log_level } => run(&config, log_level).await,
        Commands::Check { config } => check(&config),
    }
}

fn load(path: &Path) -> Result<LoggerConfig> {
    LoggerConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn check(path: &Path) -> Result<()> {
    let config = load(path)?;
    for line in config.summary_lines() {
        println!("{}", line);
    }
    println!("Configuration OK ({} ports)", config.ports.len());
    Ok(())
}

async fn run(path: &Path, log_level: Option<String>) -> Result<()> {
    let mut config = load(path)?;
    if let Some(level) = log_level {
        config.log_level = level;
        config.validate()?;
    }
    tracing_setup::init_from_config(&config)?;

    let uploader = uploader_from_config(&config.upload)?;
    let scheduler = app::start(&config, Arc::new(SystemClock), uploader, open_port)
        .context("Logger failed to start")?;

    let stop = StopSignal::new();
    let on_signal = stop.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, stopping");
                on_signal.stop();
            }
            Err(e) => error!(error = %e, "failed to listen for interrupt"),
        }
    });

    info!(config = %path.display(), "logger running, press Ctrl+C to stop");
    let totals = tokio::task::spawn_blocking(move || app::run_until_stopped(scheduler, &stop))
        .await
        .context("Acquisition loop terminated abnormally")?;

    info!(
        records = totals.records,
        failures = totals.failures,
        rollovers = totals.rollovers,
        "logger stopped"
    );
    Ok(())
}
