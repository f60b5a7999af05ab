//! factflow CLI Binary
//!
//! Command-line interface for walking interview flows and editing return facts.

use anyhow::Context;
use clap::Parser;
use factflow::cli::{map_error, Cli, RunContext};
use factflow::config::ConfigLoader;
use factflow::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    if let Err(e) = run() {
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli)?;
    init_logging(Some(&logging_config))
        .map_err(|e| anyhow::anyhow!(map_error(&e)))
        .context("Failed to initialize logging")?;

    info!("factflow CLI starting");

    let context = RunContext::new(
        cli.workspace.clone(),
        cli.config.clone(),
        cli.return_id.clone(),
        cli.format,
    )
    .map_err(|e| {
        error!("Error initializing workspace: {}", e);
        anyhow::anyhow!(map_error(&e))
    })?;

    let output = context.execute(&cli.command).map_err(|e| {
        error!("Command failed: {}", e);
        anyhow::anyhow!(map_error(&e))
    })?;
    println!("{}", output);
    Ok(())
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> anyhow::Result<LoggingConfig> {
    let mut config = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default(),
        None => ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default(),
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.parse().map_err(|e| anyhow::anyhow!(map_error(&e)))?;
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.parse().map_err(|e| anyhow::anyhow!(map_error(&e)))?;
    }
    match cli.log_file {
        Some(ref file) => config.file = file.clone(),
        None if config.file.is_relative() => config.file = cli.workspace.join(&config.file),
        None => {}
    }

    Ok(config)
}
