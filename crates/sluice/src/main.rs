//! Sluice CLI - streaming log consumer with rotation and retention

use anyhow::Result;
use clap::Parser;
use sluice_core::Config;
use sluice_engine::{processor_for, Consumer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity; stdout is the input pipe's
    // peer, so diagnostics go to stderr
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "sluice={level},sluice_engine={level},sluice_core={level}",
                    level = log_level
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    // Explicit config file, else the first well-known name in the
    // working directory, else built-in defaults
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => match Config::discover() {
            Some(path) => {
                info!("Using config file: {}", path.display());
                Config::load(&path)?
            }
            None => Config::default(),
        },
    };

    cli.apply_overrides(&mut config)?;
    config.validate()?;

    info!("Writing to {}", config.active_path().display());

    let processor = processor_for(&config);
    let result = Consumer::new(config, processor)
        .start(tokio::io::stdin())
        .await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
