//! localup-inspect CLI
//!
//! Fetch, filter and follow HTTP requests captured by the local tunnel agent.

use anyhow::{Context, Result};
use clap::Parser;
use localup_inspect::cli::{Cli, Commands};
use localup_inspect::commands;
use localup_inspect::config::{resolve_config, ConfigManager, InspectConfig};
use localup_inspect_client::{InspectorClient, InspectorService, DEFAULT_POLL_INTERVAL};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.effective_log_level())?;
    debug!(
        "localup-inspect {} ({}, built {})",
        env!("GIT_TAG"),
        env!("GIT_HASH"),
        env!("BUILD_TIME")
    );

    // The config file is only consulted when no URL was given
    let file = match cli.base_url {
        Some(_) => InspectConfig::default(),
        None => ConfigManager::load()?,
    };
    let config = resolve_config(cli.base_url.as_deref(), &file)?;

    let client = InspectorClient::new(&config.base_url)
        .context("Failed to create inspector client")?;
    let service = InspectorService::new(client);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    match &cli.command {
        Commands::List(args) => {
            commands::run_list(&service, args, &config.base_url, &mut stdout, &mut stderr).await
        }
        Commands::Get(args) => commands::run_get(&service, args, &mut stdout).await,
        Commands::Tail(args) => {
            let cancel = CancellationToken::new();

            let shutdown = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, stopping tail");
                    shutdown.cancel();
                }
            });

            commands::run_tail(
                &service,
                args,
                &config.base_url,
                DEFAULT_POLL_INTERVAL,
                cancel,
                &mut stdout,
                &mut stderr,
            )
            .await
            .map(|_| ())
        }
        Commands::Status => commands::run_status(&service, &config.base_url, &mut stdout).await,
    }
}

/// Initialize logging on stderr, `RUST_LOG` taking precedence over `log_level`
fn init_logging(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to initialize logging filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
