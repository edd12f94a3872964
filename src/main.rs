//! CLI entry point for the bookshelf tool.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;

use app_config::Settings;
use cli::Cli;
use commands::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();
    let file_config = app_config::load_file_config(cli.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > default (info)
    let default_level = app_config::default_log_level(&cli, file_config.as_ref());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?cli, "CLI arguments parsed");

    let settings = Settings::resolve(&cli, file_config.as_ref());
    debug!(?settings, "settings resolved");
    info!("Bookshelf starting");

    let context = AppContext::new(settings)?;
    commands::run(cli.command, &context).await
}
