//! dotpub - .NET publish layer builder
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use dotpub::cli::{Cli, Commands};
use dotpub::config::options::LOG_LEVEL;
use dotpub::config::{ConfigManager, LogLevel};
use dotpub::error::{DotpubError, DotpubResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DotpubResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; BP_LOG_LEVEL=DEBUG implies debug
    let debug_requested = std::env::var(LOG_LEVEL)
        .ok()
        .and_then(|v| v.parse::<LogLevel>().ok())
        == Some(LogLevel::Debug);
    let filter = match (cli.verbose, debug_requested) {
        (_, true) | (2.., _) => EnvFilter::new("dotpub=debug"),
        (1, _) => EnvFilter::new("dotpub=info"),
        _ => EnvFilter::new("dotpub=warn"),
    };

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| DotpubError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time();
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match &local_config_path {
        Some(path) => debug!("Merged local config: {}", path.display()),
        None if cli.no_local => debug!("Local config discovery disabled (--no-local)"),
        None => {}
    }

    match cli.command {
        Commands::Build(args) => dotpub::cli::commands::build(args, &config).await,
        Commands::Plan(args) => dotpub::cli::commands::plan(args, &config).await,
        Commands::Layers(args) => dotpub::cli::commands::layers(args, &config).await,
        Commands::Clear(args) => dotpub::cli::commands::clear(args, &config).await,
        Commands::Config(args) => {
            dotpub::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
