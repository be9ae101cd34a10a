use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use narrative_workshop::{
    cli::{execute_command, WorkshopCommands},
    config::{DatabaseConfig, LogFormat, LoggingConfig},
    storage::SqliteStorage,
};

/// Maintenance CLI for the narrative workshop's version history and prompt cache.
#[derive(Parser, Debug)]
#[command(name = "narrative-workshop", version, about)]
struct Cli {
    #[command(subcommand)]
    command: WorkshopCommands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig::from_env());

    let database = DatabaseConfig::from_env();
    let storage = match SqliteStorage::new(&database).await {
        Ok(s) => {
            info!(path = %database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    let result = execute_command(cli.command, Arc::new(storage)).await;
    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
