//! flightfare - Main Entry Point
//!
//! Runs the flight-fare training pipeline, or one of its utilities.

use clap::Parser;
use flightfare::cli::{cmd_predict, cmd_push, cmd_train, load_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flightfare=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Push { file, database, collection }) => {
            cmd_push(&config, &file, database.as_deref(), collection.as_deref())?;
        }
        Some(Commands::Predict { model, data, output }) => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
        Some(Commands::Train) | None => {
            cmd_train(config)?;
        }
    }

    Ok(())
}
