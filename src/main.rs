//! Triago CLI entry point.

use clap::Parser;

use triago::cli::{Cli, Commands};
use triago::infrastructure::config::ConfigLoader;
use triago::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            triago::cli::handle_error(err, cli.json);
            return;
        }
    };

    if let Err(err) = init_logging(&config.logging) {
        triago::cli::handle_error(err, cli.json);
        return;
    }

    let result = match &cli.command {
        Commands::Init(args) => triago::cli::commands::init::execute(args, cli.json),
        Commands::Ingest(args) => {
            triago::cli::commands::ingest::execute(args, config, cli.json).await
        }
    };

    if let Err(err) = result {
        triago::cli::handle_error(err, cli.json);
    }
}
