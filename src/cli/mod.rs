//! Command-line interface.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Triago — event-driven support ticket triage.
#[derive(Debug, Parser)]
#[command(name = "triago", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from a specific file instead of .triago/
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scaffold a project-local configuration file
    Init(commands::init::InitArgs),
    /// Feed newline-delimited ticket.created events through the workflow
    Ingest(commands::ingest::IngestArgs),
}

/// Print an error (and its cause chain) and exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) {
    if json {
        let payload = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{payload}");
    } else {
        eprintln!("error: {err:#}");
    }
    std::process::exit(1);
}
