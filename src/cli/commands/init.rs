//! `triago init` — scaffold project-local configuration.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::models::Config;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub fn execute(args: &InitArgs, json: bool) -> Result<()> {
    let dir = Path::new(".triago");
    let path = dir.join("config.yaml");

    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::create_dir_all(dir).context("Failed to create .triago directory")?;
    let rendered =
        serde_yaml::to_string(&Config::default()).context("Failed to render default config")?;
    std::fs::write(&path, rendered)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if json {
        println!("{}", serde_json::json!({ "created": path.display().to_string() }));
    } else {
        println!("Created {}", path.display());
    }
    Ok(())
}
