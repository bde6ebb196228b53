use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use dotenvy::dotenv;
use plantid_core::PlantIdConfig;
use tracing::debug;

mod app;
mod cli;
mod config;
mod logging;
mod output;

use crate::cli::{Args, Command, ConfigAction};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment first so GEMINI_API_KEY from .env is visible to config loading
    dotenv().ok();

    let args = Args::parse();
    let config = config::load(&args)?;
    logging::init(args.verbose, config.log_level.as_deref())?;
    debug!(model = config.model_name(), "Configuration loaded");

    match args.command.clone().unwrap_or(Command::Interactive) {
        Command::Identify { image, json } => app::run_identify(&config, &image, json).await,
        Command::Capture { json } => app::run_capture(&config, json).await,
        Command::Interactive => app::run_interactive(&config).await,
        Command::Config { action } => run_config(&args, &config, action),
    }
}

fn run_config(args: &Args, config: &PlantIdConfig, action: ConfigAction) -> Result<()> {
    let path = config::config_path(args)?;
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            PlantIdConfig::defaults()
                .save_to_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        ConfigAction::Show => {
            println!("{} {}", "#".dimmed(), path.display().to_string().dimmed());
            let rendered = toml::to_string_pretty(&config.redacted())
                .context("Failed to render configuration")?;
            println!("{}", rendered);
        }
    }
    Ok(())
}
