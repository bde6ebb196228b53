use anyhow::{Context, Result};
use plantid_core::config::{get_default_config_file, APP_NAME};
use plantid_core::PlantIdConfig;
use std::path::PathBuf;

use crate::cli::Args;

/// Config file location: `--config` / `PLANTID_CONFIG`, else the per-user default.
pub fn config_path(args: &Args) -> Result<PathBuf> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => get_default_config_file(APP_NAME).context("Failed to locate config file"),
    }
}

/// Defaults < config file < environment < command-line flags
pub fn load(args: &Args) -> Result<PlantIdConfig> {
    let path = config_path(args)?;
    let from_file = PlantIdConfig::load_from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    let from_flags = PlantIdConfig {
        api_key: args.api_key.clone(),
        model_name: args.model.clone(),
        ..PlantIdConfig::default()
    };

    Ok(PlantIdConfig::defaults()
        .merge(&from_file)
        .merge(&PlantIdConfig::from_env())
        .merge(&from_flags))
}
