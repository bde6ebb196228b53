use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Identify plants from photos using Gemini
#[derive(Parser, Debug)]
#[command(name = "plantid", author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the config file (defaults to ~/.config/plantid/config.toml)
    #[arg(short, long, global = true, env = "PLANTID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Gemini API key, overriding config and environment
    #[arg(short = 'k', long, global = true)]
    pub api_key: Option<String>,

    /// Gemini model to use
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Identify the plant in an image file
    Identify {
        /// Image file to analyze
        image: PathBuf,

        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Take one photo with the camera and identify it
    Capture {
        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Menu-driven session (the default)
    Interactive,

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Write the default config file
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}
