use crate::errors::{GeminiError, GeminiResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "plantid";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable overriding the model name
pub const MODEL_ENV: &str = "PLANTID_MODEL";

/// Configuration for the plant identifier
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PlantIdConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub api_base_url: Option<String>,
    pub temperature: Option<f32>,
    pub request_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub camera: CameraConfig,
}

/// Camera settings used by the command-driven capture backend
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CameraConfig {
    pub device: Option<String>,
    pub ideal_width: Option<u32>,
    pub ideal_height: Option<u32>,
    pub facing_mode: Option<String>,
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
}

impl CameraConfig {
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or("/dev/video0")
    }

    pub fn ideal_width(&self) -> u32 {
        self.ideal_width.unwrap_or(1280)
    }

    pub fn ideal_height(&self) -> u32 {
        self.ideal_height.unwrap_or(720)
    }

    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or("ffmpeg")
    }

    /// Capture command arguments. `{device}`, `{width}` and `{height}` are
    /// substituted before the command runs.
    pub fn args(&self) -> Vec<String> {
        self.args.clone().unwrap_or_else(|| {
            [
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "v4l2",
                "-video_size",
                "{width}x{height}",
                "-i",
                "{device}",
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect()
        })
    }

    fn merge(&self, other: &Self) -> Self {
        Self {
            device: other.device.clone().or_else(|| self.device.clone()),
            ideal_width: other.ideal_width.or(self.ideal_width),
            ideal_height: other.ideal_height.or(self.ideal_height),
            facing_mode: other.facing_mode.clone().or_else(|| self.facing_mode.clone()),
            command: other.command.clone().or_else(|| self.command.clone()),
            args: other.args.clone().or_else(|| self.args.clone()),
        }
    }
}

impl PlantIdConfig {
    /// Built-in defaults, written out by `config init`
    pub fn defaults() -> Self {
        Self {
            api_key: None,
            model_name: Some(DEFAULT_MODEL.to_string()),
            api_base_url: Some(DEFAULT_API_BASE_URL.to_string()),
            temperature: None,
            request_timeout_secs: None,
            log_level: Some("warn".to_string()),
            camera: CameraConfig {
                device: Some("/dev/video0".to_string()),
                ideal_width: Some(1280),
                ideal_height: Some(720),
                facing_mode: Some("environment".to_string()),
                command: None,
                args: None,
            },
        }
    }

    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> GeminiResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            Ok(config)
        } else {
            Ok(Self::defaults())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> GeminiResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            GeminiError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            GeminiError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Values taken from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty(API_KEY_ENV),
            model_name: non_empty(MODEL_ENV),
            ..Self::default()
        }
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            api_base_url: other
                .api_base_url
                .clone()
                .or_else(|| self.api_base_url.clone()),
            temperature: other.temperature.or(self.temperature),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            camera: self.camera.merge(&other.camera),
        }
    }

    /// Copy safe to print: the API key is masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(key) = &copy.api_key {
            let tail: String = key.chars().skip(key.chars().count().saturating_sub(4)).collect();
            copy.api_key = Some(format!("****{}", tail));
        }
        copy
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> GeminiResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        GeminiError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> GeminiResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
