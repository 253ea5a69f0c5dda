use crate::preview::{DEFAULT_MAX_ROWS, DEFAULT_MIN_ROWS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,

    /// "suite" records a suite, anything else a single journey
    #[serde(default = "default_recording_type")]
    pub recording_type: String,

    #[serde(default = "default_recorder_command")]
    pub recorder_command: String,

    /// Seconds before a recording is stopped; unset waits forever
    #[serde(default)]
    pub record_timeout: Option<u64>,

    #[serde(default = "default_color")]
    pub color: bool,

    #[serde(default = "default_preview_max_rows")]
    pub preview_max_rows: usize,

    #[serde(default = "default_preview_min_rows")]
    pub preview_min_rows: usize,
}

fn default_url() -> String {
    "https://example.com".to_string()
}

fn default_recording_type() -> String {
    "inline".to_string()
}

fn default_recorder_command() -> String {
    r#"npx playwright codegen --target javascript -o "$JOURNEY_OUTPUT" "$JOURNEY_URL""#.to_string()
}

fn default_color() -> bool {
    true
}

fn default_preview_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

fn default_preview_min_rows() -> usize {
    DEFAULT_MIN_ROWS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            recording_type: default_recording_type(),
            recorder_command: default_recorder_command(),
            record_timeout: None,
            color: default_color(),
            preview_max_rows: default_preview_max_rows(),
            preview_min_rows: default_preview_min_rows(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/journey-recorder/config.json)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `config_path`, writing defaults there if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("journey-recorder").join("config.json"))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.record_timeout.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(anyhow::anyhow!("url must start with http:// or https://"));
        }

        if self.recorder_command.trim().is_empty() {
            return Err(anyhow::anyhow!("recorder_command cannot be empty"));
        }

        if self.record_timeout == Some(0) {
            return Err(anyhow::anyhow!("record_timeout must be at least 1 second"));
        }

        if self.preview_max_rows == 0 {
            return Err(anyhow::anyhow!("preview_max_rows must be at least 1"));
        }

        if self.preview_min_rows > self.preview_max_rows {
            return Err(anyhow::anyhow!(
                "preview_min_rows cannot exceed preview_max_rows"
            ));
        }

        Ok(())
    }
}
