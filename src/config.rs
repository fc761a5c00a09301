//! Settings file and application paths.
//!
//! Directory priority:
//! 1. CLI `--config-dir`
//! 2. `PLAYBRIDGE_CONFIG_DIR` environment variable
//! 3. Current directory IF a `playbridge.json` or `playbridge.log` lives there
//! 4. Platform directory from dirs-next
//!
//! Platform paths:
//! - Linux: ~/.config/playbridge/{name}
//! - macOS: ~/Library/Application Support/playbridge/{name}
//! - Windows: %APPDATA%\playbridge\{name}

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::async_queue::DEFAULT_WARN_LEN;
use crate::core::synchronizer::POLL_INTERVAL_MS;

/// Settings file name inside the config directory.
pub const SETTINGS_FILE: &str = "playbridge.json";

/// Default log file name inside the data directory.
pub const LOG_FILE: &str = "playbridge.log";

const APP_DIR: &str = "playbridge";

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (PLAYBRIDGE_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| {
            std::env::var("PLAYBRIDGE_CONFIG_DIR")
                .ok()
                .map(PathBuf::from)
        });

        Self { config_dir }
    }
}

/// Runtime settings for the processing loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Poll tick period
    pub poll_interval_ms: u64,
    /// Queue backlog that triggers a warning
    pub queue_warn_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
            queue_warn_len: DEFAULT_WARN_LEN,
        }
    }
}

/// Settings validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroPollInterval,
    ZeroQueueWarnLen,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroPollInterval => write!(f, "poll_interval_ms must be greater than 0"),
            ConfigError::ZeroQueueWarnLen => write!(f, "queue_warn_len must be greater than 0"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Settings {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.queue_warn_len == 0 {
            return Err(ConfigError::ZeroQueueWarnLen);
        }
        Ok(())
    }

    /// Load settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        settings.validate()?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }
}

/// Get path to a configuration file
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Get path to a data file (logs)
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    // Only create data_dir if it's different from config_dir
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir())
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir())
}

fn resolve_dir(config: &PathConfig, platform: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    if let Ok(current_dir) = std::env::current_dir() {
        if has_local_config_files(&current_dir) {
            return current_dir;
        }
    }

    platform
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}
