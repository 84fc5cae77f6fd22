//! Tool configuration: where the YAML sources live and where generated
//! firmware trees are written.
//!
//! Stored as TOML in the platform config directory. Either path can be
//! overridden per invocation with `--config-dir` / `--output-dir`.

use crate::constants::APP_BINARY_NAME;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem locations the tool reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Directory holding `keymap.yaml`, `boards.yaml`, and `aliases.yaml`.
    pub config_dir: PathBuf,
    /// Directory the generated firmware trees land under.
    pub output_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            output_dir: PathBuf::from("./generated"),
        }
    }
}

/// Persistent tool configuration.
///
/// # File Location
///
/// - Linux: `~/.config/keymapgen/config.toml`
/// - macOS: `~/Library/Application Support/keymapgen/config.toml`
/// - Windows: `%APPDATA%\keymapgen\config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// File system paths.
    #[serde(default)]
    pub paths: PathConfig,
}

impl Config {
    /// Creates a new Config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if the config file exists on disk.
    #[must_use]
    pub fn exists() -> bool {
        Self::config_file_path()
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    /// Gets the platform-specific config directory path.
    ///
    /// `KEYMAPGEN_CONFIG_DIR` overrides the platform directory, which keeps
    /// tests and throwaway environments away from the user's real config.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os("KEYMAPGEN_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_BINARY_NAME);

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(&config_path).context(format!(
            "Failed to read config file: {}",
            config_path.display()
        ))?;

        let config: Self = toml::from_str(&content).context(format!(
            "Failed to parse config file: {}",
            config_path.display()
        ))?;

        Ok(config)
    }

    /// Saves configuration to the config file using atomic write.
    ///
    /// Uses temp file + rename pattern for atomic writes.
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).context(format!(
            "Failed to create config directory: {}",
            config_dir.display()
        ))?;

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        let config_path = Self::config_file_path()?;
        let temp_path = config_path.with_extension("toml.tmp");

        fs::write(&temp_path, content).context(format!(
            "Failed to write temp config file: {}",
            temp_path.display()
        ))?;

        fs::rename(&temp_path, &config_path).context(format!(
            "Failed to rename temp config file to: {}",
            config_path.display()
        ))?;

        Ok(())
    }

    /// Source directory for one invocation: the flag wins over the saved
    /// configuration.
    #[must_use]
    pub fn resolve_config_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map_or_else(|| self.paths.config_dir.clone(), Path::to_path_buf)
    }

    /// Output directory for one invocation: the flag wins over the saved
    /// configuration.
    #[must_use]
    pub fn resolve_output_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map_or_else(|| self.paths.output_dir.clone(), Path::to_path_buf)
    }
}
