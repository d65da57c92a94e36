//! Configuration file support for snipkeep.
//!
//! This module handles loading and validating user settings from the configuration file
//! located at `~/.config/snipkeep/config.toml`. Settings cover capture timing, the output
//! location, and the snipping tool launch chain.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod types;

pub use types::{CaptureConfig, LauncherConfig, OutputConfig};

use anyhow::{Context, Result};
use log::{debug, info};
use schemars::{JsonSchema, Schema};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{
    CaptureRequest,
    file::{self, FileSaveConfig},
    launcher::default_strategies,
    poller::PollOptions,
};

/// Main configuration structure containing all user settings.
///
/// # Example TOML
/// ```toml
/// [capture]
/// timeout_ms = 30000
/// interval_ms = 250
///
/// [output]
/// directory = "~/Pictures/openweb_images"
///
/// [[launcher.strategies]]
/// label = "ms-screenclip via cmd start"
/// program = "cmd"
/// args = ["/c", "start", "", "ms-screenclip:"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Capture timing (poll deadline, interval, settle delay)
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Output directory and file naming
    #[serde(default)]
    pub output: OutputConfig,

    /// Snipping tool launch chain
    #[serde(default)]
    pub launcher: LauncherConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Validated ranges:
    /// - `timeout_ms`: 1000 - 600000
    /// - `interval_ms`: 50 - 5000, and never above `timeout_ms`
    /// - `settle_delay_ms`: 0 - 5000
    /// - `launch_grace_ms`: 100 - 30000
    fn validate_and_clamp(&mut self) {
        let capture = &mut self.capture;

        if !(1_000..=600_000).contains(&capture.timeout_ms) {
            log::warn!(
                "Invalid timeout_ms {}, clamping to 1000-600000 range",
                capture.timeout_ms
            );
            capture.timeout_ms = capture.timeout_ms.clamp(1_000, 600_000);
        }

        if !(50..=5_000).contains(&capture.interval_ms) {
            log::warn!(
                "Invalid interval_ms {}, clamping to 50-5000 range",
                capture.interval_ms
            );
            capture.interval_ms = capture.interval_ms.clamp(50, 5_000);
        }

        if capture.interval_ms > capture.timeout_ms {
            log::warn!(
                "interval_ms {} exceeds timeout_ms {}, using the timeout as interval",
                capture.interval_ms,
                capture.timeout_ms
            );
            capture.interval_ms = capture.timeout_ms;
        }

        if capture.settle_delay_ms > 5_000 {
            log::warn!(
                "Invalid settle_delay_ms {}, clamping to 0-5000 range",
                capture.settle_delay_ms
            );
            capture.settle_delay_ms = 5_000;
        }

        if !(100..=30_000).contains(&capture.launch_grace_ms) {
            log::warn!(
                "Invalid launch_grace_ms {}, clamping to 100-30000 range",
                capture.launch_grace_ms
            );
            capture.launch_grace_ms = capture.launch_grace_ms.clamp(100, 30_000);
        }

        if self.output.filename_prefix.trim().is_empty()
            || self
                .output
                .filename_prefix
                .contains(['/', '\\', ':'])
        {
            log::warn!(
                "Invalid filename_prefix '{}', falling back to 'snip'",
                self.output.filename_prefix
            );
            self.output.filename_prefix = "snip".to_string();
        }

        self.launcher.strategies.retain(|strategy| {
            let keep = !strategy.program.trim().is_empty();
            if !keep {
                log::warn!("Dropping launch strategy '{}' without a program", strategy.label);
            }
            keep
        });

        if self.launcher.strategies.is_empty() {
            log::warn!("No launch strategies configured, using the built-in list");
            self.launcher.strategies = default_strategies();
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// The config file is located at `~/.config/snipkeep/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("snipkeep");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from file, or returns defaults if not found.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The config directory path cannot be determined
    /// - The file exists but cannot be read
    /// - The file exists but contains invalid TOML syntax
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let config = Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(source: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(source)?;
        config.validate_and_clamp();
        Ok(config)
    }

    /// Writes the effective configuration to the config file, replacing it.
    ///
    /// Returns the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Serializes to TOML at `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let rendered = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, rendered)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        info!("Wrote config to {}", path.display());
        Ok(())
    }

    /// Creates a default configuration file with documentation comments.
    ///
    /// Writes the example config from `config.example.toml` to the user's config directory
    /// and returns its path.
    ///
    /// # Errors
    /// Returns an error if:
    /// - A config file already exists at the target path
    /// - The config directory cannot be created
    /// - The file cannot be written
    pub fn create_default_file() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            return Err(anyhow::anyhow!(
                "Config file already exists at {}",
                config_path.display()
            ));
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&config_path, EXAMPLE_CONFIG)?;

        info!("Created default config at {}", config_path.display());
        Ok(config_path)
    }

    /// Applies command-line overrides, re-validating the result.
    pub fn apply_overrides(&mut self, timeout_ms: Option<u64>, output_dir: Option<String>) {
        if let Some(timeout_ms) = timeout_ms {
            self.capture.timeout_ms = timeout_ms;
        }
        if let Some(dir) = output_dir {
            self.output.directory = Some(dir);
        }
        self.validate_and_clamp();
    }

    /// JSON schema describing the config file.
    pub fn json_schema() -> Schema {
        schemars::schema_for!(Config)
    }

    /// Output location derived from `[output]`.
    pub fn save_config(&self) -> FileSaveConfig {
        FileSaveConfig {
            save_directory: self
                .output
                .directory
                .as_deref()
                .map(file::expand_tilde)
                .unwrap_or_else(file::default_save_directory),
            filename_prefix: self.output.filename_prefix.clone(),
        }
    }

    /// Request template used for every capture.
    pub fn capture_request(&self) -> CaptureRequest {
        CaptureRequest {
            strategies: self.launcher.strategies.clone(),
            poll: PollOptions {
                timeout: Duration::from_millis(self.capture.timeout_ms),
                interval: Duration::from_millis(self.capture.interval_ms),
            },
            settle_delay: Duration::from_millis(self.capture.settle_delay_ms),
            save_config: self.save_config(),
        }
    }

    pub fn launch_grace(&self) -> Duration {
        Duration::from_millis(self.capture.launch_grace_ms)
    }
}

/// Documented example written by [`Config::create_default_file`].
pub const EXAMPLE_CONFIG: &str = include_str!("../../config.example.toml");
