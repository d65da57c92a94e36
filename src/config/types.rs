//! Configuration type definitions.

use crate::capture::launcher::{LaunchStrategy, default_strategies};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Timing of a capture flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CaptureConfig {
    /// How long to wait for a new clipboard image, in milliseconds (valid range: 1000 - 600000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Clipboard sampling interval in milliseconds (valid range: 50 - 5000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Pause after launching the snipping tool before the first sample (valid range: 0 - 5000)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// A launch command still running after this many milliseconds counts as started
    /// (valid range: 100 - 30000)
    #[serde(default = "default_launch_grace_ms")]
    pub launch_grace_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            interval_ms: default_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            launch_grace_ms: default_launch_grace_ms(),
        }
    }
}

/// Where snips are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputConfig {
    /// Output directory; `~/` is expanded. Defaults to `<Pictures>/openweb_images`
    #[serde(default)]
    pub directory: Option<String>,

    /// File name prefix; files are named `<prefix>_<unix ms>.png`
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filename_prefix: default_filename_prefix(),
        }
    }
}

/// Snipping tool invocation chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LauncherConfig {
    /// Strategies tried in order until one starts; the first success wins
    #[serde(default = "default_strategies")]
    pub strategies: Vec<LaunchStrategy>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_interval_ms() -> u64 {
    250
}

fn default_settle_delay_ms() -> u64 {
    300
}

fn default_launch_grace_ms() -> u64 {
    2_000
}

fn default_filename_prefix() -> String {
    "snip".to_string()
}
