//! Configuration for vision-rs
//!
//! Settings are grouped by concern:
//! - [`CaptureConfig`] - which device feeds the root channel and how fast
//! - [`FilterConfig`] - parameters for the quantize and cartoonize stages
//! - [`RuntimeConfig`] - drive loop idling and command polling
//! - [`DisplayConfig`] - optional PNG snapshots of every window
//! - [`LoggingConfig`] - log filter and optional rolling log file
//!
//! Every field has a default, so a config file only needs the keys it changes.
//!
//! # Files
//!
//! The format follows the file extension: `.json` is JSON, anything else is
//! TOML. Without `--config` the binary looks for `config.toml` in the
//! platform configuration directory:
//! - **Linux**: `~/.config/vision-rs/`
//! - **macOS**: `~/Library/Application Support/vision-rs/`
//! - **Windows**: `%APPDATA%\vision-rs\`
//!
//! # Example
//!
//! ```toml
//! [capture]
//! fps = 15
//!
//! [capture.source]
//! type = "image_dir"
//! path = "frames/"
//!
//! [filters]
//! quantize_levels = 8
//! ```

use crate::capture::SyntheticPattern;
use crate::error::{Result, VisionError};
use crate::filters::{DEFAULT_CARTOON_THRESHOLD, DEFAULT_QUANTIZE_LEVELS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory name under the platform config dir
pub const APP_DIR: &str = "vision-rs";

/// Default config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default capture rate in frames per second
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

/// Default path for the config file, if the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub capture: CaptureConfig,
    pub filters: FilterConfig,
    pub runtime: RuntimeConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureSource {
    /// Generated test pattern
    Synthetic {
        width: u32,
        height: u32,
        #[serde(default)]
        pattern: SyntheticPattern,
    },
    /// Still images replayed from a directory
    ImageDir { path: PathBuf },
}

impl Default for CaptureSource {
    fn default() -> Self {
        CaptureSource::Synthetic {
            width: 640,
            height: 480,
            pattern: SyntheticPattern::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Rate requested from the device
    pub fps: u32,
    /// Minimum gap between "failed to capture" warnings
    pub warn_interval_ms: u64,
    pub source: CaptureSource,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_CAPTURE_FPS,
            warn_interval_ms: 1000,
            source: CaptureSource::default(),
        }
    }
}

impl CaptureConfig {
    pub fn warn_interval(&self) -> Duration {
        Duration::from_millis(self.warn_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Levels per channel for the quantize stage
    pub quantize_levels: u32,
    /// Magnitude above which cartoonize paints a pixel black
    pub cartoon_threshold: u8,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            quantize_levels: DEFAULT_QUANTIZE_LEVELS,
            cartoon_threshold: DEFAULT_CARTOON_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Sleep per iteration while a task is paused; 0 yields instead
    pub pause_idle_ms: u64,
    /// How long the stdin command source waits for a key each iteration
    pub command_poll_ms: u64,
    /// Stop the run loop after this many iterations
    pub max_iterations: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pause_idle_ms: 1,
            command_poll_ms: 1,
            max_iterations: None,
        }
    }
}

impl RuntimeConfig {
    pub fn pause_idle(&self) -> Duration {
        Duration::from_millis(self.pause_idle_ms)
    }

    pub fn command_poll(&self) -> Duration {
        Duration::from_millis(self.command_poll_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Save every window as a PNG into this directory
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: None,
            snapshot_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: Option<String>,
    /// Write a daily rolling log file here in addition to stderr
    pub directory: Option<PathBuf>,
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

impl VisionConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisionError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| {
                VisionError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                VisionError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VisionError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self)
                .map_err(|e| VisionError::Config(format!("Failed to serialize config: {}", e)))?
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| VisionError::Config(format!("Failed to serialize config: {}", e)))?
        };

        std::fs::write(path, content)
            .map_err(|e| VisionError::Config(format!("Failed to write config: {}", e)))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.capture.fps == 0 {
            return Err(VisionError::Config("capture.fps must be at least 1".into()));
        }
        if !(1..=255).contains(&self.filters.quantize_levels) {
            return Err(VisionError::Config(format!(
                "filters.quantize_levels must be in 1..=255, got {}",
                self.filters.quantize_levels
            )));
        }
        if let CaptureSource::Synthetic { width, height, .. } = self.capture.source {
            if width == 0 || height == 0 {
                return Err(VisionError::Config(format!(
                    "synthetic source needs a non-zero size, got {}x{}",
                    width, height
                )));
            }
        }
        Ok(())
    }
}
