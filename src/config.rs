//! Configuration file support for annobox.
//!
//! Settings are stored as versioned JSON. Missing fields fall back to their
//! defaults so older files keep loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HANDLE_SIZE, DEFAULT_MAX_DISPLAY_HEIGHT, DEFAULT_MAX_DISPLAY_WIDTH,
    DEFAULT_MIN_BOX_SIZE,
};
use crate::geometry::Bounds;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Label given to boxes whose label is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LabelFallback {
    /// Always rewrite to `"unlabeled"`.
    #[default]
    Unlabeled,
    /// Rewrite to the first remaining label, or `"unlabeled"` if none remain.
    FirstRemaining,
}

/// What to do with proposals whose label is not in the label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLabelPolicy {
    /// Keep the box with a dangling label and log a warning.
    #[default]
    LogOnly,
    /// Add the label (with a generated color) before adding the box.
    AutoAdd,
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Engine configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Version of the configuration file format
    pub version: u32,
    /// Images wider than this are downscaled for display
    pub max_display_width: f64,
    /// Images taller than this are downscaled for display
    pub max_display_height: f64,
    /// Minimum box width and height in display pixels
    pub min_box_size: f64,
    /// Side of the square hit region around each corner handle
    pub handle_size: f64,
    pub label_fallback: LabelFallback,
    pub unknown_label_policy: UnknownLabelPolicy,
    /// Log verbosity level
    pub log_level: LogLevel,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            max_display_width: DEFAULT_MAX_DISPLAY_WIDTH,
            max_display_height: DEFAULT_MAX_DISPLAY_HEIGHT,
            min_box_size: DEFAULT_MIN_BOX_SIZE,
            handle_size: DEFAULT_HANDLE_SIZE,
            label_fallback: LabelFallback::default(),
            unknown_label_policy: UnknownLabelPolicy::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl AnnotatorConfig {
    /// The display cap as bounds.
    pub fn max_display(&self) -> Bounds {
        Bounds::new(self.max_display_width, self.max_display_height)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        if !(config.min_box_size >= 0.0 && config.handle_size > 0.0) {
            return Err(ConfigError::Invalid(
                "min_box_size must be >= 0 and handle_size > 0".to_string(),
            ));
        }
        if !(config.max_display_width > 0.0 && config.max_display_height > 0.0) {
            return Err(ConfigError::Invalid(
                "display cap must be positive".to_string(),
            ));
        }

        Ok(config)
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "annobox-config.json"
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
