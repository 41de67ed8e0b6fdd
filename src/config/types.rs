//! Configuration type definitions

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::canvas::binding::BindingAction;
use crate::canvas::settings::{PropertyIndex, PropertyValue};
use crate::canvas::snapshot::{InputArea, OutputArea};

/// Which output mode the geometry resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputModeKind {
    /// Input area mapped onto the output area
    #[default]
    Absolute,
    /// Displacement scaled by sensitivity
    Relative,
}

/// Digitizer and output-mode geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Maximum digitizer coordinate on each axis
    pub digitizer_max: Vec2,

    /// Physical digitizer size in millimeters
    pub digitizer_size_mm: Vec2,

    /// Output mode
    #[serde(default)]
    pub mode: OutputModeKind,

    /// Input area in millimeters
    pub input: InputArea,

    /// Output area
    pub output: OutputArea,

    /// Clamp out-of-area input onto the input area
    #[serde(default = "default_area_clipping")]
    pub area_clipping: bool,

    /// Drop out-of-area input
    #[serde(default)]
    pub area_limiting: bool,

    /// Relative mode parameters
    #[serde(default)]
    pub relative: RelativeModeConfig,
}

fn default_area_clipping() -> bool {
    true
}

/// Relative output mode parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelativeModeConfig {
    /// Output units per millimeter
    #[serde(default = "default_sensitivity")]
    pub sensitivity: Vec2,

    /// Rotation in degrees
    #[serde(default)]
    pub rotation_deg: f32,
}

fn default_sensitivity() -> Vec2 {
    Vec2::splat(10.0)
}

impl Default for RelativeModeConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            rotation_deg: 0.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files (None = stderr only)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log format ("pretty", "compact", "json")
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            format: default_log_format(),
        }
    }
}

/// Key binding adjusting a filter property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Name used by trace events to press and release the binding
    pub name: String,

    /// Property key, e.g. "speed_multiplier"
    pub property: PropertyIndex,

    /// "toggle" or "hold"
    pub action: BindingAction,

    /// Value applied by numeric bindings (ignored for boolean properties)
    #[serde(default)]
    pub value: Option<PropertyValue>,
}
