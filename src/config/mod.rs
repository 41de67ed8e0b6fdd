//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments

use anyhow::{Context, Result};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::canvas::binding::Binding;
use crate::canvas::relative::RelativeGeometry;
use crate::canvas::settings::{FilterSettings, LiveSettings};
use crate::canvas::snapshot::{
    AbsoluteOutputMode, DigitizerSpec, GeometrySnapshot, InputArea, OutputArea, OutputMode,
    RelativeOutputMode, ResolvedGeometry,
};

pub mod types;

pub use types::{BindingConfig, GeometryConfig, LoggingConfig, OutputModeKind, RelativeModeConfig};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Filter settings
    #[serde(default)]
    pub canvas: FilterSettings,
    /// Digitizer and output geometry
    pub geometry: GeometryConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Key bindings
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    ///
    /// A 152 x 95 mm digitizer reporting 100 units per millimeter, fully
    /// mapped onto a 1920 x 1080 output.
    pub fn default_config() -> Self {
        Config {
            canvas: FilterSettings::default(),
            geometry: GeometryConfig {
                digitizer_max: Vec2::new(15200.0, 9500.0),
                digitizer_size_mm: Vec2::new(152.0, 95.0),
                mode: OutputModeKind::Absolute,
                input: InputArea {
                    center: Vec2::new(76.0, 47.5),
                    size: Vec2::new(152.0, 95.0),
                    rotation_deg: 0.0,
                },
                output: OutputArea {
                    center: Vec2::new(960.0, 540.0),
                    size: Vec2::new(1920.0, 1080.0),
                },
                area_clipping: true,
                area_limiting: false,
                relative: RelativeModeConfig::default(),
            },
            logging: LoggingConfig::default(),
            bindings: Vec::new(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let settings = LiveSettings::new(self.canvas).context("Invalid canvas settings")?;

        // Geometry must resolve to something the filters accept
        let geometry = self.to_resolved_geometry();
        match self.geometry.mode {
            OutputModeKind::Absolute => {
                GeometrySnapshot::new(&geometry).context("Invalid absolute geometry")?;
            }
            OutputModeKind::Relative => {
                RelativeGeometry::new(&geometry).context("Invalid relative geometry")?;
            }
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        let mut names = HashSet::new();
        for binding in &self.bindings {
            if binding.name.trim().is_empty() {
                anyhow::bail!("Binding for {} has an empty name", binding.property);
            }
            if !names.insert(binding.name.as_str()) {
                anyhow::bail!("Duplicate binding name: {}", binding.name);
            }
        }
        self.build_bindings(&settings)?;

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, reset_time_ms: Option<i32>, speed_multiplier: Option<f32>) -> Self {
        if let Some(reset_time_ms) = reset_time_ms {
            self.canvas.reset_time_ms = reset_time_ms;
        }
        if let Some(speed_multiplier) = speed_multiplier {
            self.canvas.speed_multiplier = speed_multiplier;
        }
        self
    }

    /// Resolve the configured geometry into an output mode
    pub fn to_resolved_geometry(&self) -> ResolvedGeometry {
        let geometry = &self.geometry;
        let digitizer = DigitizerSpec::new(geometry.digitizer_max, geometry.digitizer_size_mm);

        let mode = match geometry.mode {
            OutputModeKind::Absolute => OutputMode::Absolute(
                AbsoluteOutputMode::new(&digitizer, geometry.input, geometry.output)
                    .with_area_clipping(geometry.area_clipping)
                    .with_area_limiting(geometry.area_limiting),
            ),
            OutputModeKind::Relative => OutputMode::Relative(RelativeOutputMode::new(
                &digitizer,
                geometry.relative.sensitivity,
                geometry.relative.rotation_deg,
            )),
        };

        ResolvedGeometry { digitizer, mode }
    }

    /// Build the configured bindings against `settings`, keyed by name
    pub fn build_bindings(&self, settings: &LiveSettings) -> Result<BTreeMap<String, Binding>> {
        self.bindings
            .iter()
            .map(|config| {
                let binding =
                    Binding::new(settings, config.property, config.action, config.value)
                        .with_context(|| format!("Invalid binding: {}", config.name))?;
                Ok((config.name.clone(), binding))
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::binding::BindingAction;
    use crate::canvas::settings::{PropertyIndex, PropertyValue};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.canvas.reset_time_ms, 100);
        assert_eq!(config.geometry.mode, OutputModeKind::Absolute);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default_config();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_degenerate_output() {
        let mut config = Config::default_config();
        config.geometry.output.size = Vec2::new(0.0, 1080.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_compensation() {
        let mut config = Config::default_config();
        config.canvas.device_compensation = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_duplicate_binding() {
        let mut config = Config::default_config();
        let binding = BindingConfig {
            name: "precision".to_string(),
            property: PropertyIndex::SpeedMultiplier,
            action: BindingAction::Hold,
            value: Some(PropertyValue::Float(0.25)),
        };
        config.bindings = vec![binding.clone(), binding];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_overrides() {
        let config = Config::default_config().with_overrides(Some(-1), Some(2.5));
        assert_eq!(config.canvas.reset_time_ms, -1);
        assert_eq!(config.canvas.speed_multiplier, 2.5);

        let untouched = Config::default_config().with_overrides(None, None);
        assert_eq!(untouched.canvas, FilterSettings::default());
    }

    #[test]
    fn test_relative_mode_resolves() {
        let mut config = Config::default_config();
        config.geometry.mode = OutputModeKind::Relative;
        assert!(config.validate().is_ok());
        assert_eq!(config.to_resolved_geometry().mode.kind(), "relative");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
[canvas]
reset_time_ms = 250
speed_multiplier = 1.5

[geometry]
digitizer_max = [15200.0, 9500.0]
digitizer_size_mm = [152.0, 95.0]

[geometry.input]
center = [76.0, 47.5]
size = [100.0, 60.0]
rotation_deg = 90.0

[geometry.output]
center = [960.0, 540.0]
size = [1920.0, 1080.0]

[[bindings]]
name = "precision"
property = "speed_multiplier"
action = "hold"
value = 0.25

[[bindings]]
name = "accel"
property = "acceleration_enabled"
action = "toggle"
"#
        )
        .expect("write config");

        let config = Config::load(file.path()).expect("load config");
        assert_eq!(config.canvas.reset_time_ms, 250);
        assert_eq!(config.canvas.speed_multiplier, 1.5);
        assert!(config.canvas.acceleration_enabled);
        assert_eq!(config.geometry.input.rotation_deg, 90.0);
        assert!(config.geometry.area_clipping);
        assert_eq!(config.logging.level, "info");

        let settings = LiveSettings::new(config.canvas).expect("settings");
        let bindings = config.build_bindings(&settings).expect("bindings");
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings["precision"].value(), PropertyValue::Float(0.25));
        assert_eq!(bindings["accel"].value(), PropertyValue::Bool(false));
    }

    #[test]
    fn test_load_rejects_missing_file() {
        assert!(Config::load("/nonexistent/canvas-remap.toml").is_err());
    }
}
