//! Live Filter Settings
//!
//! Settings change from other threads (bindings, an operator surface) while
//! reports are being processed. Every field lives in its own atomic and the
//! engine reads each one exactly once per report through
//! [`LiveSettings::snapshot`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::canvas::error::{CanvasError, Result};

/// Divisor compensating for pen strokes being larger than mouse strokes
pub const DEFAULT_DEVICE_COMPENSATION: f32 = 8.0;

/// Millimeters per inch, the curve's velocity unit is inches per second
pub const MM_PER_INCH: f32 = 25.4;

/// What the reset timeout means for the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Positions pass through, the canvas follows the pen
    Absolute,
    /// Every accepted report starts a fresh contact
    EveryReport,
    /// Reset after an idle gap at least this long
    After(Duration),
}

impl ResetPolicy {
    /// Interpret a reset time in milliseconds
    pub fn from_millis(ms: i32) -> Self {
        match ms {
            ms if ms < 0 => ResetPolicy::Absolute,
            0 => ResetPolicy::EveryReport,
            ms => ResetPolicy::After(Duration::from_millis(ms as u64)),
        }
    }
}

/// Filter settings as configured, also the values bindings return to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Idle gap before the canvas resets (negative: absolute, zero: every report)
    #[serde(default = "default_reset_time_ms")]
    pub reset_time_ms: i32,

    /// Drop reports outside the full digitizer
    #[serde(default = "default_true")]
    pub ignore_oob_tablet_input: bool,

    /// Apply aspect-ratio correction
    #[serde(default = "default_true")]
    pub normalize_aspect_ratio: bool,

    /// Linear scale on displacement
    #[serde(default = "default_one")]
    pub speed_multiplier: f32,

    /// Apply the acceleration curve
    #[serde(default = "default_true")]
    pub acceleration_enabled: bool,

    /// Curve intensity, applied as its square root
    #[serde(default = "default_one")]
    pub acceleration_intensity: f32,

    /// Divisor applied to the curve multiplier
    #[serde(default = "default_device_compensation")]
    pub device_compensation: f32,
}

fn default_reset_time_ms() -> i32 {
    100
}
fn default_true() -> bool {
    true
}
fn default_one() -> f32 {
    1.0
}
fn default_device_compensation() -> f32 {
    DEFAULT_DEVICE_COMPENSATION
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            reset_time_ms: default_reset_time_ms(),
            ignore_oob_tablet_input: default_true(),
            normalize_aspect_ratio: default_true(),
            speed_multiplier: default_one(),
            acceleration_enabled: default_true(),
            acceleration_intensity: default_one(),
            device_compensation: default_device_compensation(),
        }
    }
}

impl FilterSettings {
    /// Check every value against its property's range
    pub fn validate(&self) -> Result<()> {
        for property in PropertyIndex::ALL {
            property.validate(self.value(property))?;
        }
        Ok(())
    }

    /// Value of one property
    pub fn value(&self, property: PropertyIndex) -> PropertyValue {
        match property {
            PropertyIndex::ResetTime => PropertyValue::Int(self.reset_time_ms),
            PropertyIndex::IgnoreOutOfBounds => PropertyValue::Bool(self.ignore_oob_tablet_input),
            PropertyIndex::NormalizeAspectRatio => PropertyValue::Bool(self.normalize_aspect_ratio),
            PropertyIndex::SpeedMultiplier => PropertyValue::Float(self.speed_multiplier),
            PropertyIndex::AccelerationEnabled => PropertyValue::Bool(self.acceleration_enabled),
            PropertyIndex::AccelerationIntensity => {
                PropertyValue::Float(self.acceleration_intensity)
            }
            PropertyIndex::DeviceCompensation => PropertyValue::Float(self.device_compensation),
        }
    }
}

/// Settings read once for one report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformConfig {
    /// Reset behavior
    pub reset: ResetPolicy,
    /// Drop reports outside the full digitizer
    pub ignore_oob_tablet_input: bool,
    /// Apply aspect-ratio correction
    pub normalize_aspect_ratio: bool,
    /// Linear displacement scale
    pub speed_multiplier: f32,
    /// Apply the acceleration curve
    pub acceleration_enabled: bool,
    /// Curve intensity
    pub acceleration_intensity: f32,
    /// Curve multiplier divisor
    pub device_compensation: f32,
}

impl TransformConfig {
    /// Factor applied on top of the raw curve multiplier
    pub fn acceleration_scale(&self) -> f32 {
        self.acceleration_intensity.sqrt() / self.device_compensation
    }
}

impl From<FilterSettings> for TransformConfig {
    fn from(settings: FilterSettings) -> Self {
        Self {
            reset: ResetPolicy::from_millis(settings.reset_time_ms),
            ignore_oob_tablet_input: settings.ignore_oob_tablet_input,
            normalize_aspect_ratio: settings.normalize_aspect_ratio,
            speed_multiplier: settings.speed_multiplier,
            acceleration_enabled: settings.acceleration_enabled,
            acceleration_intensity: settings.acceleration_intensity,
            device_compensation: settings.device_compensation,
        }
    }
}

/// Kind of value a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Float
    Float,
}

impl ValueKind {
    fn name(self) -> &'static str {
        match self {
            ValueKind::Int => "integer",
            ValueKind::Bool => "boolean",
            ValueKind::Float => "float",
        }
    }
}

/// Runtime-adjustable filter properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyIndex {
    /// Reset time in milliseconds
    #[serde(rename = "reset_time_ms")]
    ResetTime,
    /// Drop reports outside the digitizer
    #[serde(rename = "ignore_oob_tablet_input")]
    IgnoreOutOfBounds,
    /// Aspect-ratio correction
    #[serde(rename = "normalize_aspect_ratio")]
    NormalizeAspectRatio,
    /// Displacement scale
    #[serde(rename = "speed_multiplier")]
    SpeedMultiplier,
    /// Acceleration curve on/off
    #[serde(rename = "acceleration_enabled")]
    AccelerationEnabled,
    /// Acceleration intensity
    #[serde(rename = "acceleration_intensity")]
    AccelerationIntensity,
    /// Curve multiplier divisor
    #[serde(rename = "device_compensation")]
    DeviceCompensation,
}

impl PropertyIndex {
    /// Every property
    pub const ALL: [PropertyIndex; 7] = [
        PropertyIndex::ResetTime,
        PropertyIndex::IgnoreOutOfBounds,
        PropertyIndex::NormalizeAspectRatio,
        PropertyIndex::SpeedMultiplier,
        PropertyIndex::AccelerationEnabled,
        PropertyIndex::AccelerationIntensity,
        PropertyIndex::DeviceCompensation,
    ];

    /// Configuration key
    pub fn key(self) -> &'static str {
        match self {
            PropertyIndex::ResetTime => "reset_time_ms",
            PropertyIndex::IgnoreOutOfBounds => "ignore_oob_tablet_input",
            PropertyIndex::NormalizeAspectRatio => "normalize_aspect_ratio",
            PropertyIndex::SpeedMultiplier => "speed_multiplier",
            PropertyIndex::AccelerationEnabled => "acceleration_enabled",
            PropertyIndex::AccelerationIntensity => "acceleration_intensity",
            PropertyIndex::DeviceCompensation => "device_compensation",
        }
    }

    /// Human readable name, used in log messages
    pub fn display_name(self) -> &'static str {
        match self {
            PropertyIndex::ResetTime => "Reset Time",
            PropertyIndex::IgnoreOutOfBounds => "Ignore Input Outside Full Tablet Area",
            PropertyIndex::NormalizeAspectRatio => "Normalize Aspect Ratio",
            PropertyIndex::SpeedMultiplier => "Speed Multiplier",
            PropertyIndex::AccelerationEnabled => "Use Windows Mouse Acceleration Curve",
            PropertyIndex::AccelerationIntensity => "Acceleration Intensity",
            PropertyIndex::DeviceCompensation => "Device Compensation",
        }
    }

    /// Look up a property by key or display name
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.key() == name || p.display_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CanvasError::UnknownProperty(name.to_string()))
    }

    /// Value kind
    pub fn kind(self) -> ValueKind {
        match self {
            PropertyIndex::ResetTime => ValueKind::Int,
            PropertyIndex::IgnoreOutOfBounds
            | PropertyIndex::NormalizeAspectRatio
            | PropertyIndex::AccelerationEnabled => ValueKind::Bool,
            PropertyIndex::SpeedMultiplier
            | PropertyIndex::AccelerationIntensity
            | PropertyIndex::DeviceCompensation => ValueKind::Float,
        }
    }

    /// Coerce a value to this property's kind and check its range
    pub fn validate(self, value: PropertyValue) -> Result<PropertyValue> {
        let value = value.coerce(self.kind()).ok_or(CanvasError::PropertyTypeMismatch {
            property: self.display_name(),
            expected: self.kind().name(),
        })?;

        let in_range = match (self, value) {
            (PropertyIndex::SpeedMultiplier, PropertyValue::Float(v))
            | (PropertyIndex::AccelerationIntensity, PropertyValue::Float(v)) => {
                v.is_finite() && v >= 0.0
            }
            (PropertyIndex::DeviceCompensation, PropertyValue::Float(v)) => {
                v.is_finite() && v > 0.0
            }
            _ => true,
        };

        if in_range {
            Ok(value)
        } else {
            Err(CanvasError::InvalidPropertyValue(
                self.display_name(),
                value.to_string(),
            ))
        }
    }
}

impl fmt::Display for PropertyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Property value payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Integer payload
    Int(i32),
    /// Boolean payload
    Bool(bool),
    /// Float payload
    Float(f32),
}

impl PropertyValue {
    /// Kind of this payload
    pub fn kind(self) -> ValueKind {
        match self {
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Float(_) => ValueKind::Float,
        }
    }

    /// Convert to `kind`, widening integers to floats
    pub fn coerce(self, kind: ValueKind) -> Option<Self> {
        match (self, kind) {
            (value, kind) if value.kind() == kind => Some(value),
            (PropertyValue::Int(v), ValueKind::Float) => Some(PropertyValue::Float(v as f32)),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// `f32` stored as its bit pattern
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Filter settings shared between the binding layer and stream workers
#[derive(Debug)]
pub struct LiveSettings {
    defaults: FilterSettings,
    reset_time_ms: AtomicI32,
    ignore_oob_tablet_input: AtomicBool,
    normalize_aspect_ratio: AtomicBool,
    speed_multiplier: AtomicF32,
    acceleration_enabled: AtomicBool,
    acceleration_intensity: AtomicF32,
    device_compensation: AtomicF32,
}

impl LiveSettings {
    /// Create from configured values, which also become the defaults
    pub fn new(defaults: FilterSettings) -> Result<Self> {
        defaults.validate()?;
        Ok(Self::from_valid(defaults))
    }

    fn from_valid(defaults: FilterSettings) -> Self {
        Self {
            defaults,
            reset_time_ms: AtomicI32::new(defaults.reset_time_ms),
            ignore_oob_tablet_input: AtomicBool::new(defaults.ignore_oob_tablet_input),
            normalize_aspect_ratio: AtomicBool::new(defaults.normalize_aspect_ratio),
            speed_multiplier: AtomicF32::new(defaults.speed_multiplier),
            acceleration_enabled: AtomicBool::new(defaults.acceleration_enabled),
            acceleration_intensity: AtomicF32::new(defaults.acceleration_intensity),
            device_compensation: AtomicF32::new(defaults.device_compensation),
        }
    }

    /// Configured defaults
    pub fn defaults(&self) -> &FilterSettings {
        &self.defaults
    }

    /// Read every field once
    pub fn snapshot(&self) -> TransformConfig {
        TransformConfig {
            reset: ResetPolicy::from_millis(self.reset_time_ms.load(Ordering::Relaxed)),
            ignore_oob_tablet_input: self.ignore_oob_tablet_input.load(Ordering::Relaxed),
            normalize_aspect_ratio: self.normalize_aspect_ratio.load(Ordering::Relaxed),
            speed_multiplier: self.speed_multiplier.load(),
            acceleration_enabled: self.acceleration_enabled.load(Ordering::Relaxed),
            acceleration_intensity: self.acceleration_intensity.load(),
            device_compensation: self.device_compensation.load(),
        }
    }

    /// Current value of a property
    pub fn get(&self, property: PropertyIndex) -> PropertyValue {
        match property {
            PropertyIndex::ResetTime => {
                PropertyValue::Int(self.reset_time_ms.load(Ordering::Relaxed))
            }
            PropertyIndex::IgnoreOutOfBounds => {
                PropertyValue::Bool(self.ignore_oob_tablet_input.load(Ordering::Relaxed))
            }
            PropertyIndex::NormalizeAspectRatio => {
                PropertyValue::Bool(self.normalize_aspect_ratio.load(Ordering::Relaxed))
            }
            PropertyIndex::SpeedMultiplier => PropertyValue::Float(self.speed_multiplier.load()),
            PropertyIndex::AccelerationEnabled => {
                PropertyValue::Bool(self.acceleration_enabled.load(Ordering::Relaxed))
            }
            PropertyIndex::AccelerationIntensity => {
                PropertyValue::Float(self.acceleration_intensity.load())
            }
            PropertyIndex::DeviceCompensation => {
                PropertyValue::Float(self.device_compensation.load())
            }
        }
    }

    /// Configured default of a property
    pub fn default_value(&self, property: PropertyIndex) -> PropertyValue {
        self.defaults.value(property)
    }

    /// Set a property, rejecting values of the wrong kind or out of range
    ///
    /// Returns the stored value.
    pub fn set(&self, property: PropertyIndex, value: PropertyValue) -> Result<PropertyValue> {
        let value = property.validate(value)?;
        self.store(property, value)?;
        Ok(value)
    }

    /// Restore a property to its configured default
    pub fn reset(&self, property: PropertyIndex) -> Result<PropertyValue> {
        let value = self.default_value(property);
        self.store(property, value)?;
        Ok(value)
    }

    fn store(&self, property: PropertyIndex, value: PropertyValue) -> Result<()> {
        match (property, value) {
            (PropertyIndex::ResetTime, PropertyValue::Int(v)) => {
                self.reset_time_ms.store(v, Ordering::Relaxed)
            }
            (PropertyIndex::IgnoreOutOfBounds, PropertyValue::Bool(v)) => {
                self.ignore_oob_tablet_input.store(v, Ordering::Relaxed)
            }
            (PropertyIndex::NormalizeAspectRatio, PropertyValue::Bool(v)) => {
                self.normalize_aspect_ratio.store(v, Ordering::Relaxed)
            }
            (PropertyIndex::SpeedMultiplier, PropertyValue::Float(v)) => {
                self.speed_multiplier.store(v)
            }
            (PropertyIndex::AccelerationEnabled, PropertyValue::Bool(v)) => {
                self.acceleration_enabled.store(v, Ordering::Relaxed)
            }
            (PropertyIndex::AccelerationIntensity, PropertyValue::Float(v)) => {
                self.acceleration_intensity.store(v)
            }
            (PropertyIndex::DeviceCompensation, PropertyValue::Float(v)) => {
                self.device_compensation.store(v)
            }
            (property, _) => {
                return Err(CanvasError::PropertyTypeMismatch {
                    property: property.display_name(),
                    expected: property.kind().name(),
                })
            }
        }
        Ok(())
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self::from_valid(FilterSettings::default())
    }
}
