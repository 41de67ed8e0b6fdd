//! Property Bindings
//!
//! Key bindings that adjust a live filter property. The payload a binding
//! applies is resolved once when the binding is built; pressing and
//! releasing only compares and stores values.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::canvas::error::Result;
use crate::canvas::settings::{LiveSettings, PropertyIndex, PropertyValue};

/// How a binding reacts to press and release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingAction {
    /// Each press switches between the bound value and the default
    Toggle,
    /// The bound value applies while held
    Hold,
}

/// Binding of one property to one action
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    property: PropertyIndex,
    action: BindingAction,
    value: PropertyValue,
}

impl Binding {
    /// Build a binding against the settings' defaults
    ///
    /// Boolean properties always bind the inverse of their default. Numeric
    /// properties need `value`; without one the binding is a no-op that
    /// stores the default.
    pub fn new(
        settings: &LiveSettings,
        property: PropertyIndex,
        action: BindingAction,
        value: Option<PropertyValue>,
    ) -> Result<Self> {
        let default = settings.default_value(property);
        let value = match (default, value) {
            (PropertyValue::Bool(b), _) => PropertyValue::Bool(!b),
            (_, Some(value)) => property.validate(value)?,
            (default, None) => default,
        };

        Ok(Self {
            property,
            action,
            value,
        })
    }

    /// Bound property
    pub fn property(&self) -> PropertyIndex {
        self.property
    }

    /// Binding action
    pub fn action(&self) -> BindingAction {
        self.action
    }

    /// Value applied on press
    pub fn value(&self) -> PropertyValue {
        self.value
    }

    /// Handle a key press, returning the property's new value
    pub fn press(&self, settings: &LiveSettings) -> Result<PropertyValue> {
        match self.action {
            BindingAction::Hold => self.apply(settings),
            BindingAction::Toggle => match settings.get(self.property) {
                PropertyValue::Bool(current) => {
                    let value = settings.set(self.property, PropertyValue::Bool(!current))?;
                    info!("{} was set to {}", self.property, value);
                    Ok(value)
                }
                current if current == self.value => self.restore(settings),
                _ => self.apply(settings),
            },
        }
    }

    /// Handle a key release, returning the property's value afterwards
    pub fn release(&self, settings: &LiveSettings) -> Result<PropertyValue> {
        match self.action {
            BindingAction::Hold => self.restore(settings),
            BindingAction::Toggle => Ok(settings.get(self.property)),
        }
    }

    fn apply(&self, settings: &LiveSettings) -> Result<PropertyValue> {
        let value = settings.set(self.property, self.value)?;
        info!("{} was set to {}", self.property, value);
        Ok(value)
    }

    fn restore(&self, settings: &LiveSettings) -> Result<PropertyValue> {
        let value = settings.reset(self.property)?;
        info!("{} was reset to {}", self.property, value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::error::CanvasError;

    #[test]
    fn test_bool_toggle_flips() {
        let settings = LiveSettings::default();
        let binding = Binding::new(
            &settings,
            PropertyIndex::AccelerationEnabled,
            BindingAction::Toggle,
            None,
        )
        .expect("valid binding");

        assert_eq!(binding.press(&settings).ok(), Some(PropertyValue::Bool(false)));
        assert_eq!(binding.release(&settings).ok(), Some(PropertyValue::Bool(false)));
        assert_eq!(binding.press(&settings).ok(), Some(PropertyValue::Bool(true)));
    }

    #[test]
    fn test_numeric_toggle_switches_with_default() {
        let settings = LiveSettings::default();
        let binding = Binding::new(
            &settings,
            PropertyIndex::SpeedMultiplier,
            BindingAction::Toggle,
            Some(PropertyValue::Float(0.25)),
        )
        .expect("valid binding");

        binding.press(&settings).expect("press");
        assert_eq!(settings.snapshot().speed_multiplier, 0.25);
        binding.press(&settings).expect("press");
        assert_eq!(settings.snapshot().speed_multiplier, 1.0);
    }

    #[test]
    fn test_hold_applies_while_pressed() {
        let settings = LiveSettings::default();
        let binding = Binding::new(
            &settings,
            PropertyIndex::ResetTime,
            BindingAction::Hold,
            Some(PropertyValue::Int(-1)),
        )
        .expect("valid binding");

        binding.press(&settings).expect("press");
        assert_eq!(settings.get(PropertyIndex::ResetTime), PropertyValue::Int(-1));
        binding.release(&settings).expect("release");
        assert_eq!(settings.get(PropertyIndex::ResetTime), PropertyValue::Int(100));
    }

    #[test]
    fn test_hold_bool_binds_inverse_default() {
        let settings = LiveSettings::default();
        let binding = Binding::new(
            &settings,
            PropertyIndex::NormalizeAspectRatio,
            BindingAction::Hold,
            Some(PropertyValue::Bool(true)),
        )
        .expect("valid binding");

        assert_eq!(binding.value(), PropertyValue::Bool(false));
        binding.press(&settings).expect("press");
        assert!(!settings.snapshot().normalize_aspect_ratio);
        binding.release(&settings).expect("release");
        assert!(settings.snapshot().normalize_aspect_ratio);
    }

    #[test]
    fn test_invalid_bound_value_rejected() {
        let settings = LiveSettings::default();
        let err = Binding::new(
            &settings,
            PropertyIndex::AccelerationIntensity,
            BindingAction::Hold,
            Some(PropertyValue::Float(-2.0)),
        )
        .unwrap_err();
        assert!(matches!(err, CanvasError::InvalidPropertyValue(_, _)));

        let err = Binding::new(
            &settings,
            PropertyIndex::ResetTime,
            BindingAction::Hold,
            Some(PropertyValue::Bool(true)),
        )
        .unwrap_err();
        assert!(matches!(err, CanvasError::PropertyTypeMismatch { .. }));
    }
}
