//! Geometry Snapshot
//!
//! Output-mode geometry as resolved by the host, and the validated snapshot
//! the engine derives from it. A snapshot is built once per published
//! geometry and shared behind `Arc`; reconfiguration replaces it wholesale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::{Affine2, Mat2, Vec2};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::canvas::error::{CanvasError, Result};
use crate::canvas::geometry::{normalize_rotation, RotatedRect};
use crate::canvas::normalizer::{aspect_ratio_correction, MIN_DETERMINANT};

/// Physical description of the digitizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DigitizerSpec {
    /// Maximum reported coordinate on each axis
    pub max: Vec2,

    /// Physical sensing area in millimeters
    pub physical_size_mm: Vec2,
}

impl DigitizerSpec {
    /// Create a digitizer description
    pub fn new(max: Vec2, physical_size_mm: Vec2) -> Self {
        Self {
            max,
            physical_size_mm,
        }
    }

    /// Millimeters per device unit on each axis
    pub fn mm_per_unit(&self) -> Vec2 {
        self.physical_size_mm / self.max
    }

    fn validate(&self) -> Result<()> {
        let valid = |v: Vec2| v.is_finite() && v.x > 0.0 && v.y > 0.0;
        if !valid(self.max) || !valid(self.physical_size_mm) {
            return Err(CanvasError::DegenerateDigitizer(self.max.x, self.max.y));
        }
        Ok(())
    }
}

/// Input work area in millimeters, rotated about its center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputArea {
    /// Center in millimeters from the digitizer origin
    pub center: Vec2,

    /// Width and height in millimeters
    pub size: Vec2,

    /// Rotation in degrees
    #[serde(default)]
    pub rotation_deg: f32,
}

/// Output area in output units (usually pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputArea {
    /// Center
    pub center: Vec2,

    /// Width and height
    pub size: Vec2,
}

fn check_finite(v: Vec2, what: &'static str) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(CanvasError::NonFiniteGeometry(what))
    }
}

fn check_area(size: Vec2, area: &'static str) -> Result<()> {
    if size.x > 0.0 && size.y > 0.0 {
        Ok(())
    } else {
        Err(CanvasError::DegenerateArea {
            area,
            width: size.x,
            height: size.y,
        })
    }
}

/// Mapping from digitizer units onto the output area
///
/// Digitizer units are scaled to millimeters, moved so the input area
/// center is the origin, unrotated, scaled to the output size and moved onto
/// the output center.
pub fn area_transform(digitizer: &DigitizerSpec, input: &InputArea, output: &OutputArea) -> Affine2 {
    Affine2::from_translation(output.center)
        * Affine2::from_scale(output.size / input.size)
        * Affine2::from_angle(-normalize_rotation(input.rotation_deg).to_radians())
        * Affine2::from_translation(-input.center)
        * Affine2::from_scale(digitizer.mm_per_unit())
}

/// Absolute output mode: input area mapped onto the output area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsoluteOutputMode {
    /// Input work area
    pub input: InputArea,

    /// Output area
    pub output: OutputArea,

    /// Digitizer units to output units
    pub transform: Affine2,

    /// Clamp out-of-area input onto the area
    pub area_clipping: bool,

    /// Drop out-of-area input
    pub area_limiting: bool,
}

impl AbsoluteOutputMode {
    /// Create a mode whose transform maps `input` onto `output`
    pub fn new(digitizer: &DigitizerSpec, input: InputArea, output: OutputArea) -> Self {
        Self {
            input,
            output,
            transform: area_transform(digitizer, &input, &output),
            area_clipping: true,
            area_limiting: false,
        }
    }

    /// Set area clipping
    pub fn with_area_clipping(mut self, enabled: bool) -> Self {
        self.area_clipping = enabled;
        self
    }

    /// Set area limiting
    pub fn with_area_limiting(mut self, enabled: bool) -> Self {
        self.area_limiting = enabled;
        self
    }
}

/// Relative output mode: displacement scaled into output units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeOutputMode {
    /// Output units per millimeter on each axis
    pub sensitivity: Vec2,

    /// Rotation in degrees
    pub rotation_deg: f32,

    /// Digitizer units to output units, translation unused
    pub transform: Affine2,
}

impl RelativeOutputMode {
    /// Create a relative mode for a digitizer
    pub fn new(digitizer: &DigitizerSpec, sensitivity: Vec2, rotation_deg: f32) -> Self {
        let transform = Affine2::from_angle(-normalize_rotation(rotation_deg).to_radians())
            * Affine2::from_scale(sensitivity)
            * Affine2::from_scale(digitizer.mm_per_unit());
        Self {
            sensitivity,
            rotation_deg,
            transform,
        }
    }
}

/// Output mode resolved by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    /// Area-to-area mapping
    Absolute(AbsoluteOutputMode),
    /// Displacement mapping
    Relative(RelativeOutputMode),
}

impl OutputMode {
    /// Mode name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            OutputMode::Absolute(_) => "absolute",
            OutputMode::Relative(_) => "relative",
        }
    }
}

/// Geometry published by the output-mode resolver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedGeometry {
    /// Digitizer description
    pub digitizer: DigitizerSpec,
    /// Active output mode
    pub mode: OutputMode,
}

/// Validated geometry plus values derived once per configuration
#[derive(Debug, Clone)]
pub struct GeometrySnapshot {
    digitizer: DigitizerSpec,
    mode: AbsoluteOutputMode,
    inverse: Affine2,
    mm_per_unit: Vec2,
    input_rect: RotatedRect,
    digitizer_rect: RotatedRect,
    aspect_correction: Mat2,
    initial_origin: Vec2,
}

impl GeometrySnapshot {
    /// Validate resolved geometry and derive the per-configuration values
    pub fn new(geometry: &ResolvedGeometry) -> Result<Self> {
        let mode = match geometry.mode {
            OutputMode::Absolute(mode) => mode,
            other => return Err(CanvasError::AbsoluteModeRequired(other.kind())),
        };
        let digitizer = geometry.digitizer;
        digitizer.validate()?;

        check_finite(mode.input.center, "input area center")?;
        check_finite(mode.input.size, "input area size")?;
        check_finite(mode.output.center, "output area center")?;
        check_finite(mode.output.size, "output area size")?;
        if !mode.input.rotation_deg.is_finite() {
            return Err(CanvasError::NonFiniteGeometry("input area rotation"));
        }
        check_area(mode.input.size, "input")?;
        check_area(mode.output.size, "output")?;

        let transform = mode.transform;
        if !(transform.matrix2.is_finite() && transform.translation.is_finite()) {
            return Err(CanvasError::NonFiniteGeometry("output transform"));
        }
        let determinant = transform.matrix2.determinant();
        if determinant.abs() < MIN_DETERMINANT {
            return Err(CanvasError::NonInvertibleTransform(determinant));
        }
        let inverse = transform.inverse();

        let mm_per_unit = digitizer.mm_per_unit();
        let input_rect = RotatedRect::from_center(
            mode.input.center / mm_per_unit,
            mode.input.size / mm_per_unit,
            mode.input.rotation_deg,
        );
        let digitizer_rect = RotatedRect::new(Vec2::ZERO, digitizer.max, 0.0);
        let aspect_correction =
            aspect_ratio_correction(&transform, mode.input.size, mode.output.size)?;

        let initial_origin = inverse.transform_point2(mode.output.center);
        check_finite(initial_origin, "initial canvas origin")?;

        debug!(
            "Geometry snapshot: input rect {:?}..{:?} @ {}°, origin {:?}",
            input_rect.min, input_rect.max, input_rect.rotation_deg, initial_origin
        );

        Ok(Self {
            digitizer,
            mode,
            inverse,
            mm_per_unit,
            input_rect,
            digitizer_rect,
            aspect_correction,
            initial_origin,
        })
    }

    /// Digitizer description
    pub fn digitizer(&self) -> &DigitizerSpec {
        &self.digitizer
    }

    /// Input area in millimeters
    pub fn input_area(&self) -> &InputArea {
        &self.mode.input
    }

    /// Output area
    pub fn output_area(&self) -> &OutputArea {
        &self.mode.output
    }

    /// Digitizer to output transform
    pub fn transform(&self) -> &Affine2 {
        &self.mode.transform
    }

    /// Output to digitizer transform
    pub fn inverse(&self) -> &Affine2 {
        &self.inverse
    }

    /// Area clipping flag
    pub fn area_clipping(&self) -> bool {
        self.mode.area_clipping
    }

    /// Area limiting flag
    pub fn area_limiting(&self) -> bool {
        self.mode.area_limiting
    }

    /// Millimeters per digitizer unit
    pub fn mm_per_unit(&self) -> Vec2 {
        self.mm_per_unit
    }

    /// Input work area in digitizer units
    pub fn input_rect(&self) -> &RotatedRect {
        &self.input_rect
    }

    /// Full digitizer bounds
    pub fn digitizer_rect(&self) -> &RotatedRect {
        &self.digitizer_rect
    }

    /// Aspect-ratio correction in digitizer space
    pub fn aspect_correction(&self) -> Mat2 {
        self.aspect_correction
    }

    /// Digitizer point that maps onto the output center
    pub fn initial_origin(&self) -> Vec2 {
        self.initial_origin
    }
}

/// Source of the currently resolved geometry
///
/// `generation` changes whenever `current` would return a different value,
/// letting the engine skip rebuilding its snapshot on every report.
#[cfg_attr(test, mockall::automock)]
pub trait GeometryProvider: Send + Sync {
    /// Counter bumped on every publish or clear
    fn generation(&self) -> u64;

    /// Currently resolved geometry, `None` when not ready
    fn current(&self) -> Option<Arc<ResolvedGeometry>>;
}

/// Geometry slot shared between the resolver and stream workers
#[derive(Debug, Default)]
pub struct SharedGeometry {
    current: RwLock<Option<Arc<ResolvedGeometry>>>,
    generation: AtomicU64,
}

impl SharedGeometry {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot holding `geometry`
    pub fn with_geometry(geometry: ResolvedGeometry) -> Self {
        let shared = Self::new();
        shared.publish(geometry);
        shared
    }

    /// Replace the resolved geometry
    pub fn publish(&self, geometry: ResolvedGeometry) {
        let mut current = self.current.write();
        *current = Some(Arc::new(geometry));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            "Published {} output geometry (generation {})",
            geometry.mode.kind(),
            generation
        );
    }

    /// Drop the resolved geometry
    pub fn clear(&self) {
        let mut current = self.current.write();
        *current = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
        info!("Output geometry cleared");
    }
}

impl GeometryProvider for SharedGeometry {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn current(&self) -> Option<Arc<ResolvedGeometry>> {
        self.current.read().clone()
    }
}
