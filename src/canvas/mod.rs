//! Canvas Transform Engine
//!
//! Emulates relative ("mouse mode") motion from an absolute digitizer. Each
//! input stream owns a [`CanvasEngine`] that clamps positions against the
//! rotated input area, resets its canvas after idle gaps and scales raw
//! displacement through aspect-ratio correction and the acceleration curve.
//!
//! # Architecture
//!
//! ```text
//!  GeometryProvider ──▶ GeometrySnapshot ─┐
//!                       (per generation)  │
//!                                         ▼
//!  TabletReport ─────────────────▶ CanvasEngine ──▶ TabletReport
//!                                    ▲        │
//!  Binding ──▶ LiveSettings ─────────┘        ├─ geometry (is_within / clamp)
//!              (snapshot per report)          ├─ normalizer (aspect correction)
//!                                             └─ curve (acceleration)
//! ```
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//! use glam::Vec2;
//! use canvas_remap::canvas::{
//!     AbsoluteOutputMode, CanvasContext, CanvasEngine, DigitizerSpec, InputArea,
//!     LiveSettings, OutputArea, OutputMode, ResolvedGeometry, SharedGeometry, TabletReport,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let digitizer = DigitizerSpec::new(Vec2::new(15200.0, 9500.0), Vec2::new(152.0, 95.0));
//! let input = InputArea {
//!     center: Vec2::new(76.0, 47.5),
//!     size: Vec2::new(152.0, 95.0),
//!     rotation_deg: 0.0,
//! };
//! let output = OutputArea {
//!     center: Vec2::new(960.0, 540.0),
//!     size: Vec2::new(1920.0, 1080.0),
//! };
//!
//! let geometry = Arc::new(SharedGeometry::with_geometry(ResolvedGeometry {
//!     digitizer,
//!     mode: OutputMode::Absolute(AbsoluteOutputMode::new(&digitizer, input, output)),
//! }));
//! let settings = Arc::new(LiveSettings::default());
//!
//! let mut engine = CanvasEngine::new(CanvasContext::new(settings, geometry));
//! let report = engine.consume(TabletReport::new(Vec2::new(7600.0, 4750.0), Instant::now()))?;
//! println!("Canvas position: {:?}", report.position);
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod curve;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod normalizer;
pub mod relative;
pub mod report;
pub mod settings;
pub mod snapshot;

pub use binding::{Binding, BindingAction};
pub use curve::AccelerationCurve;
pub use engine::{CanvasContext, CanvasEngine, CanvasState, CanvasStats, EngineState};
pub use error::{classify_error, recovery_action, CanvasError, ErrorType, RecoveryAction, Result};
pub use geometry::{clamp, flip, is_within, normalize_rotation, RotatedRect};
pub use normalizer::{aspect_ratio_correction, normalization_matrix};
pub use relative::{RelativeAccelerationFilter, RelativeGeometry};
pub use report::{DeltaStopwatch, ReportFilter, TabletReport};
pub use settings::{
    FilterSettings, LiveSettings, PropertyIndex, PropertyValue, ResetPolicy, TransformConfig,
    DEFAULT_DEVICE_COMPENSATION,
};
pub use snapshot::{
    AbsoluteOutputMode, DigitizerSpec, GeometryProvider, GeometrySnapshot, InputArea, OutputArea,
    OutputMode, RelativeOutputMode, ResolvedGeometry, SharedGeometry,
};
