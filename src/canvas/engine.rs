//! Canvas Transform Engine
//!
//! Turns absolute digitizer positions into mouse-like motion. The engine
//! keeps a canvas origin in digitizer space and accumulates scaled,
//! accelerated displacement relative to it. An idle gap longer than the reset
//! time folds the accumulated offset into the origin, so lifting and
//! replacing the pen continues from where the cursor was.
//!
//! # Per-report pipeline
//!
//! ```text
//! report ─▶ absolute override ─▶ input clamp ─▶ reset check
//!                                     │              │
//!                                 (dropped)          ▼
//!                                     │      displacement scaling
//!                                     ▼              │
//!                              previous output       ▼
//!                                              output clamp ─▶ commit
//! ```
//!
//! The engine is single-stream: every input stream owns its own
//! [`CanvasEngine`]. Settings and geometry are read through the shared
//! [`CanvasContext`].

use std::sync::Arc;

use glam::Vec2;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::canvas::curve::AccelerationCurve;
use crate::canvas::error::Result;
use crate::canvas::normalizer::normalization_matrix;
use crate::canvas::report::{DeltaStopwatch, ReportFilter, TabletReport};
use crate::canvas::settings::{LiveSettings, ResetPolicy, TransformConfig, MM_PER_INCH};
use crate::canvas::snapshot::{GeometryProvider, GeometrySnapshot};

/// Smallest report gap used for velocity, in seconds
pub const MIN_DELTA_SECS: f32 = 1.0e-6;

/// Shared collaborators handed to each engine
#[derive(Clone)]
pub struct CanvasContext {
    /// Live filter settings
    pub settings: Arc<LiveSettings>,

    /// Resolved output geometry
    pub geometry: Arc<dyn GeometryProvider>,

    /// Acceleration curve
    pub curve: AccelerationCurve,
}

impl CanvasContext {
    /// Create a context using the Windows acceleration curve
    pub fn new(settings: Arc<LiveSettings>, geometry: Arc<dyn GeometryProvider>) -> Self {
        Self {
            settings,
            geometry,
            curve: AccelerationCurve::windows(),
        }
    }

    /// Replace the acceleration curve
    pub fn with_curve(mut self, curve: AccelerationCurve) -> Self {
        self.curve = curve;
        self
    }
}

impl std::fmt::Debug for CanvasContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasContext")
            .field("settings", &self.settings)
            .field("generation", &self.geometry.generation())
            .field("curve", &self.curve)
            .finish()
    }
}

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No report processed against the current geometry
    Uninitialized,
    /// Accumulating motion
    Tracking,
    /// Current geometry is unusable, reports pass through
    Faulted,
}

/// Per-stream canvas state in digitizer units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CanvasState {
    /// Last accepted input position
    pub last_absolute: Vec2,

    /// Last output relative to the origin
    pub last_local: Vec2,

    /// Canvas origin
    pub origin: Vec2,
}

impl CanvasState {
    fn start(origin: Vec2, position: Vec2) -> Self {
        Self {
            last_absolute: position,
            last_local: Vec2::ZERO,
            origin,
        }
    }

    /// Last emitted position
    pub fn output(&self) -> Vec2 {
        self.origin + self.last_local
    }

    /// Keep the cursor where it is and restart displacement at `position`
    fn fold(&mut self, position: Vec2) {
        self.origin += self.last_local;
        self.last_local = Vec2::ZERO;
        self.last_absolute = position;
    }

    /// Move the origin onto `position`
    fn anchor(&mut self, position: Vec2) {
        self.origin = position;
        self.last_local = Vec2::ZERO;
        self.last_absolute = position;
    }

    fn commit(&mut self, position: Vec2, output: Vec2) {
        self.last_absolute = position;
        self.last_local = output - self.origin;
    }
}

/// Report counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CanvasStats {
    /// Reports transformed
    pub processed: u64,
    /// Reports forwarded untouched (out of range, not ready, faulted)
    pub passthrough: u64,
    /// Reports dropped by the input clamp
    pub dropped: u64,
    /// Canvas resets
    pub resets: u64,
    /// Reports handled in absolute mode
    pub absolute: u64,
}

/// Canvas transform engine for one stream
#[derive(Debug)]
pub struct CanvasEngine {
    context: CanvasContext,
    generation: Option<u64>,
    snapshot: Option<GeometrySnapshot>,
    state: EngineState,
    canvas: CanvasState,
    stopwatch: DeltaStopwatch,
    stats: CanvasStats,
}

impl CanvasEngine {
    /// Create an engine, geometry is read on the first report
    pub fn new(context: CanvasContext) -> Self {
        Self {
            context,
            generation: None,
            snapshot: None,
            state: EngineState::Uninitialized,
            canvas: CanvasState::default(),
            stopwatch: DeltaStopwatch::new(),
            stats: CanvasStats::default(),
        }
    }

    /// Transform one report
    ///
    /// Returns an error only on the report that first observes unusable
    /// geometry; later reports pass through until the geometry changes.
    pub fn consume(&mut self, report: TabletReport) -> Result<TabletReport> {
        if !report.position_valid {
            self.stats.passthrough += 1;
            return Ok(report);
        }

        self.refresh_geometry()?;

        if self.state == EngineState::Faulted {
            self.stats.passthrough += 1;
            return Ok(report);
        }

        let Some(snapshot) = self.snapshot.as_ref() else {
            debug!("Canvas not ready, passing report through");
            self.stats.passthrough += 1;
            return Ok(report);
        };

        let config = self.context.settings.snapshot();

        if self.state == EngineState::Uninitialized {
            self.canvas = CanvasState::start(snapshot.initial_origin(), report.position);
            self.stopwatch.reset();
            self.state = EngineState::Tracking;
            debug!("Canvas tracking from origin {:?}", self.canvas.origin);
        }

        if config.reset == ResetPolicy::Absolute {
            self.canvas.anchor(report.position);
            self.stats.absolute += 1;
            return Ok(report);
        }

        let Some(position) = clamp_input(report.position, snapshot, &config) else {
            trace!("Dropped out-of-bounds report at {:?}", report.position);
            self.stats.dropped += 1;
            return Ok(report.with_position(self.canvas.output()));
        };

        let delta = self.stopwatch.restart(report.timestamp);
        match config.reset {
            ResetPolicy::EveryReport => {
                self.canvas.anchor(position);
                self.stats.resets += 1;
            }
            ResetPolicy::After(timeout) if delta.map_or(true, |delta| delta >= timeout) => {
                self.canvas.fold(position);
                self.stats.resets += 1;
                trace!("Canvas reset, origin {:?}", self.canvas.origin);
            }
            _ => {}
        }

        let delta_secs = delta.map_or(f32::INFINITY, |d| d.as_secs_f32().max(MIN_DELTA_SECS));
        let raw = position - self.canvas.last_absolute;
        let scaled = scale_displacement(raw, delta_secs, snapshot, &config, &self.context.curve);
        let output = clamp_output(self.canvas.output() + scaled, snapshot);

        trace!(
            "raw {:?} scaled {:?} over {:.4}s -> {:?}",
            raw,
            scaled,
            delta_secs,
            output
        );

        self.canvas.commit(position, output);
        self.stats.processed += 1;
        Ok(report.with_position(output))
    }

    /// Forget the canvas; the next report starts from the initial origin
    pub fn reset(&mut self) {
        if self.state == EngineState::Tracking {
            self.state = EngineState::Uninitialized;
        }
        self.canvas = CanvasState::default();
        self.stopwatch.reset();
    }

    /// Engine lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Canvas state, meaningful while tracking
    pub fn canvas(&self) -> &CanvasState {
        &self.canvas
    }

    /// Current canvas origin
    pub fn canvas_origin(&self) -> Vec2 {
        self.canvas.origin
    }

    /// Last output relative to the origin
    pub fn last_local_position(&self) -> Vec2 {
        self.canvas.last_local
    }

    /// Report counters
    pub fn stats(&self) -> CanvasStats {
        self.stats
    }

    /// Geometry snapshot in use
    pub fn snapshot(&self) -> Option<&GeometrySnapshot> {
        self.snapshot.as_ref()
    }

    fn refresh_geometry(&mut self) -> Result<()> {
        let generation = self.context.geometry.generation();
        if self.generation == Some(generation) {
            return Ok(());
        }

        self.generation = Some(generation);
        self.snapshot = None;
        self.state = EngineState::Uninitialized;
        self.canvas = CanvasState::default();
        self.stopwatch.reset();

        let Some(geometry) = self.context.geometry.current() else {
            debug!("No output geometry resolved (generation {})", generation);
            return Ok(());
        };

        match GeometrySnapshot::new(&geometry) {
            Ok(snapshot) => {
                info!("Canvas reconfigured (generation {})", generation);
                self.snapshot = Some(snapshot);
                Ok(())
            }
            Err(e) => {
                warn!("Canvas disabled until reconfigured: {}", e);
                self.state = EngineState::Faulted;
                Err(e)
            }
        }
    }
}

impl ReportFilter for CanvasEngine {
    fn consume(&mut self, report: TabletReport) -> Result<TabletReport> {
        CanvasEngine::consume(self, report)
    }

    fn reset(&mut self) {
        CanvasEngine::reset(self)
    }
}

/// Apply the out-of-bounds policies, `None` drops the report
fn clamp_input(position: Vec2, snapshot: &GeometrySnapshot, config: &TransformConfig) -> Option<Vec2> {
    if config.ignore_oob_tablet_input && !snapshot.digitizer_rect().contains(position) {
        return None;
    }

    let area = snapshot.input_rect();
    let limiting = snapshot.area_limiting();
    if (snapshot.area_clipping() || limiting) && !area.contains(position) {
        if limiting {
            return None;
        }
        return Some(area.clamp(position));
    }

    Some(position)
}

fn clamp_output(position: Vec2, snapshot: &GeometrySnapshot) -> Vec2 {
    let area = snapshot.input_rect();
    if area.contains(position) {
        position
    } else {
        area.clamp(position)
    }
}

/// Displacement velocity in inches per second
pub fn velocity(raw: Vec2, mm_per_unit: Vec2, delta_secs: f32) -> f32 {
    (raw * mm_per_unit / MM_PER_INCH).length() / delta_secs
}

/// Curve multiplier with intensity and compensation, 1 when disabled
pub fn acceleration_factor(curve: &AccelerationCurve, velocity: f32, config: &TransformConfig) -> f32 {
    if !config.acceleration_enabled || config.acceleration_intensity == 0.0 {
        return 1.0;
    }
    curve.multiplier(velocity) * config.acceleration_scale()
}

fn scale_displacement(
    raw: Vec2,
    delta_secs: f32,
    snapshot: &GeometrySnapshot,
    config: &TransformConfig,
    curve: &AccelerationCurve,
) -> Vec2 {
    let velocity = velocity(raw, snapshot.mm_per_unit(), delta_secs);
    let factor = acceleration_factor(curve, velocity, config);
    normalization_matrix(snapshot, config.normalize_aspect_ratio) * raw
        * factor
        * config.speed_multiplier
}
