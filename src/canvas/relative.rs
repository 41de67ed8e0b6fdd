//! Relative Acceleration Filter
//!
//! Applies the acceleration curve after a relative output mode has turned
//! digitizer motion into output displacement. The displacement is mapped
//! back into digitizer space to measure physical velocity, scaled by the
//! curve and mapped forward again.

use glam::{Mat2, Vec2};
use tracing::{debug, info, warn};

use crate::canvas::engine::{
    acceleration_factor, velocity, CanvasContext, CanvasStats, EngineState, MIN_DELTA_SECS,
};
use crate::canvas::error::{CanvasError, Result};
use crate::canvas::normalizer::MIN_DETERMINANT;
use crate::canvas::report::{DeltaStopwatch, ReportFilter, TabletReport};
use crate::canvas::snapshot::{OutputMode, ResolvedGeometry};

/// Linear mapping of a relative output mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeGeometry {
    linear: Mat2,
    inverse: Mat2,
    mm_per_unit: Vec2,
}

impl RelativeGeometry {
    /// Validate a relative output mode
    pub fn new(geometry: &ResolvedGeometry) -> Result<Self> {
        let mode = match geometry.mode {
            OutputMode::Relative(mode) => mode,
            other => return Err(CanvasError::RelativeModeRequired(other.kind())),
        };

        let digitizer = geometry.digitizer;
        let mm_per_unit = digitizer.mm_per_unit();
        if !(mm_per_unit.is_finite() && mm_per_unit.x > 0.0 && mm_per_unit.y > 0.0) {
            return Err(CanvasError::DegenerateDigitizer(digitizer.max.x, digitizer.max.y));
        }

        let linear = mode.transform.matrix2;
        if !linear.is_finite() {
            return Err(CanvasError::NonFiniteGeometry("output transform"));
        }
        let determinant = linear.determinant();
        if determinant.abs() < MIN_DETERMINANT {
            return Err(CanvasError::NonInvertibleTransform(determinant));
        }

        Ok(Self {
            linear,
            inverse: linear.inverse(),
            mm_per_unit,
        })
    }

    /// Output displacement back to digitizer units
    pub fn to_input(&self, displacement: Vec2) -> Vec2 {
        self.inverse * displacement
    }

    /// Digitizer displacement to output units
    pub fn to_output(&self, displacement: Vec2) -> Vec2 {
        self.linear * displacement
    }
}

/// Acceleration for relative output modes, one per stream
#[derive(Debug)]
pub struct RelativeAccelerationFilter {
    context: CanvasContext,
    generation: Option<u64>,
    geometry: Option<RelativeGeometry>,
    state: EngineState,
    stopwatch: DeltaStopwatch,
    stats: CanvasStats,
}

impl RelativeAccelerationFilter {
    /// Create a filter, geometry is read on the first report
    pub fn new(context: CanvasContext) -> Self {
        Self {
            context,
            generation: None,
            geometry: None,
            state: EngineState::Uninitialized,
            stopwatch: DeltaStopwatch::new(),
            stats: CanvasStats::default(),
        }
    }

    /// Accelerate one displacement report
    pub fn consume(&mut self, report: TabletReport) -> Result<TabletReport> {
        if !report.position_valid {
            self.stats.passthrough += 1;
            return Ok(report);
        }

        self.refresh_geometry()?;

        let Some(geometry) = self.geometry.as_ref() else {
            self.stats.passthrough += 1;
            return Ok(report);
        };
        self.state = EngineState::Tracking;

        let config = self.context.settings.snapshot();
        let delta = self.stopwatch.restart(report.timestamp);
        let delta_secs = delta.map_or(f32::INFINITY, |d| d.as_secs_f32().max(MIN_DELTA_SECS));

        let input = geometry.to_input(report.position);
        let velocity = velocity(input, geometry.mm_per_unit, delta_secs);
        let factor = acceleration_factor(&self.context.curve, velocity, &config);

        self.stats.processed += 1;
        Ok(report.with_position(geometry.to_output(input * factor)))
    }

    /// Forget the previous report time
    pub fn reset(&mut self) {
        self.stopwatch.reset();
        if self.state == EngineState::Tracking {
            self.state = EngineState::Uninitialized;
        }
    }

    /// Filter lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Report counters
    pub fn stats(&self) -> CanvasStats {
        self.stats
    }

    fn refresh_geometry(&mut self) -> Result<()> {
        let generation = self.context.geometry.generation();
        if self.generation == Some(generation) {
            return Ok(());
        }

        self.generation = Some(generation);
        self.geometry = None;
        self.state = EngineState::Uninitialized;
        self.stopwatch.reset();

        let Some(resolved) = self.context.geometry.current() else {
            debug!("No output geometry resolved (generation {})", generation);
            return Ok(());
        };

        match RelativeGeometry::new(&resolved) {
            Ok(geometry) => {
                info!("Relative acceleration reconfigured (generation {})", generation);
                self.geometry = Some(geometry);
                Ok(())
            }
            Err(e) => {
                warn!("Relative acceleration disabled until reconfigured: {}", e);
                self.state = EngineState::Faulted;
                Err(e)
            }
        }
    }
}

impl ReportFilter for RelativeAccelerationFilter {
    fn consume(&mut self, report: TabletReport) -> Result<TabletReport> {
        RelativeAccelerationFilter::consume(self, report)
    }

    fn reset(&mut self) {
        RelativeAccelerationFilter::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::curve::AccelerationCurve;
    use crate::canvas::settings::{FilterSettings, LiveSettings, MM_PER_INCH};
    use crate::canvas::snapshot::{
        AbsoluteOutputMode, DigitizerSpec, InputArea, MockGeometryProvider, OutputArea,
        RelativeOutputMode,
    };
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn relative_geometry(sensitivity: Vec2, rotation_deg: f32) -> ResolvedGeometry {
        let digitizer = DigitizerSpec::new(Vec2::splat(1000.0), Vec2::splat(100.0));
        ResolvedGeometry {
            digitizer,
            mode: OutputMode::Relative(RelativeOutputMode::new(&digitizer, sensitivity, rotation_deg)),
        }
    }

    fn filter_with(settings: FilterSettings, geometry: ResolvedGeometry) -> RelativeAccelerationFilter {
        let geometry = Arc::new(geometry);
        let mut provider = MockGeometryProvider::new();
        provider.expect_generation().return_const(7u64);
        provider
            .expect_current()
            .returning(move || Some(geometry.clone()));

        let settings = Arc::new(LiveSettings::new(settings).expect("valid settings"));
        RelativeAccelerationFilter::new(CanvasContext::new(settings, Arc::new(provider)))
    }

    #[test]
    fn test_disabled_acceleration_is_identity() {
        let settings = FilterSettings {
            acceleration_enabled: false,
            ..FilterSettings::default()
        };
        let mut filter = filter_with(settings, relative_geometry(Vec2::splat(10.0), 30.0));
        let start = Instant::now();

        for i in 0..3u64 {
            let report = TabletReport::new(Vec2::new(12.0, -4.0), start + Duration::from_millis(i * 5));
            let out = filter.consume(report).expect("consume");
            assert!((out.position - report.position).length() < 1.0e-4);
        }
        assert_eq!(filter.state(), EngineState::Tracking);
    }

    #[test]
    fn test_acceleration_scales_displacement() {
        let mut filter = filter_with(FilterSettings::default(), relative_geometry(Vec2::splat(10.0), 0.0));
        let start = Instant::now();

        filter
            .consume(TabletReport::new(Vec2::ZERO, start))
            .expect("consume");

        // 10 output units = 1 mm at sensitivity 10
        let out = filter
            .consume(TabletReport::new(Vec2::new(10.0, 0.0), start + Duration::from_millis(10)))
            .expect("consume");

        let velocity = 100.0 / MM_PER_INCH;
        let factor = AccelerationCurve::windows().multiplier(velocity) / 8.0;
        assert!((out.position.x - 10.0 * factor).abs() < 1.0e-3);
        assert!(out.position.y.abs() < 1.0e-5);
    }

    #[test]
    fn test_absolute_mode_rejected() {
        let digitizer = DigitizerSpec::new(Vec2::splat(1000.0), Vec2::splat(100.0));
        let input = InputArea {
            center: Vec2::splat(50.0),
            size: Vec2::splat(100.0),
            rotation_deg: 0.0,
        };
        let output = OutputArea {
            center: Vec2::splat(500.0),
            size: Vec2::splat(1000.0),
        };
        let geometry = ResolvedGeometry {
            digitizer,
            mode: OutputMode::Absolute(AbsoluteOutputMode::new(&digitizer, input, output)),
        };
        let mut filter = filter_with(FilterSettings::default(), geometry);
        let report = TabletReport::new(Vec2::ONE, Instant::now());

        assert_eq!(
            filter.consume(report).unwrap_err(),
            CanvasError::RelativeModeRequired("absolute")
        );
        assert_eq!(filter.consume(report).expect("passthrough"), report);
        assert_eq!(filter.state(), EngineState::Faulted);
    }

    #[test]
    fn test_relative_geometry_round_trip() {
        let geometry = RelativeGeometry::new(&relative_geometry(Vec2::new(4.0, 2.0), 45.0))
            .expect("valid geometry");
        let displacement = Vec2::new(3.0, -7.0);
        let back = geometry.to_output(geometry.to_input(displacement));
        assert!((back - displacement).length() < 1.0e-4);
    }
}
