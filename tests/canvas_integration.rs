//! Canvas engine integration tests
//!
//! Drives the engine through the public API with a shared geometry slot and
//! live settings, the way a host wires one device stream.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;

use canvas_remap::canvas::{
    AbsoluteOutputMode, Binding, BindingAction, CanvasContext, CanvasEngine, CanvasError,
    DigitizerSpec, EngineState, FilterSettings, InputArea, LiveSettings, OutputArea, OutputMode,
    PropertyIndex, PropertyValue, RelativeOutputMode, ResolvedGeometry, SharedGeometry,
    TabletReport,
};

fn square_geometry(input_size: f32) -> ResolvedGeometry {
    let digitizer = DigitizerSpec::new(Vec2::splat(1000.0), Vec2::splat(1000.0));
    let input = InputArea {
        center: Vec2::splat(500.0),
        size: Vec2::splat(input_size),
        rotation_deg: 0.0,
    };
    let output = OutputArea {
        center: Vec2::splat(500.0),
        size: Vec2::splat(input_size),
    };
    ResolvedGeometry {
        digitizer,
        mode: OutputMode::Absolute(AbsoluteOutputMode::new(&digitizer, input, output)),
    }
}

fn identity_settings() -> FilterSettings {
    FilterSettings {
        reset_time_ms: 100,
        speed_multiplier: 1.0,
        acceleration_enabled: false,
        normalize_aspect_ratio: false,
        ..FilterSettings::default()
    }
}

fn engine(settings: FilterSettings) -> (CanvasEngine, Arc<LiveSettings>, Arc<SharedGeometry>) {
    let settings = Arc::new(LiveSettings::new(settings).expect("valid settings"));
    let geometry = Arc::new(SharedGeometry::with_geometry(square_geometry(1000.0)));
    let engine = CanvasEngine::new(CanvasContext::new(settings.clone(), geometry.clone()));
    (engine, settings, geometry)
}

fn assert_near(actual: Vec2, expected: Vec2) {
    assert!(
        (actual - expected).length() < 1.0e-3,
        "expected {expected:?}, got {actual:?}"
    );
}

#[test]
fn test_stroke_follows_pen_displacement() {
    let (mut engine, _, _) = engine(identity_settings());
    let start = Instant::now();

    let first = engine
        .consume(TabletReport::new(Vec2::new(500.0, 500.0), start))
        .expect("consume");
    assert_near(first.position, Vec2::new(500.0, 500.0));
    assert_near(engine.canvas_origin(), Vec2::new(500.0, 500.0));

    let second = engine
        .consume(TabletReport::new(
            Vec2::new(510.0, 500.0),
            start + Duration::from_millis(10),
        ))
        .expect("consume");
    assert_near(second.position, Vec2::new(510.0, 500.0));
    assert_eq!(engine.state(), EngineState::Tracking);
}

#[test]
fn test_pen_lift_keeps_cursor_in_place() {
    let (mut engine, _, _) = engine(identity_settings());
    let start = Instant::now();

    engine
        .consume(TabletReport::new(Vec2::new(500.0, 500.0), start))
        .expect("consume");
    engine
        .consume(TabletReport::new(
            Vec2::new(600.0, 500.0),
            start + Duration::from_millis(10),
        ))
        .expect("consume");

    // Pen lifted and put down elsewhere after the reset time
    let resumed = engine
        .consume(TabletReport::new(
            Vec2::new(100.0, 100.0),
            start + Duration::from_millis(500),
        ))
        .expect("consume");
    assert_near(resumed.position, Vec2::new(600.0, 500.0));

    let moved = engine
        .consume(TabletReport::new(
            Vec2::new(120.0, 100.0),
            start + Duration::from_millis(510),
        ))
        .expect("consume");
    assert_near(moved.position, Vec2::new(620.0, 500.0));
    assert_eq!(engine.stats().resets, 2);
}

#[test]
fn test_out_of_bounds_report_holds_position() {
    let (mut engine, _, _) = engine(identity_settings());
    let start = Instant::now();

    let first = engine
        .consume(TabletReport::new(Vec2::new(500.0, 500.0), start))
        .expect("consume");
    let canvas = *engine.canvas();

    let dropped = engine
        .consume(TabletReport::new(
            Vec2::new(-5.0, 500.0),
            start + Duration::from_millis(5),
        ))
        .expect("consume");
    assert_eq!(dropped.position, first.position);
    assert_eq!(*engine.canvas(), canvas);
    assert_eq!(engine.stats().dropped, 1);
}

#[test]
fn test_absolute_mode_passes_positions_through() {
    let settings = FilterSettings {
        reset_time_ms: -1,
        ..identity_settings()
    };
    let (mut engine, _, _) = engine(settings);
    let start = Instant::now();

    for (i, x) in [100.0, 900.0, 1200.0].into_iter().enumerate() {
        let report = TabletReport::new(
            Vec2::new(x, 250.0),
            start + Duration::from_millis(i as u64),
        );
        assert_eq!(engine.consume(report).expect("consume"), report);
        assert_eq!(engine.canvas_origin(), report.position);
    }
}

#[test]
fn test_binding_from_another_thread_applies_to_next_report() {
    let (mut engine, settings, _) = engine(identity_settings());
    let start = Instant::now();

    engine
        .consume(TabletReport::new(Vec2::new(500.0, 500.0), start))
        .expect("consume");

    let binding = Binding::new(
        &settings,
        PropertyIndex::SpeedMultiplier,
        BindingAction::Hold,
        Some(PropertyValue::Float(2.0)),
    )
    .expect("binding");

    let remote = settings.clone();
    let pressed = binding.clone();
    thread::spawn(move || pressed.press(&remote).expect("press"))
        .join()
        .expect("binding thread");

    let fast = engine
        .consume(TabletReport::new(
            Vec2::new(510.0, 500.0),
            start + Duration::from_millis(10),
        ))
        .expect("consume");
    assert_near(fast.position, Vec2::new(520.0, 500.0));

    binding.release(&settings).expect("release");
    let normal = engine
        .consume(TabletReport::new(
            Vec2::new(520.0, 500.0),
            start + Duration::from_millis(20),
        ))
        .expect("consume");
    assert_near(normal.position, Vec2::new(530.0, 500.0));
}

#[test]
fn test_reconfiguration_restarts_canvas() {
    let (mut engine, _, geometry) = engine(identity_settings());
    let start = Instant::now();

    engine
        .consume(TabletReport::new(Vec2::new(500.0, 500.0), start))
        .expect("consume");
    engine
        .consume(TabletReport::new(
            Vec2::new(700.0, 500.0),
            start + Duration::from_millis(10),
        ))
        .expect("consume");

    // Smaller work area around the same center
    geometry.publish(square_geometry(200.0));

    let after = engine
        .consume(TabletReport::new(
            Vec2::new(550.0, 500.0),
            start + Duration::from_millis(20),
        ))
        .expect("consume");
    assert_near(after.position, Vec2::new(500.0, 500.0));
    assert_eq!(engine.state(), EngineState::Tracking);
}

#[test]
fn test_wrong_output_mode_faults_until_reconfigured() {
    let (mut engine, _, geometry) = engine(identity_settings());
    let digitizer = DigitizerSpec::new(Vec2::splat(1000.0), Vec2::splat(1000.0));
    geometry.publish(ResolvedGeometry {
        digitizer,
        mode: OutputMode::Relative(RelativeOutputMode::new(&digitizer, Vec2::ONE, 0.0)),
    });

    let report = TabletReport::new(Vec2::new(400.0, 400.0), Instant::now());
    assert_eq!(
        engine.consume(report).unwrap_err(),
        CanvasError::AbsoluteModeRequired("relative")
    );
    assert_eq!(engine.consume(report).expect("passthrough"), report);
    assert_eq!(engine.state(), EngineState::Faulted);

    geometry.publish(square_geometry(1000.0));
    let recovered = engine.consume(report).expect("consume");
    assert_near(recovered.position, Vec2::new(500.0, 500.0));
    assert_eq!(engine.state(), EngineState::Tracking);
}

#[test]
fn test_missing_geometry_is_not_an_error() {
    let settings = Arc::new(LiveSettings::new(identity_settings()).expect("valid settings"));
    let geometry = Arc::new(SharedGeometry::new());
    let mut engine = CanvasEngine::new(CanvasContext::new(settings, geometry.clone()));

    let report = TabletReport::new(Vec2::new(10.0, 20.0), Instant::now());
    assert_eq!(engine.consume(report).expect("passthrough"), report);
    assert_eq!(engine.state(), EngineState::Uninitialized);

    geometry.publish(square_geometry(1000.0));
    engine.consume(report).expect("consume");
    assert_eq!(engine.state(), EngineState::Tracking);
}
