//! Stream pipeline integration tests
//!
//! Several streams share one context and run on their own worker threads.
//! Each must produce exactly what a lone engine produces for its reports.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;

use canvas_remap::canvas::{
    AbsoluteOutputMode, CanvasContext, CanvasEngine, DigitizerSpec, FilterSettings, InputArea,
    LiveSettings, OutputArea, OutputMode, ResolvedGeometry, SharedGeometry, TabletReport,
};
use canvas_remap::pipeline::{StreamId, StreamOutput, StreamWorker};

fn context(settings: &Arc<LiveSettings>, geometry: &Arc<SharedGeometry>) -> CanvasContext {
    CanvasContext::new(settings.clone(), geometry.clone())
}

fn geometry() -> Arc<SharedGeometry> {
    let digitizer = DigitizerSpec::new(Vec2::new(15200.0, 9500.0), Vec2::new(152.0, 95.0));
    let input = InputArea {
        center: Vec2::new(76.0, 47.5),
        size: Vec2::new(120.0, 80.0),
        rotation_deg: 30.0,
    };
    let output = OutputArea {
        center: Vec2::new(960.0, 540.0),
        size: Vec2::new(1920.0, 1080.0),
    };
    Arc::new(SharedGeometry::with_geometry(ResolvedGeometry {
        digitizer,
        mode: OutputMode::Absolute(AbsoluteOutputMode::new(&digitizer, input, output)),
    }))
}

/// A wobbly stroke with a pen lift halfway through
fn stroke(seed: f32, start: Instant) -> Vec<TabletReport> {
    (0..200u64)
        .map(|i| {
            let t = i as f32;
            let position = Vec2::new(
                7600.0 + (t * 0.07 + seed).sin() * 3000.0,
                4750.0 + (t * 0.05 + seed).cos() * 2000.0,
            );
            let gap = if i >= 100 { 400 } else { 0 };
            TabletReport::new(position, start + Duration::from_millis(i * 4 + gap))
        })
        .collect()
}

#[test]
fn test_streams_are_isolated() {
    let settings = Arc::new(LiveSettings::new(FilterSettings::default()).expect("settings"));
    let geometry = geometry();
    let start = Instant::now();

    let strokes: Vec<Vec<TabletReport>> = (0..4).map(|s| stroke(s as f32, start)).collect();

    // Reference outputs from a lone engine per stroke
    let expected: Vec<Vec<Vec2>> = strokes
        .iter()
        .map(|reports| {
            let mut engine = CanvasEngine::new(context(&settings, &geometry));
            reports
                .iter()
                .map(|r| engine.consume(*r).expect("consume").position)
                .collect()
        })
        .collect();

    let handles: Vec<_> = strokes
        .into_iter()
        .enumerate()
        .map(|(i, reports)| {
            let context = context(&settings, &geometry);
            thread::spawn(move || {
                let mut worker =
                    StreamWorker::canvas(StreamId::new(format!("pen-{i}")), context)
                        .expect("spawn worker");
                for report in &reports {
                    worker.send(*report).expect("send");
                }

                let outputs: Vec<Vec2> = (0..reports.len())
                    .map(|_| match worker.recv() {
                        Some(StreamOutput::Report(report)) => report.position,
                        other => panic!("unexpected output {other:?}"),
                    })
                    .collect();

                let stats = worker.shutdown().expect("shutdown");
                assert_eq!(stats.received, reports.len() as u64);
                outputs
            })
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(expected) {
        let outputs = handle.join().expect("stream thread");
        assert_eq!(outputs, expected);
    }
}

#[test]
fn test_reset_command_restarts_canvas() {
    let settings = Arc::new(LiveSettings::new(FilterSettings::default()).expect("settings"));
    let geometry = geometry();
    let start = Instant::now();

    let mut worker =
        StreamWorker::canvas(StreamId::new("pen-reset"), context(&settings, &geometry))
            .expect("spawn worker");

    let first = TabletReport::new(Vec2::new(2000.0, 2000.0), start);
    worker.send(first).expect("send");
    worker
        .send(TabletReport::new(
            Vec2::new(2600.0, 2300.0),
            start + Duration::from_millis(5),
        ))
        .expect("send");
    worker.reset().expect("reset");
    worker
        .send(TabletReport::new(
            Vec2::new(9000.0, 6000.0),
            start + Duration::from_millis(10),
        ))
        .expect("send");

    let outputs: Vec<Vec2> = (0..3)
        .map(|_| match worker.recv_timeout(Duration::from_secs(5)) {
            Some(StreamOutput::Report(report)) => report.position,
            other => panic!("unexpected output {other:?}"),
        })
        .collect();

    // Both the first report and the one after the reset start at the origin
    assert!((outputs[0] - outputs[2]).length() < 1.0e-3);
    assert!((outputs[1] - outputs[0]).length() > 1.0);

    let stats = worker.shutdown().expect("shutdown");
    assert_eq!(stats.resets, 1);
}
