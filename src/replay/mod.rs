//! Trace Replay
//!
//! Drives one stream worker from a recorded JSON-lines trace. Each line is
//! one [`TraceEvent`]: a digitizer report with its timestamp in
//! milliseconds, a binding press or release, or a filter reset.
//!
//! ```text
//! {"type":"report","t_ms":0.0,"x":7600,"y":4750}
//! {"type":"press","binding":"precision"}
//! {"type":"report","t_ms":8.0,"x":7610,"y":4752}
//! {"type":"release","binding":"precision"}
//! ```
//!
//! Every report yields one output line, in order. Reports are handed to the
//! worker one at a time so binding changes apply between exactly the
//! reports they were recorded between.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::canvas::binding::Binding;
use crate::canvas::engine::CanvasContext;
use crate::canvas::relative::RelativeAccelerationFilter;
use crate::canvas::report::TabletReport;
use crate::canvas::settings::LiveSettings;
use crate::canvas::snapshot::SharedGeometry;
use crate::config::{Config, OutputModeKind};
use crate::pipeline::{StreamId, StreamOutput, StreamWorker, WorkerStats};

/// One line of a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TraceEvent {
    /// Digitizer report
    Report {
        /// Milliseconds since the start of the trace
        t_ms: f64,
        /// Digitizer x
        x: f32,
        /// Digitizer y
        y: f32,
        /// False when the pen was out of range
        #[serde(default = "default_valid")]
        valid: bool,
    },
    /// Binding pressed
    Press {
        /// Binding name
        binding: String,
    },
    /// Binding released
    Release {
        /// Binding name
        binding: String,
    },
    /// Filter reset, as on a device reconnect
    Reset,
}

fn default_valid() -> bool {
    true
}

/// One line of replay output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReplayRecord {
    /// Transformed report
    Report {
        /// Input timestamp
        t_ms: f64,
        /// Output x
        x: f32,
        /// Output y
        y: f32,
        /// Whether the position is valid
        valid: bool,
    },
    /// Filter error for one report
    Fault {
        /// Input timestamp
        t_ms: f64,
        /// Error message
        error: String,
    },
}

/// Counters for a finished replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Trace events handled
    pub events: u64,
    /// Output records written
    pub records: u64,
    /// Faults reported by the filter
    pub faults: u64,
    /// Binding presses and releases
    pub binding_events: u64,
    /// Worker counters
    pub worker: WorkerStats,
}

/// Parse a JSON-lines trace
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_trace<R: BufRead>(reader: R) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read trace line {}", line_no))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: TraceEvent = serde_json::from_str(line)
            .with_context(|| format!("Invalid trace event on line {}", line_no))?;
        if let TraceEvent::Report { t_ms, .. } = &event {
            if !t_ms.is_finite() || *t_ms < 0.0 {
                anyhow::bail!("Invalid trace timestamp on line {}: {}", line_no, t_ms);
            }
        }
        events.push(event);
    }

    debug!("Read {} trace events", events.len());
    Ok(events)
}

/// One stream replaying a trace against a configuration
pub struct ReplaySession {
    settings: Arc<LiveSettings>,
    bindings: BTreeMap<String, Binding>,
    worker: StreamWorker,
    base: Instant,
}

impl ReplaySession {
    /// Build settings, geometry and a worker from `config`
    pub fn new(config: &Config) -> Result<Self> {
        let settings =
            Arc::new(LiveSettings::new(config.canvas).context("Invalid canvas settings")?);
        let bindings = config.build_bindings(&settings)?;
        let geometry = Arc::new(SharedGeometry::with_geometry(config.to_resolved_geometry()));
        let context = CanvasContext::new(settings.clone(), geometry);

        let id = StreamId::new("replay");
        let worker = match config.geometry.mode {
            OutputModeKind::Absolute => StreamWorker::canvas(id, context),
            OutputModeKind::Relative => {
                StreamWorker::spawn(id, RelativeAccelerationFilter::new(context))
            }
        }
        .context("Failed to start stream worker")?;

        info!(
            "Replay session ready: {} output mode, {} bindings",
            config.to_resolved_geometry().mode.kind(),
            bindings.len()
        );

        Ok(Self {
            settings,
            bindings,
            worker,
            base: Instant::now(),
        })
    }

    /// Live settings the bindings act on
    pub fn settings(&self) -> &Arc<LiveSettings> {
        &self.settings
    }

    /// Replay `events`, writing one JSON line per report to `out`
    pub fn run<I, W>(mut self, events: I, mut out: W) -> Result<ReplaySummary>
    where
        I: IntoIterator<Item = TraceEvent>,
        W: Write,
    {
        let mut summary = ReplaySummary::default();

        for (index, event) in events.into_iter().enumerate() {
            summary.events += 1;
            match event {
                TraceEvent::Report { t_ms, x, y, valid } => {
                    let record = self.transform(t_ms, Vec2::new(x, y), valid)?;
                    if matches!(record, ReplayRecord::Fault { .. }) {
                        summary.faults += 1;
                    }
                    serde_json::to_writer(&mut out, &record)
                        .context("Failed to write replay output")?;
                    writeln!(out).context("Failed to write replay output")?;
                    summary.records += 1;
                }
                TraceEvent::Press { binding } => {
                    summary.binding_events += 1;
                    self.binding(&binding, index)?.press(&self.settings)?;
                }
                TraceEvent::Release { binding } => {
                    summary.binding_events += 1;
                    self.binding(&binding, index)?.release(&self.settings)?;
                }
                TraceEvent::Reset => self.worker.reset()?,
            }
        }

        out.flush().context("Failed to flush replay output")?;
        summary.worker = self.worker.shutdown()?;

        info!(
            "Replay finished: {} events, {} records, {} faults",
            summary.events, summary.records, summary.faults
        );
        Ok(summary)
    }

    fn binding(&self, name: &str, index: usize) -> Result<&Binding> {
        self.bindings
            .get(name)
            .with_context(|| format!("Unknown binding '{}' in trace event {}", name, index + 1))
    }

    fn transform(&self, t_ms: f64, position: Vec2, valid: bool) -> Result<ReplayRecord> {
        let timestamp = self.base + Duration::from_secs_f64(t_ms.max(0.0) / 1000.0);
        let report = if valid {
            TabletReport::new(position, timestamp)
        } else {
            TabletReport::out_of_range(position, timestamp)
        };

        self.worker.send(report)?;
        match self.worker.recv() {
            Some(StreamOutput::Report(report)) => Ok(ReplayRecord::Report {
                t_ms,
                x: report.position.x,
                y: report.position.y,
                valid: report.position_valid,
            }),
            Some(StreamOutput::Fault(e)) => {
                warn!("Report at {} ms faulted: {}", t_ms, e);
                Ok(ReplayRecord::Fault {
                    t_ms,
                    error: e.to_string(),
                })
            }
            None => anyhow::bail!("Stream worker {} stopped during replay", self.worker.id()),
        }
    }
}
