//! Stream Worker
//!
//! Runs one [`ReportFilter`] on a dedicated thread. Reports arrive over a
//! command channel and leave, in order, over an output channel. The filter
//! and all of its state live on the worker thread only, so streams never
//! share mutable state.

use std::fmt;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::canvas::engine::{CanvasContext, CanvasEngine};
use crate::canvas::error::{recovery_action, CanvasError, RecoveryAction, Result};
use crate::canvas::report::{ReportFilter, TabletReport};

/// Identity of one input stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StreamId(String);

impl StreamId {
    /// Create a stream id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commands handled by the worker thread
#[derive(Debug)]
pub enum StreamCommand {
    /// Transform a report
    Report(TabletReport),
    /// Reset the filter state
    Reset,
    /// Stop the worker
    Shutdown,
}

/// Results emitted by the worker thread
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutput {
    /// Transformed report
    Report(TabletReport),
    /// Filter error for one report
    Fault(CanvasError),
}

/// Worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Reports received
    pub received: u64,
    /// Reports emitted
    pub emitted: u64,
    /// Filter errors
    pub faults: u64,
    /// Reset commands handled
    pub resets: u64,
}

/// Handle to a filter running on its own thread
pub struct StreamWorker {
    id: StreamId,
    command_tx: Sender<StreamCommand>,
    output_rx: Receiver<StreamOutput>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl StreamWorker {
    /// Spawn a worker thread driving `filter`
    pub fn spawn<F>(id: StreamId, filter: F) -> Result<Self>
    where
        F: ReportFilter + Send + 'static,
    {
        let (command_tx, command_rx) = unbounded();
        let (output_tx, output_rx) = unbounded();

        let thread_id = id.clone();
        let handle = thread::Builder::new()
            .name(format!("stream-{}", id))
            .spawn(move || run_stream(thread_id, filter, command_rx, output_tx))?;

        info!("Stream worker {} started", id);

        Ok(Self {
            id,
            command_tx,
            output_rx,
            handle: Some(handle),
        })
    }

    /// Spawn a worker running a fresh [`CanvasEngine`]
    pub fn canvas(id: StreamId, context: CanvasContext) -> Result<Self> {
        Self::spawn(id, CanvasEngine::new(context))
    }

    /// Stream id
    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// Queue a report
    pub fn send(&self, report: TabletReport) -> Result<()> {
        self.command(StreamCommand::Report(report))
    }

    /// Queue a filter reset
    pub fn reset(&self) -> Result<()> {
        self.command(StreamCommand::Reset)
    }

    fn command(&self, command: StreamCommand) -> Result<()> {
        if self.handle.is_none() {
            return Err(CanvasError::StreamClosed(self.id.to_string()));
        }
        self.command_tx
            .send(command)
            .map_err(|_| CanvasError::StreamClosed(self.id.to_string()))
    }

    /// Wait for the next output, `None` once the worker has stopped
    pub fn recv(&self) -> Option<StreamOutput> {
        self.output_rx.recv().ok()
    }

    /// Wait up to `timeout` for the next output
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StreamOutput> {
        match self.output_rx.recv_timeout(timeout) {
            Ok(output) => Some(output),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Next output if one is ready
    pub fn try_recv(&self) -> Option<StreamOutput> {
        self.output_rx.try_recv().ok()
    }

    /// Output channel, for selecting across several workers
    pub fn outputs(&self) -> &Receiver<StreamOutput> {
        &self.output_rx
    }

    /// Stop the worker and wait for it
    ///
    /// Reports queued before the call are still processed; their outputs
    /// remain readable afterwards.
    pub fn shutdown(&mut self) -> Result<WorkerStats> {
        let Some(handle) = self.handle.take() else {
            return Err(CanvasError::StreamClosed(self.id.to_string()));
        };

        if self.command_tx.send(StreamCommand::Shutdown).is_err() {
            debug!("Stream worker {} already stopped", self.id);
        }

        match handle.join() {
            Ok(stats) => {
                info!(
                    "Stream worker {} stopped: {} received, {} emitted, {} faults",
                    self.id, stats.received, stats.emitted, stats.faults
                );
                Ok(stats)
            }
            Err(_) => {
                error!("Stream worker {} panicked", self.id);
                Err(CanvasError::WorkerPanicked(self.id.to_string()))
            }
        }
    }
}

impl fmt::Debug for StreamWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWorker")
            .field("id", &self.id)
            .field("running", &self.handle.is_some())
            .field("pending_outputs", &self.output_rx.len())
            .finish()
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!("Dropping running stream worker {}", self.id);
            let _ = self.shutdown();
        }
    }
}

/// Worker thread body
fn run_stream<F: ReportFilter>(
    id: StreamId,
    mut filter: F,
    commands: Receiver<StreamCommand>,
    outputs: Sender<StreamOutput>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Report(report) => {
                stats.received += 1;
                match filter.consume(report) {
                    Ok(report) => {
                        stats.emitted += 1;
                        if outputs.send(StreamOutput::Report(report)).is_err() {
                            debug!("Stream {} output closed", id);
                            break;
                        }
                    }
                    Err(e) => {
                        stats.faults += 1;
                        let action = recovery_action(&e);
                        warn!("Stream {} fault ({:?}): {}", id, action, e);
                        let _ = outputs.send(StreamOutput::Fault(e));
                        if action == RecoveryAction::Fail {
                            break;
                        }
                    }
                }
            }
            StreamCommand::Reset => {
                stats.resets += 1;
                filter.reset();
                debug!("Stream {} reset", id);
            }
            StreamCommand::Shutdown => break,
        }
    }

    stats
}
