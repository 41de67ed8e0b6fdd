//! Report Pipeline
//!
//! Each input stream gets its own [`StreamWorker`], a thread that owns one
//! filter instance. Streams run concurrently and never share mutable state;
//! only the read-mostly [`LiveSettings`](crate::canvas::LiveSettings) and
//! geometry slot are shared.
//!
//! ```text
//!  stream "pen-1" ──▶ [StreamWorker: CanvasEngine] ──▶ outputs
//!  stream "pen-2" ──▶ [StreamWorker: CanvasEngine] ──▶ outputs
//!                             │
//!                   shared CanvasContext (Arc)
//! ```

pub mod worker;

pub use worker::{StreamCommand, StreamId, StreamOutput, StreamWorker, WorkerStats};
