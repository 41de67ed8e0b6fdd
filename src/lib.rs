//! # canvas-remap
//!
//! Canvas-mode relative motion for absolute pen tablets.
//!
//! A tablet in "mouse mode" should move the cursor by the pen's displacement
//! rather than jump to the point under the nib. This crate keeps a per-stream
//! virtual canvas whose origin follows the pen between strokes, so absolute
//! digitizer reports come out as relative motion mapped through the
//! configured output area, optionally accelerated by the Windows pointer
//! curve.
//!
//! # Architecture
//!
//! ```text
//! canvas-remap
//!   ├─> canvas    (geometry, curve, settings, bindings, CanvasEngine)
//!   ├─> pipeline  (one StreamWorker thread per input stream)
//!   ├─> config    (TOML configuration, geometry resolution)
//!   ├─> replay    (JSON-lines trace replay)
//!   └─> utils     (user-facing error formatting)
//! ```
//!
//! # Data Flow
//!
//! **Report Path:** Trace/Device → StreamWorker → CanvasEngine → Output
//!
//! **Property Path:** Binding press/release → LiveSettings → next report

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Canvas transform engine
pub mod canvas;

/// Configuration loading and validation
pub mod config;

/// Per-stream worker threads
pub mod pipeline;

/// Trace replay driver
pub mod replay;

/// Utility functions
pub mod utils;
