//! Utility Functions
//!
//! User-friendly error formatting.
//!
//! ## Error Formatting
//!
//! The [`errors`] module turns an `anyhow::Error` into a boxed report with
//! troubleshooting hints:
//!
//! ```rust
//! use canvas_remap::utils::format_user_error;
//!
//! let error = anyhow::anyhow!("Failed to parse config file");
//! let message = format_user_error(&error);
//! assert!(message.contains("Configuration Error"));
//! ```
//!
//! Error categories with context-aware help:
//! - Geometry errors → output mode, area sizes, digitizer description
//! - Property errors → value ranges and types, binding names
//! - Config errors → file location, TOML syntax, logging settings
//! - Trace errors → JSON-lines format, event types, timestamps
//!
//! Typed [`CanvasError`](crate::canvas::CanvasError)s anywhere in the error
//! chain are classified first; plain messages fall back to keyword matching.

pub mod errors;

pub use errors::format_user_error;
