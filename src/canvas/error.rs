//! Canvas Error Types
//!
//! Error handling for the canvas transform engine, its geometry snapshot and
//! the live property surface.

use thiserror::Error;

/// Result type for canvas operations
pub type Result<T> = std::result::Result<T, CanvasError>;

/// Canvas module error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    /// The resolved output mode is relative, but the filter maps absolute positions
    #[error("Absolute output mode required, found {0} output mode")]
    AbsoluteModeRequired(&'static str),

    /// The resolved output mode is absolute, but the filter accelerates relative motion
    #[error("Relative output mode required, found {0} output mode")]
    RelativeModeRequired(&'static str),

    /// Input or output area has zero or negative extent
    #[error("Degenerate {area} area: {width} x {height}")]
    DegenerateArea {
        /// Which area ("input" or "output")
        area: &'static str,
        /// Area width
        width: f32,
        /// Area height
        height: f32,
    },

    /// Digitizer bounds or physical size are zero or negative
    #[error("Degenerate digitizer: max ({0}, {1})")]
    DegenerateDigitizer(f32, f32),

    /// Output transform cannot be inverted
    #[error("Output transform is not invertible (determinant {0})")]
    NonInvertibleTransform(f32),

    /// NaN or infinity inside geometry input
    #[error("Non-finite geometry value in {0}")]
    NonFiniteGeometry(&'static str),

    /// Acceleration curve table violates its ordering rules
    #[error("Invalid acceleration curve: {0}")]
    InvalidCurve(String),

    /// Property value kind does not match the property
    #[error("Property '{property}' expects a {expected} value")]
    PropertyTypeMismatch {
        /// Property display name
        property: &'static str,
        /// Expected value kind
        expected: &'static str,
    },

    /// Property value outside its allowed range
    #[error("Invalid value for '{0}': {1}")]
    InvalidPropertyValue(&'static str, String),

    /// Unknown property name
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// Stream worker input channel closed
    #[error("Stream {0} is closed")]
    StreamClosed(String),

    /// Stream worker thread panicked
    #[error("Stream worker {0} panicked")]
    WorkerPanicked(String),

    /// Thread spawn or other IO failure
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CanvasError {
    fn from(err: std::io::Error) -> Self {
        CanvasError::Io(err.to_string())
    }
}

/// Error classification for recovery strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Output mode of the wrong kind
    Configuration,
    /// Geometry rejected at snapshot construction
    Geometry,
    /// Property or binding errors
    Property,
    /// Stream worker / channel errors
    Pipeline,
    /// IO errors
    Io,
}

/// Classify error for recovery strategy selection
pub fn classify_error(error: &CanvasError) -> ErrorType {
    match error {
        CanvasError::AbsoluteModeRequired(_) | CanvasError::RelativeModeRequired(_) => {
            ErrorType::Configuration
        }

        CanvasError::DegenerateArea { .. }
        | CanvasError::DegenerateDigitizer(_, _)
        | CanvasError::NonInvertibleTransform(_)
        | CanvasError::NonFiniteGeometry(_)
        | CanvasError::InvalidCurve(_) => ErrorType::Geometry,

        CanvasError::PropertyTypeMismatch { .. }
        | CanvasError::InvalidPropertyValue(_, _)
        | CanvasError::UnknownProperty(_) => ErrorType::Property,

        CanvasError::StreamClosed(_) | CanvasError::WorkerPanicked(_) => ErrorType::Pipeline,

        CanvasError::Io(_) => ErrorType::Io,
    }
}

/// Recovery action to take after error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Forward reports untransformed until the geometry provider publishes a new output mode
    AwaitReconfiguration,

    /// Reject the offending value and keep the previous one
    KeepPrevious,

    /// Stop the stream and propagate the error
    Fail,
}

/// Determine recovery action for error
pub fn recovery_action(error: &CanvasError) -> RecoveryAction {
    match classify_error(error) {
        ErrorType::Configuration | ErrorType::Geometry => RecoveryAction::AwaitReconfiguration,
        ErrorType::Property => RecoveryAction::KeepPrevious,
        ErrorType::Pipeline | ErrorType::Io => RecoveryAction::Fail,
    }
}
