//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common error scenarios.

use std::fmt::Write;

use crate::canvas::error::{classify_error, CanvasError, ErrorType};

/// Broad category of a failure, used to pick the troubleshooting hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Geometry,
    Property,
    Config,
    Trace,
    Pipeline,
    Generic,
}

fn categorize(error: &anyhow::Error) -> Category {
    // Typed errors anywhere in the chain win over message matching
    if let Some(canvas) = error.chain().find_map(|e| e.downcast_ref::<CanvasError>()) {
        return match classify_error(canvas) {
            ErrorType::Configuration | ErrorType::Geometry => Category::Geometry,
            ErrorType::Property => Category::Property,
            ErrorType::Pipeline | ErrorType::Io => Category::Pipeline,
        };
    }

    let error_msg = error.to_string();
    if error_msg.contains("trace") || error_msg.contains("Trace") {
        Category::Trace
    } else if error_msg.contains("binding") || error_msg.contains("Binding") {
        Category::Property
    } else if error_msg.contains("config") || error_msg.contains("log") {
        Category::Config
    } else {
        Category::Generic
    }
}

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    // Header
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    let error_msg = error.to_string();
    match categorize(error) {
        Category::Geometry => format_geometry_error(&mut output),
        Category::Property => format_property_error(&mut output),
        Category::Config => format_config_error(&mut output),
        Category::Trace => format_trace_error(&mut output),
        Category::Pipeline => format_pipeline_error(&mut output),
        Category::Generic => format_generic_error(&mut output, &error_msg),
    }

    // Technical details
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    // Footer with help
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: canvas-remap -vvv"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Print the default configuration: canvas-remap --print-default-config"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_geometry_error(output: &mut String) {
    writeln!(output, "Output Geometry Error").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "The digitizer or output area cannot be used for canvas mode."
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Relative output mode selected").ok();
    writeln!(
        output,
        "     → Canvas mode needs: [geometry] mode = \"absolute\""
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. Zero-sized area").ok();
    writeln!(
        output,
        "     → Check [geometry.input] size and [geometry.output] size"
    )
    .ok();
    writeln!(output, "     → Both components must be greater than zero").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Digitizer description incomplete").ok();
    writeln!(
        output,
        "     → digitizer_max and digitizer_size_mm must both be positive"
    )
    .ok();
}

fn format_property_error(output: &mut String) {
    writeln!(output, "Filter Property Error").ok();
    writeln!(output).ok();
    writeln!(output, "A filter property or binding has an invalid value.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Value out of range").ok();
    writeln!(
        output,
        "     → speed_multiplier and acceleration_intensity must be >= 0"
    )
    .ok();
    writeln!(output, "     → device_compensation must be > 0").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Value of the wrong type").ok();
    writeln!(output, "     → reset_time_ms takes an integer").ok();
    writeln!(
        output,
        "     → Boolean properties ignore the binding value"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  3. Binding name used twice or missing").ok();
    writeln!(
        output,
        "     → Trace press/release events must name a [[bindings]] entry"
    )
    .ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Configuration file not found").ok();
    writeln!(
        output,
        "     → Specify: canvas-remap -c /path/to/canvas.toml trace.jsonl"
    )
    .ok();
    writeln!(
        output,
        "     → Create one: canvas-remap --print-default-config > canvas.toml"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output, "     → Vectors are written as [x, y]").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Invalid logging settings").ok();
    writeln!(
        output,
        "     → level: trace, debug, info, warn or error"
    )
    .ok();
    writeln!(output, "     → format: pretty, compact or json").ok();
}

fn format_trace_error(output: &mut String) {
    writeln!(output, "Trace Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not read the input trace.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Not JSON lines").ok();
    writeln!(output, "     → One event object per line").ok();
    writeln!(
        output,
        "     → Example: {{\"type\":\"report\",\"t_ms\":0,\"x\":7600,\"y\":4750}}"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. Unknown event type").ok();
    writeln!(output, "     → Supported: report, press, release, reset").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Negative or missing timestamp").ok();
    writeln!(output, "     → t_ms counts milliseconds from trace start").ok();
}

fn format_pipeline_error(output: &mut String) {
    writeln!(output, "Stream Worker Error").ok();
    writeln!(output).ok();
    writeln!(output, "A stream worker stopped while reports were pending.").ok();
    writeln!(output).ok();
    writeln!(output, "Troubleshooting:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Re-run with -vvv to see the worker log").ok();
    writeln!(output, "  2. Check the output destination is writable").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Replay Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred while replaying the trace.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
    writeln!(output).ok();
    writeln!(output, "Troubleshooting:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Validate the configuration:").ok();
    writeln!(output, "     → canvas-remap -c canvas.toml --check").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Re-run with detailed logs:").ok();
    writeln!(output, "     → canvas-remap -vvv trace.jsonl").ok();
}
