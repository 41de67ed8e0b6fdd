//! Tablet Reports
//!
//! The report type flowing through the filters, the stopwatch measuring the
//! gap between consecutive reports, and the filter seam stream workers drive.

use std::time::{Duration, Instant};

use glam::Vec2;

use crate::canvas::error::Result;

/// One position report from the digitizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabletReport {
    /// False when the pen is outside sensing range
    pub position_valid: bool,

    /// Position in digitizer units, or a displacement after a relative mode
    pub position: Vec2,

    /// Monotonic time the report was received
    pub timestamp: Instant,
}

impl TabletReport {
    /// Create a valid report
    pub fn new(position: Vec2, timestamp: Instant) -> Self {
        Self {
            position_valid: true,
            position,
            timestamp,
        }
    }

    /// Create an out-of-range report
    pub fn out_of_range(position: Vec2, timestamp: Instant) -> Self {
        Self {
            position_valid: false,
            position,
            timestamp,
        }
    }

    /// Same report with its position replaced
    pub fn with_position(self, position: Vec2) -> Self {
        Self { position, ..self }
    }
}

/// Measures the time between consecutive reports
#[derive(Debug, Clone, Default)]
pub struct DeltaStopwatch {
    last: Option<Instant>,
}

impl DeltaStopwatch {
    /// Create a stopwatch with no previous report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `now` and return the time since the previous call
    ///
    /// `None` when there was no previous call. Timestamps running backwards
    /// give a zero delta.
    pub fn restart(&mut self, now: Instant) -> Option<Duration> {
        let delta = self.last.map(|last| now.saturating_duration_since(last));
        self.last = Some(now);
        delta
    }

    /// Forget the previous report
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Time of the previous report
    pub fn last(&self) -> Option<Instant> {
        self.last
    }
}

/// A stateful per-stream report transformation
pub trait ReportFilter {
    /// Transform one report
    fn consume(&mut self, report: TabletReport) -> Result<TabletReport>;

    /// Drop per-stream state, as if no report had been seen
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwatch_first_delta_is_none() {
        let mut stopwatch = DeltaStopwatch::new();
        let start = Instant::now();

        assert_eq!(stopwatch.restart(start), None);
        assert_eq!(
            stopwatch.restart(start + Duration::from_millis(8)),
            Some(Duration::from_millis(8))
        );
        assert_eq!(
            stopwatch.restart(start + Duration::from_millis(20)),
            Some(Duration::from_millis(12))
        );
    }

    #[test]
    fn test_stopwatch_backwards_is_zero() {
        let mut stopwatch = DeltaStopwatch::new();
        let start = Instant::now() + Duration::from_secs(1);

        stopwatch.restart(start);
        assert_eq!(
            stopwatch.restart(start - Duration::from_millis(5)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_stopwatch_reset() {
        let mut stopwatch = DeltaStopwatch::new();
        let start = Instant::now();
        stopwatch.restart(start);
        stopwatch.reset();
        assert_eq!(stopwatch.last(), None);
        assert_eq!(stopwatch.restart(start), None);
    }

    #[test]
    fn test_with_position() {
        let now = Instant::now();
        let report = TabletReport::out_of_range(Vec2::ZERO, now).with_position(Vec2::ONE);
        assert!(!report.position_valid);
        assert_eq!(report.position, Vec2::ONE);
        assert_eq!(report.timestamp, now);
    }
}
