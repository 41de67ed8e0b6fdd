//! Acceleration Curve
//!
//! Piecewise-linear velocity curve sampled to turn a pointer velocity into a
//! displacement multiplier. The default table reproduces the Windows pointer
//! acceleration curve with velocities in inches per second.

use std::borrow::Cow;

use glam::Vec2;

use crate::canvas::error::{CanvasError, Result};

/// Velocities below this magnitude produce a zero multiplier
pub const MULTIPLIER_EPSILON: f32 = 0.1;

/// Control points of the Windows pointer acceleration curve
pub const WINDOWS_CURVE: [Vec2; 5] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.43, 1.37),
    Vec2::new(1.25, 5.3),
    Vec2::new(3.86, 24.3),
    Vec2::new(40.0, 568.0),
];

/// Piecewise-linear `(velocity, output velocity)` table
#[derive(Debug, Clone, PartialEq)]
pub struct AccelerationCurve {
    points: Cow<'static, [Vec2]>,
}

impl AccelerationCurve {
    /// Build a curve from custom control points
    ///
    /// Requires at least two finite points, the first at velocity 0, with
    /// strictly increasing velocities.
    pub fn new(points: Vec<Vec2>) -> Result<Self> {
        Self::validate(&points)?;
        Ok(Self {
            points: Cow::Owned(points),
        })
    }

    /// The default Windows curve
    pub fn windows() -> Self {
        Self {
            points: Cow::Borrowed(&WINDOWS_CURVE),
        }
    }

    fn validate(points: &[Vec2]) -> Result<()> {
        if points.len() < 2 {
            return Err(CanvasError::InvalidCurve(format!(
                "need at least 2 control points, got {}",
                points.len()
            )));
        }

        if let Some(point) = points.iter().find(|p| !p.is_finite()) {
            return Err(CanvasError::InvalidCurve(format!(
                "non-finite control point {point}"
            )));
        }

        if points[0].x != 0.0 {
            return Err(CanvasError::InvalidCurve(format!(
                "first control point must be at velocity 0, got {}",
                points[0].x
            )));
        }

        for pair in points.windows(2) {
            if pair[1].x <= pair[0].x {
                return Err(CanvasError::InvalidCurve(format!(
                    "velocities must strictly increase ({} then {})",
                    pair[0].x, pair[1].x
                )));
            }
        }

        Ok(())
    }

    /// Control points
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Output velocity for an input velocity
    ///
    /// Inputs past the last control point extrapolate along the final segment.
    pub fn value(&self, velocity: f32) -> f32 {
        let points = &self.points;
        let last = points.len() - 1;

        let mut upper = 1;
        while upper < last && velocity > points[upper].x {
            upper += 1;
        }

        let a = points[upper - 1];
        let b = points[upper];
        let t = (velocity - a.x) / (b.x - a.x);
        a.y + (b.y - a.y) * t
    }

    /// Displacement multiplier for an input velocity
    pub fn multiplier(&self, velocity: f32) -> f32 {
        if velocity.abs() < MULTIPLIER_EPSILON {
            return 0.0;
        }
        self.value(velocity) / velocity
    }
}

impl Default for AccelerationCurve {
    fn default() -> Self {
        Self::windows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_hits_control_points() {
        let curve = AccelerationCurve::windows();
        for point in WINDOWS_CURVE {
            assert!((curve.value(point.x) - point.y).abs() < 1.0e-3);
        }
    }

    #[test]
    fn test_value_interpolates() {
        let curve = AccelerationCurve::windows();
        let mid = curve.value(0.215);
        assert!((mid - 0.685).abs() < 1.0e-4);
    }

    #[test]
    fn test_value_extrapolates_last_segment() {
        let curve = AccelerationCurve::windows();
        let slope = (568.0 - 24.3) / (40.0 - 3.86);
        let expected = 568.0 + slope * 10.0;
        assert!((curve.value(50.0) - expected).abs() < 1.0e-2);
    }

    #[test]
    fn test_multiplier_zero_near_rest() {
        let curve = AccelerationCurve::windows();
        assert_eq!(curve.multiplier(0.0), 0.0);
        assert_eq!(curve.multiplier(0.05), 0.0);
        assert_eq!(curve.multiplier(-0.09), 0.0);
    }

    #[test]
    fn test_multiplier_finite_across_domain() {
        let curve = AccelerationCurve::windows();
        let mut velocity = 0.0f32;
        while velocity < 200.0 {
            let m = curve.multiplier(velocity);
            assert!(m.is_finite(), "multiplier({velocity}) = {m}");
            assert!(m >= 0.0);
            velocity += 0.05;
        }
    }

    #[test]
    fn test_multiplier_continuous() {
        let curve = AccelerationCurve::windows();
        let mut previous = curve.multiplier(0.1);
        let mut velocity = 0.1f32;
        while velocity < 60.0 {
            velocity += 0.01;
            let current = curve.multiplier(velocity);
            assert!((current - previous).abs() < 0.1, "jump at {velocity}");
            previous = current;
        }
    }

    #[test]
    fn test_first_segment_slope_limit() {
        let curve = AccelerationCurve::windows();
        let slope = 1.37 / 0.43;
        assert!((curve.multiplier(0.2) - slope).abs() < 1.0e-3);
    }

    #[test]
    fn test_custom_curve_validation() {
        assert!(AccelerationCurve::new(vec![Vec2::ZERO]).is_err());
        assert!(AccelerationCurve::new(vec![Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0)]).is_err());
        assert!(AccelerationCurve::new(vec![
            Vec2::ZERO,
            Vec2::new(2.0, 1.0),
            Vec2::new(2.0, 3.0)
        ])
        .is_err());
        assert!(AccelerationCurve::new(vec![Vec2::ZERO, Vec2::new(f32::NAN, 1.0)]).is_err());

        let linear = AccelerationCurve::new(vec![Vec2::ZERO, Vec2::new(1.0, 2.0)])
            .expect("valid curve");
        assert!((linear.multiplier(5.0) - 2.0).abs() < 1.0e-5);
    }
}
