//! Aspect-Ratio Normalizer
//!
//! Displacement is accumulated in digitizer space, but the distortion to undo
//! comes from the output area having a different shape than the input area.
//! The correction scale is built in output space and conjugated back through
//! the linear part of the output transform.

use glam::{Affine2, Mat2, Vec2};

use crate::canvas::error::{CanvasError, Result};
use crate::canvas::snapshot::GeometrySnapshot;

/// Minimum determinant magnitude for an invertible transform
pub const MIN_DETERMINANT: f32 = 1.0e-12;

/// Aspect ratio of a size, rejecting degenerate extents
fn aspect(size: Vec2, area: &'static str) -> Result<f32> {
    if !(size.x > 0.0 && size.y > 0.0) {
        return Err(CanvasError::DegenerateArea {
            area,
            width: size.x,
            height: size.y,
        });
    }
    Ok(size.x / size.y)
}

/// Linear correction applied to raw digitizer displacement
///
/// Maps a displacement into output space, scales it by the normalized
/// `(input aspect / output aspect, 1)` vector and maps it back.
pub fn aspect_ratio_correction(
    transform: &Affine2,
    input_size: Vec2,
    output_size: Vec2,
) -> Result<Mat2> {
    let linear = transform.matrix2;
    let determinant = linear.determinant();
    if !determinant.is_finite() || determinant.abs() < MIN_DETERMINANT {
        return Err(CanvasError::NonInvertibleTransform(determinant));
    }

    let input_aspect = aspect(input_size, "input")?;
    let output_aspect = aspect(output_size, "output")?;

    let scale = Vec2::new(input_aspect / output_aspect, 1.0).normalize();
    if !scale.is_finite() {
        return Err(CanvasError::NonFiniteGeometry("aspect ratio scale"));
    }

    Ok(linear.inverse() * Mat2::from_diagonal(scale) * linear)
}

/// Correction matrix to use for a report, identity when disabled
pub fn normalization_matrix(snapshot: &GeometrySnapshot, enabled: bool) -> Mat2 {
    if enabled {
        snapshot.aspect_correction()
    } else {
        Mat2::IDENTITY
    }
}
