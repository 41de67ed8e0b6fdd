//! Rotated Rectangle Geometry
//!
//! Containment and clamping against rectangles that are rotated about their
//! own center. Exact quarter turns are handled without trigonometry so that
//! 0/90/180/270 degree areas behave identically to plain axis-aligned checks.

use glam::{Mat2, Vec2};

/// Default tolerance for [`is_nearly`]
pub const NEARLY_EPSILON: f32 = 1.0e-4;

/// Whether `a` and `b` differ by less than `error`
pub fn is_nearly(a: f32, b: f32, error: f32) -> bool {
    (a - b).abs() < error
}

/// Swap the components of a vector
pub fn flip(v: Vec2) -> Vec2 {
    Vec2::new(v.y, v.x)
}

/// Normalize a rotation into `[0, 360)` degrees
///
/// Non-finite rotations collapse to 0.
pub fn normalize_rotation(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round tiny negative values up to exactly 360
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Number of quarter turns if `degrees` is an exact multiple of 90
pub fn quarter_turns(degrees: f32) -> Option<u8> {
    let normalized = normalize_rotation(degrees);
    if normalized % 90.0 == 0.0 {
        Some((normalized / 90.0) as u8 % 4)
    } else {
        None
    }
}

/// Rectangle corners rotated about the rectangle center.
///
/// `origin` is the rotated `min` corner, `edge_x` / `edge_y` the rotated
/// edges leaving it.
#[derive(Debug, Clone, Copy)]
struct RotatedFrame {
    origin: Vec2,
    edge_x: Vec2,
    edge_y: Vec2,
}

impl RotatedFrame {
    fn new(min: Vec2, max: Vec2, rotation_deg: f32) -> Self {
        let pivot = (min + max) * 0.5;
        let extent = max - min;
        let rotation = Mat2::from_angle(normalize_rotation(rotation_deg).to_radians());

        Self {
            origin: pivot + rotation * (min - pivot),
            edge_x: rotation * Vec2::new(extent.x, 0.0),
            edge_y: rotation * Vec2::new(0.0, extent.y),
        }
    }
}

/// Axis-aligned bounds for a rectangle turned by whole quarter turns
fn quarter_turn_bounds(min: Vec2, max: Vec2, turns: u8) -> (Vec2, Vec2) {
    if turns % 2 == 0 {
        return (min, max);
    }
    let pivot = (min + max) * 0.5;
    let half = flip(max - min) * 0.5;
    (pivot - half, pivot + half)
}

/// Whether `point` lies strictly inside the rectangle `[min, max]` rotated
/// by `rotation_deg` about its center
pub fn is_within(point: Vec2, min: Vec2, max: Vec2, rotation_deg: f32) -> bool {
    if let Some(turns) = quarter_turns(rotation_deg) {
        let (lo, hi) = quarter_turn_bounds(min, max, turns);
        return lo.x < point.x && point.x < hi.x && lo.y < point.y && point.y < hi.y;
    }

    let frame = RotatedFrame::new(min, max, rotation_deg);
    let relative = point - frame.origin;
    let along_x = frame.edge_x.dot(relative);
    let along_y = frame.edge_y.dot(relative);

    0.0 < along_x
        && along_x < frame.edge_x.length_squared()
        && 0.0 < along_y
        && along_y < frame.edge_y.length_squared()
}

/// Clamp `point` onto the rectangle `[min, max]` rotated by `rotation_deg`
/// about its center
///
/// Points strictly inside are returned unchanged.
pub fn clamp(point: Vec2, min: Vec2, max: Vec2, rotation_deg: f32) -> Vec2 {
    if let Some(turns) = quarter_turns(rotation_deg) {
        let (lo, hi) = quarter_turn_bounds(min, max, turns);
        return point.clamp(lo, hi);
    }

    if is_within(point, min, max, rotation_deg) {
        return point;
    }

    let frame = RotatedFrame::new(min, max, rotation_deg);
    let relative = point - frame.origin;

    let len_x = frame.edge_x.length();
    let len_y = frame.edge_y.length();
    let dir_x = frame.edge_x.normalize_or_zero();
    let dir_y = frame.edge_y.normalize_or_zero();

    let along_x = dir_x.dot(relative).clamp(0.0, len_x);
    let along_y = dir_y.dot(relative).clamp(0.0, len_y);

    frame.origin + dir_x * along_x + dir_y * along_y
}

/// Rectangle rotated about its center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    /// Minimum corner before rotation
    pub min: Vec2,
    /// Maximum corner before rotation
    pub max: Vec2,
    /// Rotation in degrees, counter-clockwise about the center
    pub rotation_deg: f32,
}

impl RotatedRect {
    /// Create from two corners
    pub fn new(min: Vec2, max: Vec2, rotation_deg: f32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            rotation_deg,
        }
    }

    /// Create from a center point and a size
    pub fn from_center(center: Vec2, size: Vec2, rotation_deg: f32) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half, rotation_deg)
    }

    /// Rectangle center
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Unrotated width and height
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Strict containment test
    pub fn contains(&self, point: Vec2) -> bool {
        is_within(point, self.min, self.max, self.rotation_deg)
    }

    /// Clamp a point onto the rectangle
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        clamp(point, self.min, self.max, self.rotation_deg)
    }
}
