//! Vector math, rotation caching, and pixel/unit conversion.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use vek::{Aabr, Extent2};

use crate::config::GEOMETRY_PIXELS_PER_UNIT;

/// A 2D vector or point, in world units.
pub type Vector2 = vek::Vec2<f64>;

/// An axis-aligned bounding box with `(x, y)` as the lower corner and non-negative extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Lower corner.
    pub min: Vector2,
    /// Width and height.
    pub extent: Extent2<f64>,
}

impl AABB {
    /// Construct from a lower corner and non-negative extents.
    pub fn new(min: Vector2, extent: Extent2<f64>) -> Self {
        debug_assert!(extent.w >= 0.0 && extent.h >= 0.0);

        Self { min, extent }
    }

    /// Construct a box centered on `center` with the given half-extents.
    pub fn from_center_half_extents(center: Vector2, half: Vector2) -> Self {
        Self::new(center - half, Extent2::new(half.x * 2.0, half.y * 2.0))
    }

    /// Build an AABB tightly bounding a point cloud.
    ///
    /// Returns a zero-sized box at the origin for an empty slice.
    pub fn from_points(points: &[Vector2]) -> Self {
        let Some(first) = points.first() else {
            return Self::new(Vector2::zero(), Extent2::zero());
        };

        let (mut min, mut max) = (*first, *first);
        for p in &points[1..] {
            min = Vector2::new(min.x.min(p.x), min.y.min(p.y));
            max = Vector2::new(max.x.max(p.x), max.y.max(p.y));
        }

        Self::new(min, Extent2::new(max.x - min.x, max.y - min.y))
    }

    /// Upper corner, `min + extent`.
    pub fn max(&self) -> Vector2 {
        Vector2::new(self.min.x + self.extent.w, self.min.y + self.extent.h)
    }

    /// True if this box overlaps `other`, touching edges counting as overlap.
    pub fn overlaps(&self, other: &AABB) -> bool {
        let a_max = self.max();
        let b_max = other.max();

        self.min.x <= b_max.x && a_max.x >= other.min.x && self.min.y <= b_max.y && a_max.y >= other.min.y
    }
}

impl From<AABB> for Aabr<f64> {
    fn from(aabb: AABB) -> Self {
        Aabr {
            min: aabb.min,
            max: aabb.max(),
        }
    }
}

/// A position together with a cached rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// World-space position.
    pub position: Vector2,
    /// Cached sine/cosine of `angle`.
    pub rotation: Rotation,
    /// Orientation in radians, normalized to `[0, 2π)`.
    pub angle: f64,
}

impl Transform {
    /// Construct at `position` with zero rotation.
    pub fn from_position(position: Vector2) -> Self {
        Self {
            position,
            rotation: Rotation::zero(),
            angle: 0.0,
        }
    }

    /// Construct at `position` with the given angle in radians.
    pub fn new(position: Vector2, angle: f64) -> Self {
        let mut transform = Self::from_position(position);
        transform.set_angle(angle);
        transform
    }

    /// Set the angle, normalizing it to `[0, 2π)` and refreshing the sin/cos cache.
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = normalize_angle(angle);
        self.rotation = Rotation::from_radians(self.angle);
    }

    /// Rotate then translate a local-space point into world space.
    pub fn transform_point(&self, point: Vector2) -> Vector2 {
        self.position + self.rotation.rotate(point)
    }

    /// Inverse of [`Transform::transform_point`]: world space into local space.
    pub fn inverse_transform_point(&self, point: Vector2) -> Vector2 {
        self.rotation.inverse_rotate(point - self.position)
    }
}

/// Normalize an angle in radians to `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let wrapped = angle % two_pi;

    if wrapped < 0.0 {
        wrapped + two_pi
    } else {
        wrapped
    }
}

/// A rotation split into its sine and cosine parts.
///
/// This allows composing rotations without re-deriving an angle each time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// Sine part of the rotation.
    sin: f64,
    /// Cosine part of the rotation.
    cos: f64,
}

impl Rotation {
    /// The identity rotation (no rotation, points along +x).
    pub fn zero() -> Self {
        Self { sin: 0.0, cos: 1.0 }
    }

    /// Build from raw sine/cosine; caller must ensure `sin² + cos² ≈ 1`.
    pub fn from_sin_cos(sin: f64, cos: f64) -> Self {
        Self { sin, cos }
    }

    /// Create from an angle in radians.
    pub fn from_radians(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { sin, cos }
    }

    /// Create from a (not necessarily normalized) direction vector.
    pub fn from_direction(dir: Vector2) -> Self {
        Self::from_radians(dir.y.atan2(dir.x))
    }

    /// Recover the angle in radians via `atan2(sin, cos)`.
    pub fn to_radians(self) -> f64 {
        self.sin.atan2(self.cos)
    }

    /// Sine of the rotation.
    pub fn sin(&self) -> f64 {
        self.sin
    }

    /// Cosine of the rotation.
    pub fn cos(&self) -> f64 {
        self.cos
    }

    /// Rotate a vector by this rotation.
    pub fn rotate(&self, v: Vector2) -> Vector2 {
        Vector2::new(
            v.x * self.cos - v.y * self.sin,
            v.x * self.sin + v.y * self.cos,
        )
    }

    /// Rotate a vector by the inverse of this rotation.
    pub fn inverse_rotate(&self, v: Vector2) -> Vector2 {
        Vector2::new(
            v.x * self.cos + v.y * self.sin,
            -v.x * self.sin + v.y * self.cos,
        )
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Rotation {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            cos: self.cos * rhs.cos - self.sin * rhs.sin,
            sin: self.sin * rhs.cos + self.cos * rhs.sin,
        }
    }
}

impl AddAssign for Rotation {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for Rotation {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            cos: self.cos,
            sin: -self.sin,
        }
    }
}

impl Sub for Rotation {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + -rhs
    }
}

impl SubAssign for Rotation {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// 2D cross product, returning the scalar `a.x*b.y - a.y*b.x`.
pub fn cross(a: Vector2, b: Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Cross a scalar with a vector, `s * (x, y) -> (-s*y, s*x)`.
pub fn cross_scalar_vector(s: f64, v: Vector2) -> Vector2 {
    Vector2::new(-s * v.y, s * v.x)
}

/// Unit left-normal of the directed edge `b - a` (rotate +90°).
///
/// Returns the normalized normal, or `(0, 0)` if the edge has zero length.
pub fn left_normal(a: Vector2, b: Vector2) -> Vector2 {
    left_normal_vec(b - a)
}

/// Unit left-normal of `v` itself (rotate +90°), or `(0, 0)` if `v` is zero-length.
pub fn left_normal_vec(v: Vector2) -> Vector2 {
    Vector2::new(-v.y, v.x).try_normalized().unwrap_or_else(Vector2::zero)
}

/// Unit right-normal of `v` (rotate -90°), or `(0, 0)` if `v` is zero-length.
pub fn right_normal_vec(v: Vector2) -> Vector2 {
    Vector2::new(v.y, -v.x).try_normalized().unwrap_or_else(Vector2::zero)
}

/// Orientation test via slope comparison, matching the reference's sign
/// convention: negative if `c` is left of the directed line `a -> b`,
/// positive if right, zero if collinear.
pub fn orientation(a: Vector2, b: Vector2, c: Vector2) -> i32 {
    let value = cross(b - a, c - a);
    (value < 0.0) as i32 - (value > 0.0) as i32
}

/// Convert a distance in world units to pixels.
///
/// The identity when [`GEOMETRY_PIXELS_PER_UNIT`] is non-positive.
pub fn units_to_pixels(units: f64) -> f64 {
    if GEOMETRY_PIXELS_PER_UNIT <= 0.0 {
        units
    } else {
        units * GEOMETRY_PIXELS_PER_UNIT
    }
}

/// Convert a distance in pixels to world units.
///
/// The identity when [`GEOMETRY_PIXELS_PER_UNIT`] is non-positive.
pub fn pixels_to_units(pixels: f64) -> f64 {
    if GEOMETRY_PIXELS_PER_UNIT <= 0.0 {
        pixels
    } else {
        pixels / GEOMETRY_PIXELS_PER_UNIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_composes() {
        let a = Rotation::from_radians(90f64.to_radians());
        let b = Rotation::from_radians(45f64.to_radians());

        assert!(((a + b).to_radians().to_degrees() - 135.0).abs() < 1e-9);
        assert!(((a - b).to_radians().to_degrees() - 45.0).abs() < 1e-9);
        assert!(((-a).to_radians().to_degrees() + 90.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_rotate_and_inverse_round_trip() {
        let rot = Rotation::from_radians(37f64.to_radians());
        let v = Vector2::new(3.0, -2.0);

        let round_tripped = rot.inverse_rotate(rot.rotate(v));
        assert!((round_tripped - v).magnitude() < 1e-9);
    }

    #[test]
    fn angle_normalizes_into_range() {
        let angle = normalize_angle(-1.0);
        assert!((0.0..std::f64::consts::TAU).contains(&angle));

        let angle = normalize_angle(10.0 * std::f64::consts::PI + 0.1);
        assert!((0.0..std::f64::consts::TAU).contains(&angle));
    }

    #[test]
    fn transform_set_angle_keeps_sin_cos_in_sync() {
        let mut t = Transform::from_position(Vector2::zero());
        t.set_angle(123f64.to_radians());

        assert!(t.angle >= 0.0 && t.angle < std::f64::consts::TAU);
        assert!((t.rotation.sin().powi(2) + t.rotation.cos().powi(2) - 1.0).abs() < 1e-9);
        assert!((t.rotation.sin() - t.angle.sin()).abs() < 1e-9);
    }

    #[test]
    fn aabb_overlap_is_inclusive_at_edges() {
        let a = AABB::new(Vector2::new(0.0, 0.0), Extent2::new(1.0, 1.0));
        let b = AABB::new(Vector2::new(1.0, 0.0), Extent2::new(1.0, 1.0));

        assert!(a.overlaps(&b));
    }

    #[test]
    fn pixel_conversion_round_trips() {
        let units = 2.5;
        assert!((pixels_to_units(units_to_pixels(units)) - units).abs() < 1e-9);
    }

    #[test]
    fn orientation_detects_left_right_and_collinear() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(1.0, 0.0);

        assert_eq!(orientation(a, b, Vector2::new(0.5, 1.0)), -1);
        assert_eq!(orientation(a, b, Vector2::new(0.5, -1.0)), 1);
        assert_eq!(orientation(a, b, Vector2::new(2.0, 0.0)), 0);
    }
}
