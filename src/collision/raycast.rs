//! Ray queries against a single shape: analytic circle intersection and
//! per-edge line intersection with parity-based inside/outside classification.

use crate::math::{left_normal_vec, Transform, Vector2};
use crate::shape::Shape;

/// A ray: an origin, a direction (normalized on construction), and a maximum
/// travel distance beyond which hits are not reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin, in world space.
    pub origin: Vector2,
    /// Normalized travel direction.
    pub direction: Vector2,
    /// Hits farther than this distance along `direction` are ignored.
    pub max_distance: f64,
}

impl Ray {
    /// Build a ray, normalizing `direction`.
    ///
    /// A zero-length `direction` normalizes to the zero vector, which will
    /// simply never hit anything.
    pub fn new(origin: Vector2, direction: Vector2, max_distance: f64) -> Self {
        Self {
            origin,
            direction: direction.try_normalized().unwrap_or_else(Vector2::zero),
            max_distance,
        }
    }
}

/// The result of a ray hitting a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space hit point.
    pub point: Vector2,
    /// Outward surface normal at the hit point.
    pub normal: Vector2,
    /// Distance from the ray origin to the hit point, along `direction`.
    pub distance: f64,
    /// Whether the ray origin started inside the shape.
    pub inside: bool,
}

/// Cast `ray` against `shape` positioned at `tx`.
pub fn cast_ray(shape: &Shape, tx: &Transform, ray: &Ray) -> Option<RayHit> {
    match shape {
        Shape::Circle { radius, .. } => cast_ray_circle(tx.position, *radius, ray),
        Shape::Polygon { .. } => cast_ray_polygon(shape, tx, ray),
    }
}

fn cast_ray_circle(center: Vector2, radius: f64, ray: &Ray) -> Option<RayHit> {
    let distance = intersect_circle_line(center, radius, ray.origin, ray.direction)?;

    if distance < 0.0 || distance > ray.max_distance {
        return None;
    }

    let point = ray.origin + ray.direction * distance;

    Some(RayHit {
        point,
        normal: left_normal_vec(ray.origin - point),
        distance,
        inside: distance < 0.0,
    })
}

fn cast_ray_polygon(shape: &Shape, tx: &Transform, ray: &Ray) -> Option<RayHit> {
    let vertices = shape.vertices();
    let n = vertices.len();
    if n < 3 {
        return None;
    }

    let mut intersection_count = 0usize;
    let mut min_distance = f64::MAX;
    let mut best: Option<(Vector2, Vector2)> = None;

    let mut j = n - 1;
    for i in 0..n {
        let v1 = tx.transform_point(vertices[i]);
        let v2 = tx.transform_point(vertices[j]);
        j = i;

        let edge_vector = v1 - v2;

        if let Some(distance) = intersect_lines(ray.origin, ray.direction, v2, edge_vector) {
            if distance <= ray.max_distance {
                if min_distance > distance {
                    min_distance = distance;
                    let point = ray.origin + ray.direction * min_distance;
                    best = Some((point, left_normal_vec(edge_vector)));
                }

                intersection_count += 1;
            }
        }
    }

    let inside = intersection_count % 2 == 1;

    if inside || intersection_count == 0 {
        return None;
    }

    let (point, normal) = best?;
    Some(RayHit {
        point,
        normal,
        distance: min_distance,
        inside,
    })
}

/// Analytic circle/ray intersection. Returns the signed distance along
/// `direction` to the near intersection (negative if `origin` is inside the
/// circle), or `None` if the ray's infinite line misses the circle entirely.
fn intersect_circle_line(
    center: Vector2,
    radius: f64,
    origin: Vector2,
    direction: Vector2,
) -> Option<f64> {
    let origin_to_center = center - origin;

    let dot = origin_to_center.dot(direction);

    let height_sqr = origin_to_center.magnitude_squared() - dot * dot;
    let base_sqr = radius * radius - height_sqr;

    if base_sqr < 0.0 {
        return None;
    }

    Some(dot - base_sqr.sqrt())
}

/// Intersection parameter of ray `(origin1, direction1)` against segment
/// `[origin2, origin2 + direction2]`, treating `direction1` as spanning
/// parameter range `[0, 1]` exactly like `direction2` does. When `direction1`
/// is a unit vector (as `Ray::direction` always is), the returned value is
/// also the true distance along the ray, but only within one world unit of
/// `origin1` — hits on the same infinite line farther out are not reported
/// by the general (non-parallel) branch.
fn intersect_lines(
    origin1: Vector2,
    direction1: Vector2,
    origin2: Vector2,
    direction2: Vector2,
) -> Option<f64> {
    let r_cross_s = direction1.x * direction2.y - direction1.y * direction2.x;

    let qp = origin2 - origin1;
    let qp_cross_s = qp.x * direction2.y - qp.y * direction2.x;
    let qp_cross_r = qp.x * direction1.y - qp.y * direction1.x;

    if r_cross_s != 0.0 {
        let inverse_r_cross_s = 1.0 / r_cross_s;

        let t = qp_cross_s * inverse_r_cross_s;
        let u = qp_cross_r * inverse_r_cross_s;

        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    } else {
        if qp_cross_r != 0.0 {
            return None;
        }

        let r_dot_r = direction1.dot(direction1);
        let s_dot_r = direction2.dot(direction1);

        let inverse_r_dot_r = 1.0 / r_dot_r;
        let qp_dot_r = qp.dot(direction1);

        let t0_raw = qp_dot_r * inverse_r_dot_r;
        let t1_raw = t0_raw + s_dot_r * inverse_r_dot_r;

        let (t0, t1) = if s_dot_r < 0.0 {
            (t1_raw, t0_raw)
        } else {
            (t0_raw, t1_raw)
        };

        if (t0 < 0.0 && t1 == 0.0) || (t0 == 1.0 && t1 > 1.0) {
            Some(if t0 == 1.0 { 1.0 } else { 0.0 })
        } else if t1 >= 0.0 && t0 <= 1.0 {
            Some(0.0)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Material;

    fn mat() -> Material {
        Material::default()
    }

    #[test]
    fn ray_hits_circle_head_on() {
        let circle = Shape::circle(mat(), 1.0).unwrap();
        let tx = Transform::from_position(Vector2::new(5.0, 0.0));

        let ray = Ray::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 100.0);
        let hit = cast_ray(&circle, &tx, &ray).unwrap();

        assert!((hit.distance - 4.0).abs() < 1e-9);
        assert!(!hit.inside);
    }

    #[test]
    fn ray_misses_circle_off_axis() {
        let circle = Shape::circle(mat(), 1.0).unwrap();
        let tx = Transform::from_position(Vector2::new(5.0, 10.0));

        let ray = Ray::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 100.0);
        assert!(cast_ray(&circle, &tx, &ray).is_none());
    }

    #[test]
    fn ray_beyond_max_distance_does_not_hit() {
        let circle = Shape::circle(mat(), 1.0).unwrap();
        let tx = Transform::from_position(Vector2::new(50.0, 0.0));

        let ray = Ray::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 1.0);
        assert!(cast_ray(&circle, &tx, &ray).is_none());
    }

    #[test]
    fn ray_within_one_unit_hits_polygon_edge() {
        let square = Shape::rectangle(mat(), 2.0, 2.0).unwrap();
        let tx = Transform::from_position(Vector2::new(0.5, 0.0));

        let ray = Ray::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 10.0);
        let hit = cast_ray(&square, &tx, &ray);
        assert!(hit.is_some());
    }
}
