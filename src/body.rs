//! Rigid bodies: type, mass properties, transform, and force/impulse accumulation.

use std::sync::Arc;

use slotmap::new_key_type;

use crate::{
    math::{cross, cross_scalar_vector, left_normal, Transform, Vector2},
    shape::Shape,
};

new_key_type! {
    /// A stable handle to a body stored in a [`crate::world::World`].
    ///
    /// Remains valid across additions and removals of other bodies; using a
    /// handle after its body has been removed is caught by the slot map's
    /// generation check rather than aliasing a reused slot.
    pub struct BodyId;
}

/// The motion role a body plays in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Never moves and is never moved by the solver; infinite mass and inertia.
    Static,
    /// Moves under its own set velocity but is unaffected by forces or collisions.
    Kinematic,
    /// Affected by gravity, forces, and collision response.
    Dynamic,
}

/// Property flags that override a dynamic body's computed mass or inertia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyFlags {
    /// Treat the body as having infinite mass even though it has a shape.
    pub infinite_mass: bool,
    /// Treat the body as having infinite rotational inertia.
    pub infinite_inertia: bool,
}

/// Mass, velocity, and force/torque accumulators for a single step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Motion {
    /// Mass; `0` for static bodies or bodies with [`BodyFlags::infinite_mass`].
    pub mass: f64,
    /// `1 / mass`, or `0` when mass is zero (treated as infinite).
    pub inverse_mass: f64,
    /// Moment of inertia about the body's local origin.
    pub inertia: f64,
    /// `1 / inertia`, or `0` when inertia is zero (treated as infinite).
    pub inverse_inertia: f64,
    /// Multiplier applied to gravity for this body; `1.0` is normal weight.
    pub gravity_scale: f64,
    /// Linear velocity.
    pub velocity: Vector2,
    /// Angular velocity, in radians/s.
    pub angular_velocity: f64,
    /// Accumulated force for the current step, cleared after integration.
    pub force: Vector2,
    /// Accumulated torque for the current step, cleared after integration.
    pub torque: f64,
}

/// A rigid body: a transform, optional shape, and motion state.
#[derive(Debug, Clone)]
pub struct Body {
    body_type: BodyType,
    flags: BodyFlags,
    shape: Option<Arc<Shape>>,
    transform: Transform,
    motion: Motion,
    aabb: crate::math::AABB,
    user_data: u64,
}

impl Body {
    /// Create a body with no shape attached.
    pub fn new(body_type: BodyType, position: Vector2) -> Self {
        Self {
            body_type,
            flags: BodyFlags::default(),
            shape: None,
            transform: Transform::from_position(position),
            motion: Motion {
                gravity_scale: 1.0,
                ..Motion::default()
            },
            aabb: crate::math::AABB::new(position, vek::Extent2::zero()),
            user_data: 0,
        }
    }

    /// Create a body at `position` with `shape` attached.
    pub fn with_shape(body_type: BodyType, position: Vector2, shape: Arc<Shape>) -> Self {
        let mut body = Self::new(body_type, position);
        body.set_shape(Some(shape));
        body
    }

    /// The body's motion role.
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Set the body's motion role, recomputing mass and inertia.
    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
        self.recompute_mass();
    }

    /// Current property flags.
    pub fn flags(&self) -> BodyFlags {
        self.flags
    }

    /// Set property flags, recomputing mass and inertia.
    pub fn set_flags(&mut self, flags: BodyFlags) {
        self.flags = flags;
        self.recompute_mass();
    }

    /// The attached shape, if any.
    pub fn shape(&self) -> Option<&Arc<Shape>> {
        self.shape.as_ref()
    }

    /// Attach (or detach, with `None`) a collision shape, refreshing the AABB and mass.
    pub fn set_shape(&mut self, shape: Option<Arc<Shape>>) {
        self.shape = shape;
        self.refresh_aabb();
        self.recompute_mass();
    }

    /// Current transform (position, angle, cached rotation).
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// World-space position.
    pub fn position(&self) -> Vector2 {
        self.transform.position
    }

    /// Orientation, in radians, normalized to `[0, 2π)`.
    pub fn angle(&self) -> f64 {
        self.transform.angle
    }

    /// Set the position, refreshing the cached AABB.
    pub fn set_position(&mut self, position: Vector2) {
        self.transform.position = position;
        self.refresh_aabb();
    }

    /// Set the angle in radians, refreshing the rotation cache and AABB.
    pub fn set_angle(&mut self, angle: f64) {
        self.transform.set_angle(angle);
        self.refresh_aabb();
    }

    /// Mass; `0.0` means infinite (static body or `infinite_mass` flag).
    pub fn mass(&self) -> f64 {
        self.motion.mass
    }

    /// `1 / mass`, already `0.0` for infinite mass.
    pub fn inverse_mass(&self) -> f64 {
        self.motion.inverse_mass
    }

    /// Moment of inertia; `0.0` means infinite.
    pub fn inertia(&self) -> f64 {
        self.motion.inertia
    }

    /// `1 / inertia`, already `0.0` for infinite inertia.
    pub fn inverse_inertia(&self) -> f64 {
        self.motion.inverse_inertia
    }

    /// Gravity multiplier applied to this body.
    pub fn gravity_scale(&self) -> f64 {
        self.motion.gravity_scale
    }

    /// Set the gravity multiplier.
    pub fn set_gravity_scale(&mut self, scale: f64) {
        self.motion.gravity_scale = scale;
    }

    /// Linear velocity.
    pub fn velocity(&self) -> Vector2 {
        self.motion.velocity
    }

    /// Set the linear velocity directly.
    pub fn set_velocity(&mut self, velocity: Vector2) {
        self.motion.velocity = velocity;
    }

    /// Angular velocity, in radians/s.
    pub fn angular_velocity(&self) -> f64 {
        self.motion.angular_velocity
    }

    /// Set the angular velocity directly.
    pub fn set_angular_velocity(&mut self, angular_velocity: f64) {
        self.motion.angular_velocity = angular_velocity;
    }

    /// Current world-space AABB; a degenerate point box when no shape is attached.
    pub fn aabb(&self) -> crate::math::AABB {
        self.aabb
    }

    /// Opaque caller-assigned identifier, not otherwise interpreted by the crate.
    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    /// Set the caller-assigned identifier.
    pub fn set_user_data(&mut self, user_data: u64) {
        self.user_data = user_data;
    }

    /// Whether `point`, in world space, lies inside this body's shape.
    pub fn contains_point(&self, point: Vector2) -> bool {
        let Some(shape) = &self.shape else {
            return false;
        };

        match shape.as_ref() {
            Shape::Circle { radius, .. } => {
                (point - self.transform.position).magnitude_squared() <= radius * radius
            }
            Shape::Polygon { .. } => {
                let local = self.transform.inverse_transform_point(point);
                polygon_contains_local_point(shape, local)
            }
        }
    }

    /// Zero the per-step force and torque accumulators.
    pub fn clear_forces(&mut self) {
        self.motion.force = Vector2::zero();
        self.motion.torque = 0.0;
    }

    /// Apply `force` at `point` (world space), accumulating linear force and torque.
    pub fn apply_force(&mut self, point: Vector2, force: Vector2) {
        if self.motion.inverse_mass <= 0.0 {
            return;
        }

        self.motion.force += force;
        self.motion.torque += cross(point, force);
    }

    /// Apply a gravity force scaled by this body's mass and gravity scale.
    pub fn apply_gravity(&mut self, gravity: Vector2) {
        if self.motion.mass <= 0.0 {
            return;
        }

        self.motion.force += gravity * (self.motion.gravity_scale * self.motion.mass);
    }

    /// Apply an instantaneous `impulse` at `point` (world space).
    pub fn apply_impulse(&mut self, point: Vector2, impulse: Vector2) {
        if self.motion.inverse_mass <= 0.0 {
            return;
        }

        self.motion.velocity += impulse * self.motion.inverse_mass;
        self.motion.angular_velocity += self.motion.inverse_inertia * cross(point, impulse);
    }

    /// Integrate accumulated force/torque into velocity over `dt` (semi-implicit Euler).
    pub fn integrate_velocity(&mut self, dt: f64) {
        if self.motion.inverse_mass <= 0.0 || dt <= 0.0 {
            return;
        }

        self.motion.velocity += self.motion.force * (self.motion.inverse_mass * dt);
        self.motion.angular_velocity += self.motion.torque * self.motion.inverse_inertia * dt;
    }

    /// Integrate velocity into position/angle over `dt`. No-op for static bodies.
    pub fn integrate_position(&mut self, dt: f64) {
        if self.body_type == BodyType::Static || dt <= 0.0 {
            return;
        }

        self.transform.position += self.motion.velocity * dt;
        self.set_angle(self.transform.angle + self.motion.angular_velocity * dt);
    }

    /// Recompute `relative position -> torque arm` helper used by the solver:
    /// the left-normal of the vector from this body's center to `point`.
    pub fn relative_normal(&self, point: Vector2) -> Vector2 {
        left_normal(Vector2::zero(), point - self.transform.position)
    }

    /// Velocity of the material point at `point` (world space), including spin.
    pub fn point_velocity(&self, point: Vector2) -> Vector2 {
        let relative = point - self.transform.position;
        self.motion.velocity + cross_scalar_vector(self.motion.angular_velocity, relative)
    }

    fn refresh_aabb(&mut self) {
        self.aabb = match &self.shape {
            Some(shape) => shape.aabb(&self.transform),
            None => crate::math::AABB::new(self.transform.position, vek::Extent2::zero()),
        };
    }

    fn recompute_mass(&mut self) {
        self.motion.mass = 0.0;
        self.motion.inverse_mass = 0.0;
        self.motion.inertia = 0.0;
        self.motion.inverse_inertia = 0.0;

        match self.body_type {
            BodyType::Static => {
                self.motion.velocity = Vector2::zero();
                self.motion.angular_velocity = 0.0;
            }
            BodyType::Dynamic => {
                let Some(shape) = &self.shape else {
                    return;
                };

                if !self.flags.infinite_mass {
                    self.motion.mass = shape.mass();
                    if self.motion.mass > 0.0 {
                        self.motion.inverse_mass = 1.0 / self.motion.mass;
                    }
                }

                if !self.flags.infinite_inertia {
                    self.motion.inertia = shape.inertia();
                    if self.motion.inertia > 0.0 {
                        self.motion.inverse_inertia = 1.0 / self.motion.inertia;
                    }
                }
            }
            BodyType::Kinematic => {}
        }
    }
}

/// Parity-based point-in-polygon test, grounded on the raycast `inside` flag:
/// a `+x` ray from `local` crosses the hull an odd number of times iff inside.
fn polygon_contains_local_point(shape: &Shape, local: Vector2) -> bool {
    let vertices = shape.vertices();
    if vertices.len() < 3 {
        return false;
    }

    let mut crossings = 0;
    let n = vertices.len();
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];

        let straddles = (a.y > local.y) != (b.y > local.y);
        if straddles {
            let x_at_y = a.x + (local.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if x_at_y > local.x {
                crossings += 1;
            }
        }
    }

    crossings % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Material;

    fn unit_circle() -> Arc<Shape> {
        Arc::new(Shape::circle(Material::default(), 1.0).unwrap())
    }

    fn unit_square() -> Arc<Shape> {
        Arc::new(Shape::rectangle(Material::default(), 2.0, 2.0).unwrap())
    }

    #[test]
    fn static_body_has_no_mass_regardless_of_shape() {
        let body = Body::with_shape(BodyType::Static, Vector2::zero(), unit_circle());
        assert_eq!(body.mass(), 0.0);
        assert_eq!(body.inverse_mass(), 0.0);
    }

    #[test]
    fn dynamic_body_computes_mass_from_shape() {
        let body = Body::with_shape(BodyType::Dynamic, Vector2::zero(), unit_circle());
        assert!(body.mass() > 0.0);
        assert!((body.inverse_mass() - 1.0 / body.mass()).abs() < 1e-9);
    }

    #[test]
    fn infinite_mass_flag_zeroes_inverse_mass() {
        let mut body = Body::with_shape(BodyType::Dynamic, Vector2::zero(), unit_circle());
        body.set_flags(BodyFlags {
            infinite_mass: true,
            infinite_inertia: false,
        });

        assert_eq!(body.mass(), 0.0);
        assert_eq!(body.inverse_mass(), 0.0);
        assert!(body.inertia() > 0.0);
    }

    #[test]
    fn apply_impulse_changes_velocity_and_spin() {
        let mut body = Body::with_shape(BodyType::Dynamic, Vector2::zero(), unit_circle());
        body.apply_impulse(Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0));

        assert!(body.velocity().y > 0.0);
        assert!(body.angular_velocity().abs() > 0.0);
    }

    #[test]
    fn static_body_ignores_impulse() {
        let mut body = Body::with_shape(BodyType::Static, Vector2::zero(), unit_circle());
        body.apply_impulse(Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0));

        assert_eq!(body.velocity(), Vector2::zero());
    }

    #[test]
    fn integrate_position_ignores_static_bodies() {
        let mut body = Body::with_shape(BodyType::Static, Vector2::zero(), unit_circle());
        body.set_velocity(Vector2::new(5.0, 0.0));
        body.integrate_position(1.0);

        assert_eq!(body.position(), Vector2::zero());
    }

    #[test]
    fn contains_point_circle() {
        let body = Body::with_shape(BodyType::Dynamic, Vector2::new(2.0, 2.0), unit_circle());
        assert!(body.contains_point(Vector2::new(2.5, 2.0)));
        assert!(!body.contains_point(Vector2::new(4.0, 4.0)));
    }

    #[test]
    fn contains_point_polygon() {
        let body = Body::with_shape(BodyType::Dynamic, Vector2::new(0.0, 0.0), unit_square());
        assert!(body.contains_point(Vector2::new(0.5, 0.5)));
        assert!(!body.contains_point(Vector2::new(5.0, 5.0)));
    }

    #[test]
    fn set_shape_refreshes_aabb() {
        let mut body = Body::new(BodyType::Dynamic, Vector2::zero());
        assert_eq!(body.aabb().extent.w, 0.0);

        body.set_shape(Some(unit_circle()));
        assert!(body.aabb().extent.w > 0.0);
    }
}
