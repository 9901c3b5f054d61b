//! The simulation container: body registry, broad/narrow-phase orchestration,
//! the sequential-impulse solver, and deferred body mutation.

use std::collections::{HashMap, HashSet};

use slotmap::{Key, SlotMap};

use crate::{
    body::{Body, BodyId},
    broad_phase::SpatialHash,
    collision::{narrow_phase, raycast, Collision},
    config::WorldConfig,
    error::PhysicsError,
    math::{Vector2, AABB},
};

/// A collision-event callback: the ordered body pair and the manifold that
/// triggered it. Fired only for manifolds with at least one contact.
pub type CollisionHandler = fn(BodyId, BodyId, &Collision);

#[derive(Debug, Clone, Copy, Default)]
struct Handlers {
    pre_step: Option<CollisionHandler>,
    post_step: Option<CollisionHandler>,
}

/// A mutation queued by `add_body`/`remove_body`, applied once the current
/// step finishes so callbacks see a stable body set.
#[derive(Debug, Clone, Copy)]
enum Op {
    /// Body `BodyId` was inserted synchronously but should not participate
    /// in broad/narrow-phase until this op drains.
    Activate(BodyId),
    Remove(BodyId),
}

/// The simulation container: owns every body, the broad-phase spatial hash,
/// and the contact cache that feeds the constraint solver.
pub struct World {
    config: WorldConfig,
    bodies: SlotMap<BodyId, Body>,
    hash: SpatialHash,
    cache: HashMap<(BodyId, BodyId), Collision>,
    ops: crate::utils::RingBuffer<Op>,
    pending_add: HashSet<BodyId>,
    handlers: Handlers,
    accumulator: f64,
    timestamp: f64,
}

impl World {
    /// Create an empty world from `config`.
    pub fn new(config: WorldConfig) -> Self {
        let ops_capacity = config.pending_ops_capacity;

        Self {
            hash: SpatialHash::new(config.cell_size),
            config,
            bodies: SlotMap::with_key(),
            cache: HashMap::new(),
            ops: crate::utils::RingBuffer::new(ops_capacity),
            pending_add: HashSet::new(),
            handlers: Handlers::default(),
            accumulator: 0.0,
            timestamp: 0.0,
        }
    }

    /// Gravity acceleration applied to every dynamic body each step.
    pub fn gravity(&self) -> Vector2 {
        self.config.gravity
    }

    /// Set the gravity acceleration vector.
    pub fn set_gravity(&mut self, gravity: Vector2) {
        self.config.gravity = gravity;
    }

    /// Install pre-step and/or post-step collision callbacks.
    pub fn set_handlers(
        &mut self,
        pre_step: Option<CollisionHandler>,
        post_step: Option<CollisionHandler>,
    ) {
        self.handlers = Handlers { pre_step, post_step };
    }

    /// Number of bodies currently committed to the simulation (excludes
    /// bodies added this step whose activation hasn't drained yet).
    pub fn body_count(&self) -> usize {
        self.bodies.len() - self.pending_add.len()
    }

    /// Borrow a body by handle.
    pub fn get_body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    /// Mutably borrow a body by handle.
    pub fn get_body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    /// Whether `id` refers to a body currently stored in the world.
    pub fn is_body_in_world(&self, id: BodyId) -> bool {
        self.bodies.contains_key(id)
    }

    /// Add a body to the world, returning its handle immediately.
    ///
    /// The body is inserted synchronously so the handle is usable right
    /// away, but it does not participate in broad/narrow-phase collision
    /// until the current (or, if called outside a step, the next) step
    /// finishes draining its activation.
    pub fn add_body(&mut self, body: Body) -> Result<BodyId, PhysicsError> {
        let id = self.bodies.insert(body);

        if !self.ops.push(Op::Activate(id)) {
            self.bodies.remove(id);
            log::warn!("pending op queue full, rejecting add_body");
            return Err(PhysicsError::CapacityExhausted);
        }

        self.pending_add.insert(id);
        Ok(id)
    }

    /// Queue `id` for removal at the end of the current step.
    pub fn remove_body(&mut self, id: BodyId) -> Result<(), PhysicsError> {
        if !self.ops.push(Op::Remove(id)) {
            log::warn!("pending op queue full, rejecting remove_body");
            return Err(PhysicsError::CapacityExhausted);
        }

        Ok(())
    }

    fn active_ids(&self) -> Vec<BodyId> {
        self.bodies
            .keys()
            .filter(|id| !self.pending_add.contains(id))
            .collect()
    }

    /// Advance the simulation by exactly `dt` seconds.
    pub fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        if dt <= 0.0 {
            return Err(PhysicsError::InvalidArgument("dt must be > 0"));
        }

        log::trace!("stepping world: dt={dt}, bodies={}", self.body_count());

        self.rebuild_contacts();

        if let Some(pre_step) = self.handlers.pre_step {
            for (&(a, b), collision) in &self.cache {
                if collision.count() > 0 {
                    pre_step(a, b, collision);
                }
            }
        }

        let active = self.active_ids();

        for &id in &active {
            let gravity = self.config.gravity;
            let body = &mut self.bodies[id];
            body.apply_gravity(gravity);
            body.integrate_velocity(dt);
        }

        // Precompute per-contact effective mass for the solver. Does not
        // itself apply any impulse.
        let pairs: Vec<(BodyId, BodyId)> = self.cache.keys().copied().collect();
        for &(id1, id2) in &pairs {
            let Some(mut collision) = self.cache.get(&(id1, id2)).cloned() else {
                continue;
            };
            let (b1, b2) = (&self.bodies[id1], &self.bodies[id2]);
            compute_contact_masses(b1, b2, &mut collision);
            self.cache.insert((id1, id2), collision);
        }

        let inverse_dt = 1.0 / dt;
        for _ in 0..self.config.iteration_count {
            for &(id1, id2) in &pairs {
                let Some(mut collision) = self.cache.get(&(id1, id2)).cloned() else {
                    continue;
                };

                let (mut v1, mut w1, mut v2, mut w2) = {
                    let b1 = &self.bodies[id1];
                    let b2 = &self.bodies[id2];
                    (b1.velocity(), b1.angular_velocity(), b2.velocity(), b2.angular_velocity())
                };

                resolve_collision(
                    self.bodies[id1].inverse_mass(),
                    self.bodies[id1].inverse_inertia(),
                    self.bodies[id1].position(),
                    &mut v1,
                    &mut w1,
                    self.bodies[id2].inverse_mass(),
                    self.bodies[id2].inverse_inertia(),
                    self.bodies[id2].position(),
                    &mut v2,
                    &mut w2,
                    &mut collision,
                    inverse_dt,
                    &self.config,
                );

                self.bodies[id1].set_velocity(v1);
                self.bodies[id1].set_angular_velocity(w1);
                self.bodies[id2].set_velocity(v2);
                self.bodies[id2].set_angular_velocity(w2);

                self.cache.insert((id1, id2), collision);
            }
        }

        for &id in &active {
            self.bodies[id].integrate_position(dt);
        }

        if let Some(post_step) = self.handlers.post_step {
            for (&(a, b), collision) in &self.cache {
                if collision.count() > 0 {
                    post_step(a, b, collision);
                }
            }
        }

        self.drain_ops();

        for &id in &self.active_ids() {
            self.bodies[id].clear_forces();
        }

        self.hash.clear();
        self.timestamp += dt;

        Ok(())
    }

    /// Accumulator-driven stepping: pass the real time elapsed since the last
    /// call (measured however the host application likes) and the fixed
    /// timestep to simulate in; steps zero or more times by exactly `dt`,
    /// carrying over any leftover time to the next call.
    pub fn update(&mut self, elapsed: f64, dt: f64) -> Result<(), PhysicsError> {
        if dt <= 0.0 {
            return Err(PhysicsError::InvalidArgument("dt must be > 0"));
        }

        self.accumulator += elapsed.max(0.0);

        while self.accumulator >= dt {
            self.step(dt)?;
            self.accumulator -= dt;
        }

        Ok(())
    }

    /// Cast `ray` against every body in the world, calling `f` once per hit
    /// body in broad-phase candidate order (not sorted by distance).
    pub fn cast_ray<F: FnMut(BodyId, raycast::RayHit)>(&mut self, ray: raycast::Ray, mut f: F) {
        self.hash.clear();

        let active = self.active_ids();
        for &id in &active {
            self.hash.insert(self.bodies[id].aabb(), id);
        }

        let max_vertex = ray.origin + ray.direction * ray.max_distance;
        let query_aabb = AABB::from_points(&[ray.origin, max_vertex]);

        let candidates = self.hash.query(query_aabb).to_vec();
        for id in candidates {
            let Some(body) = self.bodies.get(id) else { continue };
            let Some(shape) = body.shape() else { continue };

            if let Some(hit) = raycast::cast_ray(shape, &body.transform(), &ray) {
                f(id, hit);
            }
        }

        self.hash.clear();
    }

    /// Broad-phase insert + narrow-phase query, rebuilding the contact cache
    /// from scratch. A pair absent this step (separated, or no longer a
    /// broad-phase candidate at all) is simply not carried into the new
    /// cache, which is equivalent to the reference implementation's explicit
    /// staleness sweep within at most one step.
    fn rebuild_contacts(&mut self) {
        self.hash.clear();

        let active = self.active_ids();
        for &id in &active {
            self.hash.insert(self.bodies[id].aabb(), id);
        }

        let mut new_cache: HashMap<(BodyId, BodyId), Collision> = HashMap::new();

        for &id in &active {
            let aabb = self.bodies[id].aabb();
            let candidates = self.hash.query(aabb).to_vec();

            for candidate in candidates {
                if candidate == id {
                    continue;
                }

                let (first, second) = order_pair(id, candidate);
                if first != id {
                    // The pair is handled once, when iterating its lower-keyed body.
                    continue;
                }
                if new_cache.contains_key(&(first, second)) {
                    continue;
                }

                let b1 = &self.bodies[first];
                let b2 = &self.bodies[second];

                if b1.inverse_mass() + b2.inverse_mass() <= 0.0 {
                    continue;
                }

                let (Some(s1), Some(s2)) = (b1.shape(), b2.shape()) else {
                    continue;
                };

                let Some(mut collision) =
                    narrow_phase::compute_collision(s1, &b1.transform(), s2, &b2.transform())
                else {
                    continue;
                };

                for contact in collision.contacts.iter_mut() {
                    contact.timestamp = self.timestamp;
                }

                if let Some(old) = self.cache.get(&(first, second)) {
                    collision.friction = old.friction;
                    collision.restitution = old.restitution;

                    for contact in collision.contacts.iter_mut() {
                        if let Some(old_contact) =
                            old.contacts.iter().find(|c| c.id == contact.id)
                        {
                            contact.normal_impulse = old_contact.normal_impulse;
                            contact.tangent_impulse = old_contact.tangent_impulse;
                        }
                    }
                } else {
                    let (m1, m2) = (s1.material(), s2.material());
                    collision.friction = (0.5 * (m1.friction + m2.friction)).max(0.0);
                    collision.restitution = m1.restitution.min(m2.restitution).max(0.0);
                }

                new_cache.insert((first, second), collision);
            }
        }

        self.cache = new_cache;
    }

    fn drain_ops(&mut self) {
        while let Some(op) = self.ops.pop() {
            match op {
                Op::Activate(id) => {
                    self.pending_add.remove(&id);
                }
                Op::Remove(id) => {
                    self.bodies.remove(id);
                    self.pending_add.remove(&id);
                    self.cache.retain(|&(a, b), _| a != id && b != id);
                }
            }
        }
    }
}

/// Order a body pair by slot-map key, a stable total order standing in for
/// the reference implementation's pointer comparison.
fn order_pair(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a.data().as_ffi() <= b.data().as_ffi() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Precompute the effective mass along the contact normal and tangent for
/// every contact in `collision`. Run once per step before the solver
/// iterates; does not itself apply any impulse.
fn compute_contact_masses(b1: &Body, b2: &Body, collision: &mut Collision) {
    if b1.inverse_mass() + b2.inverse_mass() <= 0.0 {
        return;
    }

    let tangent = Vector2::new(collision.direction.y, -collision.direction.x);

    for contact in collision.contacts.iter_mut() {
        let rel1 = contact.point - b1.position();
        let rel2 = contact.point - b2.position();

        let cross1 = crate::math::cross(rel1, collision.direction);
        let cross2 = crate::math::cross(rel2, collision.direction);

        let normal_mass = (b1.inverse_mass() + b2.inverse_mass())
            + b1.inverse_inertia() * cross1 * cross1
            + b2.inverse_inertia() * cross2 * cross2;
        contact.normal_mass = if normal_mass > 0.0 { 1.0 / normal_mass } else { 0.0 };

        let cross1 = crate::math::cross(rel1, tangent);
        let cross2 = crate::math::cross(rel2, tangent);

        let tangent_mass = (b1.inverse_mass() + b2.inverse_mass())
            + b1.inverse_inertia() * cross1 * cross1
            + b2.inverse_inertia() * cross2 * cross2;
        contact.tangent_mass = if tangent_mass > 0.0 { 1.0 / tangent_mass } else { 0.0 };
    }
}

/// One sequential-impulse pass over every contact in `collision`: recomputes
/// each contact's normal and tangent impulse from the *current* relative
/// velocity (not an incremental update against a running sum) and applies it
/// immediately to the velocity/angular-velocity copies passed in. The cached
/// `normal_impulse`/`tangent_impulse` fields are overwritten purely so next
/// step's cache reconciliation has a warm-start value to carry across
/// matching feature ids.
#[allow(clippy::too_many_arguments)]
fn resolve_collision(
    inverse_mass1: f64,
    inverse_inertia1: f64,
    position1: Vector2,
    velocity1: &mut Vector2,
    angular_velocity1: &mut f64,
    inverse_mass2: f64,
    inverse_inertia2: f64,
    position2: Vector2,
    velocity2: &mut Vector2,
    angular_velocity2: &mut f64,
    collision: &mut Collision,
    inverse_dt: f64,
    config: &WorldConfig,
) {
    if inverse_mass1 + inverse_mass2 <= 0.0 || inverse_dt <= 0.0 {
        return;
    }

    let tangent = Vector2::new(collision.direction.y, -collision.direction.x);

    let apply_impulse = |point: Vector2,
                          impulse: Vector2,
                          inverse_mass: f64,
                          inverse_inertia: f64,
                          velocity: &mut Vector2,
                          angular_velocity: &mut f64| {
        if inverse_mass <= 0.0 {
            return;
        }
        *velocity += impulse * inverse_mass;
        *angular_velocity += inverse_inertia * crate::math::cross(point, impulse);
    };

    for contact in collision.contacts.iter_mut() {
        let rel1 = contact.point - position1;
        let rel2 = contact.point - position2;

        let rel_normal1 = crate::math::left_normal_vec(rel1);
        let rel_normal2 = crate::math::left_normal_vec(rel2);

        let relative_velocity = |v1: Vector2, w1: f64, v2: Vector2, w2: f64| {
            (v2 + rel_normal2 * w2) - (v1 + rel_normal1 * w1)
        };

        let rel_velocity =
            relative_velocity(*velocity1, *angular_velocity1, *velocity2, *angular_velocity2);
        let rel_velocity_dot = rel_velocity.dot(collision.direction);

        let restitution = if -rel_velocity_dot < config.restitution_velocity_threshold {
            0.0
        } else {
            collision.restitution
        };

        let bias_scalar = -(config.baumgarte_factor * inverse_dt)
            * (config.baumgarte_slop - contact.depth).min(0.0);

        let mut normal_scalar =
            ((-(1.0 + restitution) * rel_velocity_dot) + bias_scalar) * contact.normal_mass;
        if normal_scalar < 0.0 {
            normal_scalar = 0.0;
        }
        contact.normal_impulse = normal_scalar;

        let normal_impulse = collision.direction * normal_scalar;
        apply_impulse(rel1, -normal_impulse, inverse_mass1, inverse_inertia1, velocity1, angular_velocity1);
        apply_impulse(rel2, normal_impulse, inverse_mass2, inverse_inertia2, velocity2, angular_velocity2);

        let rel_velocity =
            relative_velocity(*velocity1, *angular_velocity1, *velocity2, *angular_velocity2);
        let mut tangent_scalar = -rel_velocity.dot(tangent) * contact.tangent_mass;

        let max_tangent_scalar = (collision.friction * normal_scalar).abs();
        tangent_scalar = tangent_scalar.clamp(-max_tangent_scalar, max_tangent_scalar);
        contact.tangent_impulse = tangent_scalar;

        let tangent_impulse = tangent * tangent_scalar;
        apply_impulse(rel1, -tangent_impulse, inverse_mass1, inverse_inertia1, velocity1, angular_velocity1);
        apply_impulse(rel2, tangent_impulse, inverse_mass2, inverse_inertia2, velocity2, angular_velocity2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyType;
    use crate::shape::{Material, Shape};
    use std::sync::Arc;

    fn circle_body(body_type: BodyType, position: Vector2) -> Body {
        let shape = Arc::new(Shape::circle(Material::default(), 1.0).unwrap());
        Body::with_shape(body_type, position, shape)
    }

    #[test]
    fn gravity_pulls_dynamic_body_down() {
        let mut world = World::new(WorldConfig::default());
        let id = world
            .add_body(circle_body(BodyType::Dynamic, Vector2::new(0.0, 0.0)))
            .unwrap();

        world.step(1.0 / 60.0).unwrap();

        assert!(world.get_body(id).unwrap().velocity().y > 0.0);
    }

    #[test]
    fn circle_rests_on_static_ground() {
        let mut world = World::new(WorldConfig::default());

        let ground_shape = Arc::new(Shape::rectangle(Material::default(), 20.0, 1.0).unwrap());
        world
            .add_body(Body::with_shape(
                BodyType::Static,
                Vector2::new(0.0, 1.5),
                ground_shape,
            ))
            .unwrap();

        let ball = world
            .add_body(circle_body(BodyType::Dynamic, Vector2::new(0.0, 0.0)))
            .unwrap();

        for _ in 0..240 {
            world.step(1.0 / 60.0).unwrap();
        }

        let position = world.get_body(ball).unwrap().position();
        assert!(position.y < 1.1, "ball should rest above the ground, y={}", position.y);
        assert!(position.y > 0.0);
    }

    #[test]
    fn add_body_is_not_visible_to_collision_until_next_step() {
        let mut world = World::new(WorldConfig::default());

        world
            .add_body(circle_body(BodyType::Dynamic, Vector2::new(0.0, 0.0)))
            .unwrap();
        let second = world
            .add_body(circle_body(BodyType::Dynamic, Vector2::new(0.5, 0.0)))
            .unwrap();

        assert!(world.pending_add.contains(&second));
        world.step(1.0 / 60.0).unwrap();
        assert!(!world.pending_add.contains(&second));
    }

    #[test]
    fn remove_body_is_deferred_to_step_end() {
        let mut world = World::new(WorldConfig::default());
        let id = world
            .add_body(circle_body(BodyType::Dynamic, Vector2::new(0.0, 0.0)))
            .unwrap();
        world.step(1.0 / 60.0).unwrap();

        world.remove_body(id).unwrap();
        assert!(world.is_body_in_world(id));

        world.step(1.0 / 60.0).unwrap();
        assert!(!world.is_body_in_world(id));
    }

    #[test]
    fn cast_ray_hits_a_body_in_its_path() {
        let mut world = World::new(WorldConfig::default());
        world
            .add_body(circle_body(BodyType::Dynamic, Vector2::new(5.0, 0.0)))
            .unwrap();
        world.step(1.0 / 60.0).unwrap();

        let mut hits = 0;
        world.cast_ray(
            raycast::Ray::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 100.0),
            |_, _| hits += 1,
        );

        assert_eq!(hits, 1);
    }

    #[test]
    fn step_rejects_non_positive_dt() {
        let mut world = World::new(WorldConfig::default());
        assert!(world.step(0.0).is_err());
        assert!(world.step(-1.0).is_err());
    }
}
