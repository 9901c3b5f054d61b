//! Narrow-phase collision detection: manifold generation and raycasts.
//!
//! [`narrow_phase`] classifies circle/circle, circle/polygon, and polygon/polygon
//! pairs via SAT and Voronoi-region tests. [`raycast`] answers ray queries against
//! a single shape. Both are grounded on the same feature-ID contact scheme so that
//! [`crate::world::World`] can warm-start its solver cache across steps.

pub mod narrow_phase;
pub mod raycast;

use arrayvec::ArrayVec;

use crate::math::Vector2;

/// A single contact point in a [`Collision`] manifold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Feature ID identifying which vertices/edges produced this point, stable
    /// across frames as long as the colliding features don't change.
    pub id: u32,
    /// World-space contact point.
    pub point: Vector2,
    /// Penetration depth along [`Collision::direction`]; positive means overlapping.
    pub depth: f64,
    /// Simulation timestamp this contact was last refreshed at, used to expire
    /// stale cache entries.
    pub timestamp: f64,
    /// Precomputed effective mass along the contact normal, filled in before the
    /// velocity solve runs.
    pub normal_mass: f64,
    /// Most recent per-iteration normal impulse magnitude.
    ///
    /// The solver recomputes this from scratch every iteration rather than
    /// accumulating it; the field exists so the *next frame's* cache
    /// reconciliation has a value to carry across matching feature IDs.
    pub normal_impulse: f64,
    /// Precomputed effective mass along the contact tangent.
    pub tangent_mass: f64,
    /// Most recent per-iteration tangent impulse magnitude, same caching role
    /// as [`Contact::normal_impulse`].
    pub tangent_impulse: f64,
}

impl Default for Contact {
    fn default() -> Self {
        Self {
            id: 0,
            point: Vector2::zero(),
            depth: 0.0,
            timestamp: 0.0,
            normal_mass: 0.0,
            normal_impulse: 0.0,
            tangent_mass: 0.0,
            tangent_impulse: 0.0,
        }
    }
}

/// A collision manifold between two shapes: a shared normal and up to two contacts.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    /// Combined Coulomb friction coefficient for the pair.
    pub friction: f64,
    /// Combined restitution coefficient for the pair.
    pub restitution: f64,
    /// Unit vector pointing from the first shape toward the second.
    pub direction: Vector2,
    /// Contact points, in world space; `len() == count`.
    pub contacts: ArrayVec<Contact, 2>,
}

impl Collision {
    fn empty() -> Self {
        Self {
            friction: 0.0,
            restitution: 0.0,
            direction: Vector2::zero(),
            contacts: ArrayVec::new(),
        }
    }

    /// Number of contact points in the manifold (0, 1, or 2).
    pub fn count(&self) -> usize {
        self.contacts.len()
    }
}

/// Pack a polygon-polygon contact's feature indices into a single comparable id.
///
/// Mirrors the reference bit layout: the flipped flag in bit 16, the reference
/// edge's first vertex index in bits 8-15, and the incident vertex index in
/// bits 0-7. Two contacts computed from the same physical vertex pair across
/// frames, even if the reference/incident roles were relabeled, produce the
/// same id.
pub fn pack_feature_id(ref_edge_flipped: bool, reference_index: u32, incident_index: u32) -> u32 {
    ((ref_edge_flipped as u32) << 16) | ((reference_index & 0xff) << 8) | (incident_index & 0xff)
}
