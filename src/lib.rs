//! A 2D rigid-body physics engine: circles and convex polygons under gravity,
//! resolved with a sequential-impulse solver and queried with point and ray casts.
//!
//! The simulation is advanced one fixed timestep at a time through [`World::step`].
//! Broad-phase candidate pairs come from a uniform [`SpatialHash`](broad_phase::SpatialHash);
//! narrow-phase detection and manifold generation live in [`collision`]; the solver
//! and body bookkeeping live in [`world`].

pub mod body;
pub mod broad_phase;
pub mod collision;
pub mod config;
pub mod error;
pub mod math;
pub mod shape;
pub mod utils;
pub mod world;

pub use body::{Body, BodyFlags, BodyId, BodyType};
pub use broad_phase::SpatialHash;
pub use collision::{
    raycast::{Ray, RayHit},
    Collision, Contact,
};
pub use config::WorldConfig;
pub use error::PhysicsError;
pub use math::{Transform, Vector2, AABB};
pub use shape::{Material, Shape};
pub use world::World;
