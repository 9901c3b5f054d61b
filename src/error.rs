//! Error types returned by fallible operations across the crate.

use thiserror::Error;

/// Errors produced by shape, body, and world operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// A circle radius, rectangle dimension, or timestep was not strictly positive.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Convex hull construction needs at least 3 non-collinear input points.
    #[error("need at least 3 points to build a convex hull, got {0}")]
    NotEnoughPoints(usize),
    /// A polygon would need more vertices than `GEOMETRY_MAX_VERTEX_COUNT` allows.
    #[error("polygon hull has {0} vertices, maximum is {1}")]
    TooManyVertices(usize, usize),
    /// The world's deferred add/remove queue has no free slots this step.
    #[error("pending body operation queue is full")]
    CapacityExhausted,
    /// A `BodyId` does not refer to a body currently stored in the world.
    #[error("body handle is stale or unknown")]
    InvalidBody,
}
