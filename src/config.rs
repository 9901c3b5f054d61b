//! Tunable constants, with compile-time defaults that can be overridden at runtime
//! via a deserializable [`WorldConfig`].

use serde::Deserialize;

use crate::math::Vector2;

/// Maximum number of vertices a polygon's convex hull may have.
pub const GEOMETRY_MAX_VERTEX_COUNT: usize = 8;

/// Pixels per world unit used by pixel/unit conversions in [`crate::math`].
///
/// Conversions become the identity when this is set to a non-positive value.
pub const GEOMETRY_PIXELS_PER_UNIT: f64 = 32.0;

/// Baumgarte positional-bias factor applied to penetration depth in the velocity solve.
pub const WORLD_BAUMGARTE_FACTOR: f64 = 0.2;

/// Penetration depth, in units, below which the Baumgarte bias does nothing.
pub const WORLD_BAUMGARTE_SLOP: f64 = 0.01;

/// Default gravity vector, `(0, 9.8)` with +y pointing down.
pub const WORLD_DEFAULT_GRAVITY: Vector2 = Vector2::new(0.0, 9.8);

/// Number of sequential-impulse solver iterations run per step.
pub const WORLD_ITERATION_COUNT: u32 = 12;

/// Soft cap used to size scratch buffers (the pending-ops ring buffer, the
/// broad-phase dedup bit array); the world itself has no hard body limit.
pub const WORLD_MAX_OBJECT_COUNT: usize = 2048;

/// Relative approach velocity, in units/s, below which restitution is forced to zero
/// (see the design notes on resting-contact jitter).
pub const WORLD_RESTITUTION_VELOCITY_THRESHOLD: f64 = 0.5;

/// Runtime-overridable tunables, loadable from a host application's own config layer.
///
/// Defaults match the compile-time constants in this module.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravity applied to every dynamic body each step.
    pub gravity: Vector2,
    /// Cell size used by the broad-phase spatial hash.
    pub cell_size: f64,
    /// Sequential-impulse solver iteration count.
    pub iteration_count: u32,
    /// Baumgarte positional-bias factor.
    pub baumgarte_factor: f64,
    /// Penetration slop below which the Baumgarte bias is inactive.
    pub baumgarte_slop: f64,
    /// Relative velocity threshold below which restitution is suppressed.
    pub restitution_velocity_threshold: f64,
    /// Capacity of the deferred add/remove ring buffer, rounded up to a power of two.
    pub pending_ops_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: WORLD_DEFAULT_GRAVITY,
            cell_size: 4.0,
            iteration_count: WORLD_ITERATION_COUNT,
            baumgarte_factor: WORLD_BAUMGARTE_FACTOR,
            baumgarte_slop: WORLD_BAUMGARTE_SLOP,
            restitution_velocity_threshold: WORLD_RESTITUTION_VELOCITY_THRESHOLD,
            pending_ops_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_constants() {
        let config = WorldConfig::default();
        assert_eq!(config.gravity, WORLD_DEFAULT_GRAVITY);
        assert_eq!(config.iteration_count, WORLD_ITERATION_COUNT);
        assert_eq!(config.baumgarte_factor, WORLD_BAUMGARTE_FACTOR);
        assert_eq!(config.baumgarte_slop, WORLD_BAUMGARTE_SLOP);
    }

    #[test]
    fn serde_default_fills_missing_fields() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(default)]
            world: WorldConfig,
        }

        // Only `iteration_count` is present; every other field must fall back
        // to `WorldConfig::default()` via `#[serde(default)]` on the struct.
        let wrapper: Wrapper =
            serde_json::from_str(r#"{"world": {"iteration_count": 20}}"#).unwrap();

        assert_eq!(wrapper.world.iteration_count, 20);
        assert_eq!(wrapper.world.baumgarte_factor, WORLD_BAUMGARTE_FACTOR);
        assert_eq!(wrapper.world.gravity, WORLD_DEFAULT_GRAVITY);
    }
}
