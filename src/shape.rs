//! Circle and convex polygon collision shapes: construction, mass properties, AABB.

use arrayvec::ArrayVec;

use crate::{
    config::GEOMETRY_MAX_VERTEX_COUNT,
    error::PhysicsError,
    math::{cross, left_normal, orientation, Transform, Vector2, AABB},
};

/// Density, friction, and restitution coefficients shared by every shape.
///
/// All three are expected to be non-negative; the crate does not validate
/// this beyond debug assertions since a negative material is a caller bug,
/// not a recoverable runtime condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Mass per unit area.
    pub density: f64,
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Coefficient of restitution (bounciness), `0` = fully inelastic.
    pub restitution: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.3,
            restitution: 0.0,
        }
    }
}

/// Fixed-capacity storage for a convex polygon's vertices or normals.
pub type VertexList = ArrayVec<Vector2, GEOMETRY_MAX_VERTEX_COUNT>;

/// A circle or convex polygon collision shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A circle of the given radius, centered on the owning body's transform.
    Circle {
        /// Material properties.
        material: Material,
        /// Cached area, `π r²`.
        area: f64,
        /// Radius, always `> 0`.
        radius: f64,
    },
    /// A convex polygon in counter-clockwise winding order.
    Polygon {
        /// Material properties.
        material: Material,
        /// Cached area (shoelace formula).
        area: f64,
        /// Vertices in local space, counter-clockwise, `|vertices| <= GEOMETRY_MAX_VERTEX_COUNT`.
        vertices: VertexList,
        /// Outward unit left-normal of edge `(vertices[i-1], vertices[i])`.
        normals: VertexList,
    },
}

impl Shape {
    /// Create a circle shape.
    pub fn circle(material: Material, radius: f64) -> Result<Self, PhysicsError> {
        if radius <= 0.0 {
            return Err(PhysicsError::InvalidArgument("circle radius must be > 0"));
        }

        Ok(Self::Circle {
            material,
            radius,
            area: std::f64::consts::PI * radius * radius,
        })
    }

    /// Create an axis-aligned rectangle shape centered on the origin.
    pub fn rectangle(material: Material, width: f64, height: f64) -> Result<Self, PhysicsError> {
        if width <= 0.0 || height <= 0.0 {
            return Err(PhysicsError::InvalidArgument(
                "rectangle width and height must be > 0",
            ));
        }

        let (hw, hh) = (width * 0.5, height * 0.5);
        let corners = [
            Vector2::new(-hw, -hh),
            Vector2::new(-hw, hh),
            Vector2::new(hw, hh),
            Vector2::new(hw, -hh),
        ];

        Self::polygon(material, &corners)
    }

    /// Create a convex polygon shape from an input point set via gift wrapping.
    ///
    /// The input need not already be a convex hull or ordered in any particular way.
    pub fn polygon(material: Material, points: &[Vector2]) -> Result<Self, PhysicsError> {
        let hull = jarvis_march(points)?;

        if hull.len() > GEOMETRY_MAX_VERTEX_COUNT {
            return Err(PhysicsError::TooManyVertices(
                hull.len(),
                GEOMETRY_MAX_VERTEX_COUNT,
            ));
        }

        let mut vertices = VertexList::new();
        vertices.extend(hull.iter().copied());

        let mut normals = VertexList::new();
        for i in 0..vertices.len() {
            let j = if i == 0 { vertices.len() - 1 } else { i - 1 };
            normals.push(left_normal(vertices[j], vertices[i]));
        }

        let area = polygon_area(&vertices);

        Ok(Self::Polygon {
            material,
            area,
            vertices,
            normals,
        })
    }

    /// Material properties of the shape.
    pub fn material(&self) -> Material {
        match self {
            Shape::Circle { material, .. } | Shape::Polygon { material, .. } => *material,
        }
    }

    /// Mutable access to the material properties, for density/friction/restitution setters.
    pub fn material_mut(&mut self) -> &mut Material {
        match self {
            Shape::Circle { material, .. } | Shape::Polygon { material, .. } => material,
        }
    }

    /// Cached area of the shape.
    pub fn area(&self) -> f64 {
        match self {
            Shape::Circle { area, .. } | Shape::Polygon { area, .. } => *area,
        }
    }

    /// Mass of the shape, `density * area`.
    pub fn mass(&self) -> f64 {
        self.material().density * self.area()
    }

    /// Moment of inertia about the shape's local origin.
    pub fn inertia(&self) -> f64 {
        if self.material().density <= 0.0 {
            return 0.0;
        }

        match self {
            Shape::Circle { radius, .. } => 0.5 * self.mass() * radius * radius,
            Shape::Polygon {
                vertices, material, ..
            } => {
                let mut numerator = 0.0;
                let mut denominator = 0.0;

                let n = vertices.len();
                for i in 0..n {
                    let j = if i == 0 { n - 1 } else { i - 1 };
                    let (v1, v2) = (vertices[j], vertices[i]);

                    let c = cross(v1, v2);
                    let dot_sum = v1.dot(v1) + v1.dot(v2) + v2.dot(v2);

                    numerator += c * dot_sum;
                    denominator += c;
                }

                material.density * (numerator / (6.0 * denominator))
            }
        }
    }

    /// World-space AABB of the shape under `transform`.
    pub fn aabb(&self, transform: &Transform) -> AABB {
        match self {
            Shape::Circle { radius, .. } => AABB::from_center_half_extents(
                transform.position,
                Vector2::new(*radius, *radius),
            ),
            Shape::Polygon { vertices, .. } => {
                let world: Vec<Vector2> = vertices
                    .iter()
                    .map(|v| transform.transform_point(*v))
                    .collect();

                AABB::from_points(&world)
            }
        }
    }

    /// Vertices in local space; empty for a circle.
    pub fn vertices(&self) -> &[Vector2] {
        match self {
            Shape::Circle { .. } => &[],
            Shape::Polygon { vertices, .. } => vertices,
        }
    }

    /// Outward edge normals in local space; empty for a circle.
    pub fn normals(&self) -> &[Vector2] {
        match self {
            Shape::Circle { .. } => &[],
            Shape::Polygon { normals, .. } => normals,
        }
    }

    /// Radius, if this is a circle.
    pub fn radius(&self) -> Option<f64> {
        match self {
            Shape::Circle { radius, .. } => Some(*radius),
            Shape::Polygon { .. } => None,
        }
    }

    /// A copy of this shape with a different radius, keeping its material.
    ///
    /// Only valid for circles; attach the result to a body with
    /// [`crate::Body::set_shape`] to refresh its mass and AABB.
    pub fn with_radius(&self, radius: f64) -> Result<Self, PhysicsError> {
        match self {
            Shape::Circle { material, .. } => Self::circle(*material, radius),
            Shape::Polygon { .. } => Err(PhysicsError::InvalidArgument(
                "with_radius only applies to circle shapes",
            )),
        }
    }

    /// A copy of this shape resized to the given rectangle dimensions,
    /// keeping its material.
    ///
    /// Only valid for polygons; the existing vertex set is discarded in
    /// favor of a fresh axis-aligned rectangle.
    pub fn with_rectangle(&self, width: f64, height: f64) -> Result<Self, PhysicsError> {
        match self {
            Shape::Polygon { material, .. } => Self::rectangle(*material, width, height),
            Shape::Circle { .. } => Err(PhysicsError::InvalidArgument(
                "with_rectangle only applies to polygon shapes",
            )),
        }
    }

    /// A copy of this shape built from a new vertex set, re-running the
    /// convex hull construction, keeping its material.
    ///
    /// Only valid for polygons.
    pub fn with_vertices(&self, points: &[Vector2]) -> Result<Self, PhysicsError> {
        match self {
            Shape::Polygon { material, .. } => Self::polygon(*material, points),
            Shape::Circle { .. } => Err(PhysicsError::InvalidArgument(
                "with_vertices only applies to polygon shapes",
            )),
        }
    }
}

/// Gift-wrapping (Jarvis march) convex hull construction.
///
/// Starts from the point of minimum x; at each step picks the candidate such
/// that every remaining point lies to the right of the directed line from the
/// current point to the candidate, breaking collinear ties by picking the
/// farther point.
fn jarvis_march(input: &[Vector2]) -> Result<Vec<Vector2>, PhysicsError> {
    if input.len() < 3 {
        return Err(PhysicsError::NotEnoughPoints(input.len()));
    }

    let mut lowest_index = 0;
    for (i, p) in input.iter().enumerate() {
        if p.x < input[lowest_index].x {
            lowest_index = i;
        }
    }

    let mut output = vec![input[lowest_index]];
    let mut current_index = lowest_index;

    loop {
        let mut next_index = (0..input.len()).find(|&i| i != current_index).unwrap();

        for i in 0..input.len() {
            if i == current_index || i == next_index {
                continue;
            }

            let direction = orientation(input[current_index], input[i], input[next_index]);

            if direction < 0 {
                continue;
            }

            let to_candidate = (input[i] - input[current_index]).magnitude_squared();
            let to_next = (input[next_index] - input[current_index]).magnitude_squared();

            if direction != 0 || to_candidate > to_next {
                next_index = i;
            }
        }

        if next_index == lowest_index {
            break;
        }

        current_index = next_index;
        output.push(input[next_index]);
    }

    Ok(output)
}

/// Shoelace-formula area, split into triangles fanning out from `vertices[0]`.
fn polygon_area(vertices: &[Vector2]) -> f64 {
    let mut twice_area_sum = 0.0;

    for i in 1..vertices.len().saturating_sub(1) {
        twice_area_sum += cross(vertices[i] - vertices[0], vertices[i + 1] - vertices[0]);
    }

    (0.5 * twice_area_sum).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat() -> Material {
        Material {
            density: 1.0,
            friction: 0.3,
            restitution: 0.0,
        }
    }

    #[test]
    fn circle_rejects_non_positive_radius() {
        assert!(Shape::circle(mat(), 0.0).is_err());
        assert!(Shape::circle(mat(), -1.0).is_err());
    }

    #[test]
    fn circle_area_and_inertia() {
        let shape = Shape::circle(mat(), 2.0).unwrap();
        assert!((shape.area() - std::f64::consts::PI * 4.0).abs() < 1e-9);
        assert!((shape.inertia() - 0.5 * shape.mass() * 4.0).abs() < 1e-9);
    }

    #[test]
    fn rectangle_is_ccw_with_matching_normal_count() {
        let shape = Shape::rectangle(mat(), 4.0, 2.0).unwrap();
        assert_eq!(shape.vertices().len(), 4);
        assert_eq!(shape.vertices().len(), shape.normals().len());
        assert!((shape.area() - 8.0).abs() < 1e-9);

        for normal in shape.normals() {
            assert!((normal.magnitude() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn polygon_hull_drops_interior_points() {
        // A square with an extra point in the middle, which must not survive the hull.
        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(4.0, 0.0),
            Vector2::new(4.0, 4.0),
            Vector2::new(0.0, 4.0),
            Vector2::new(2.0, 2.0),
        ];

        let shape = Shape::polygon(mat(), &points).unwrap();
        assert_eq!(shape.vertices().len(), 4);
        assert!((shape.area() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn polygon_construction_rejects_too_few_points() {
        let points = [Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)];
        assert!(Shape::polygon(mat(), &points).is_err());
    }

    #[test]
    fn convex_hull_is_idempotent() {
        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(4.0, 0.0),
            Vector2::new(4.0, 4.0),
            Vector2::new(0.0, 4.0),
        ];

        let hull = jarvis_march(&points).unwrap();
        let hull_again = jarvis_march(&hull).unwrap();

        assert_eq!(hull.len(), hull_again.len());
    }

    #[test]
    fn circle_aabb_is_centered_square() {
        let shape = Shape::circle(mat(), 1.5).unwrap();
        let transform = Transform::from_position(Vector2::new(2.0, 3.0));
        let aabb = shape.aabb(&transform);

        assert!((aabb.extent.w - 3.0).abs() < 1e-9);
        assert!((aabb.extent.h - 3.0).abs() < 1e-9);
        assert!((aabb.min.x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rectangle_normals_point_outward() {
        let shape = Shape::rectangle(mat(), 2.0, 2.0).unwrap();
        let vertices = shape.vertices();
        let centroid = vertices.iter().fold(Vector2::zero(), |acc, v| acc + *v)
            / vertices.len() as f64;

        let n = vertices.len();
        for i in 0..n {
            let j = if i == 0 { n - 1 } else { i - 1 };
            let midpoint = (vertices[i] + vertices[j]) * 0.5;
            assert!(
                shape.normals()[i].dot(midpoint - centroid) > 0.0,
                "normal {} should point away from the centroid",
                i
            );
        }
    }

    #[test]
    fn with_radius_keeps_material_and_changes_size() {
        let shape = Shape::circle(mat(), 1.0).unwrap();
        let resized = shape.with_radius(3.0).unwrap();

        assert_eq!(resized.radius(), Some(3.0));
        assert_eq!(resized.material(), shape.material());
        assert!(Shape::rectangle(mat(), 1.0, 1.0).unwrap().with_radius(2.0).is_err());
    }

    #[test]
    fn with_rectangle_keeps_material_and_changes_dimensions() {
        let shape = Shape::rectangle(mat(), 2.0, 2.0).unwrap();
        let resized = shape.with_rectangle(4.0, 1.0).unwrap();

        assert!((resized.area() - 4.0).abs() < 1e-9);
        assert_eq!(resized.material(), shape.material());
        assert!(Shape::circle(mat(), 1.0).unwrap().with_rectangle(1.0, 1.0).is_err());
    }

    #[test]
    fn with_vertices_rebuilds_the_hull() {
        let shape = Shape::rectangle(mat(), 2.0, 2.0).unwrap();

        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(4.0, 0.0),
            Vector2::new(4.0, 4.0),
            Vector2::new(0.0, 4.0),
            Vector2::new(2.0, 2.0),
        ];
        let resized = shape.with_vertices(&points).unwrap();

        assert_eq!(resized.vertices().len(), 4);
        assert!((resized.area() - 16.0).abs() < 1e-9);
        assert!(Shape::circle(mat(), 1.0).unwrap().with_vertices(&points).is_err());
    }
}
