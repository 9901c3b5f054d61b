//! SAT and Voronoi-region narrow-phase collision tests.
//!
//! `compute_collision` dispatches on the pair of shape kinds; the three
//! concrete tests below populate a [`Collision`] manifold with world-space
//! contact points, a shared separating direction, and feature ids used for
//! warm-start matching across steps.

use arrayvec::ArrayVec;

use crate::{
    collision::{pack_feature_id, Collision, Contact},
    math::{right_normal_vec, Transform, Vector2},
    shape::Shape,
};

/// Check whether `s1` (at `tx1`) and `s2` (at `tx2`) overlap, and if so build
/// their contact manifold.
pub fn compute_collision(
    s1: &Shape,
    tx1: &Transform,
    s2: &Shape,
    tx2: &Transform,
) -> Option<Collision> {
    match (s1, s2) {
        (Shape::Circle { radius: r1, .. }, Shape::Circle { radius: r2, .. }) => {
            collide_circles(*r1, tx1, *r2, tx2)
        }
        (Shape::Circle { .. }, Shape::Polygon { .. }) => collide_circle_polygon(s1, tx1, s2, tx2),
        (Shape::Polygon { .. }, Shape::Circle { .. }) => collide_circle_polygon(s2, tx2, s1, tx1)
            .map(|collision| negate_direction(collision)),
        (Shape::Polygon { .. }, Shape::Polygon { .. }) => collide_polygons(s1, tx1, s2, tx2),
    }
}

fn negate_direction(mut collision: Collision) -> Collision {
    collision.direction = -collision.direction;
    collision
}

/// Circle-circle: overlap iff center distance is less than the radius sum.
fn collide_circles(r1: f64, tx1: &Transform, r2: f64, tx2: &Transform) -> Option<Collision> {
    let delta = tx2.position - tx1.position;

    let radius_sum = r1 + r2;
    let magnitude_sqr = delta.magnitude_squared();

    if radius_sum * radius_sum < magnitude_sqr {
        return None;
    }

    let magnitude = magnitude_sqr.sqrt();
    let direction = if magnitude <= 0.0 {
        Vector2::new(0.0, f64::EPSILON)
    } else {
        delta / magnitude
    };
    let magnitude = magnitude.max(f64::EPSILON);

    let mut collision = Collision::empty_with_direction(direction);

    let point = tx1.transform_point(direction * r1);
    push_single_contact(&mut collision, pack_feature_id(false, 0, 0), point, radius_sum - magnitude);

    Some(collision)
}

/// Circle-polygon via the closest-feature (vertex vs. edge) Voronoi test.
///
/// `shape1`/`tx1` may be either the circle or the polygon; whichever is the
/// circle is detected by variant and the direction is oriented so it always
/// points from `shape1` toward `shape2`, matching [`compute_collision`]'s contract.
fn collide_circle_polygon(
    shape1: &Shape,
    tx1: &Transform,
    shape2: &Shape,
    tx2: &Transform,
) -> Option<Collision> {
    let (circle, circle_tx, poly, poly_tx, circle_is_first) = match (shape1, shape2) {
        (Shape::Circle { .. }, Shape::Polygon { .. }) => (shape1, tx1, shape2, tx2, true),
        (Shape::Polygon { .. }, Shape::Circle { .. }) => (shape2, tx2, shape1, tx1, false),
        _ => return None,
    };

    let radius = circle.radius()?;
    let vertices = poly.vertices();
    let normals = poly.normals();

    let local_center = poly_tx.rotation.inverse_rotate(circle_tx.position - poly_tx.position);

    let mut max_dot = f64::MIN;
    let mut max_index = None;

    for i in 0..vertices.len() {
        let dot = normals[i].dot(local_center - vertices[i]);
        if dot > radius {
            return None;
        }
        if dot > max_dot {
            max_dot = dot;
            max_index = Some(i);
        }
    }

    let max_index = max_index?;
    let delta_position = tx2.position - tx1.position;

    let orient = |mut direction: Vector2| -> Vector2 {
        if delta_position.dot(direction) < 0.0 {
            direction = -direction;
        }
        direction
    };

    let mut collision = if max_dot < 0.0 {
        // Circle center lies inside the polygon: push out along the closest edge normal.
        let direction = orient(-poly_tx.rotation.rotate(normals[max_index]));
        let point = circle_tx.position + direction * radius;
        let mut collision = Collision::empty_with_direction(direction);
        push_single_contact(&mut collision, pack_feature_id(false, max_index as u32, 0), point, radius - max_dot);
        collision
    } else {
        let n = vertices.len();
        let v1_index = if max_index > 0 { max_index - 1 } else { n - 1 };
        let (v1, v2) = (vertices[v1_index], vertices[max_index]);

        let edge = v2 - v1;
        let v1_to_center = local_center - v1;
        let v2_to_center = local_center - v2;

        let v1_dot = v1_to_center.dot(edge);
        let v2_dot = v2_to_center.dot(-edge);

        if v1_dot <= 0.0 || v2_dot <= 0.0 {
            let direction_local = if v1_dot <= 0.0 { v1_to_center } else { v2_to_center };
            let magnitude_sqr = direction_local.magnitude_squared();

            if radius * radius < magnitude_sqr {
                return None;
            }

            let magnitude = magnitude_sqr.sqrt().max(f64::EPSILON);
            let direction = orient(poly_tx.rotation.rotate(-direction_local) / magnitude);

            let point = circle_tx.transform_point(direction * radius);
            let mut collision = Collision::empty_with_direction(direction);
            push_single_contact(&mut collision, pack_feature_id(false, max_index as u32, 0), point, radius - magnitude);
            collision
        } else {
            let direction = orient(-poly_tx.rotation.rotate(normals[max_index]));
            let point = circle_tx.position + direction * radius;
            let mut collision = Collision::empty_with_direction(direction);
            push_single_contact(&mut collision, pack_feature_id(false, max_index as u32, 0), point, radius - max_dot);
            collision
        }
    };

    if !circle_is_first {
        collision = negate_direction(collision);
    }

    Some(collision)
}

fn push_single_contact(collision: &mut Collision, id: u32, point: Vector2, depth: f64) {
    collision.contacts.push(Contact {
        id,
        point,
        depth,
        ..Contact::default()
    });
}

/// An up-to-three-point clipped edge: `data[0..2]` are the clip endpoints,
/// `data[2]` is the reference shape's support vertex used for depth projection.
#[derive(Debug, Clone, Copy)]
struct Edge {
    data: [Vector2; 3],
    indexes: [usize; 2],
    count: usize,
}

/// Returns the index of the vertex of `vertices` (transformed by `tx`) farthest
/// along local-space direction `v`.
fn support_point_index(vertices: &[Vector2], tx: &Transform, v: Vector2) -> Option<usize> {
    let local_v = tx.rotation.inverse_rotate(v);

    let mut max_dot = f64::MIN;
    let mut max_index = None;

    for (i, vertex) in vertices.iter().enumerate() {
        let dot = vertex.dot(local_v);
        if dot > max_dot {
            max_dot = dot;
            max_index = Some(i);
        }
    }

    max_index
}

/// Returns the edge of `shape` most perpendicular to world-space direction `v`.
fn contact_edge(shape: &Shape, tx: &Transform, v: Vector2) -> Option<Edge> {
    let vertices = shape.vertices();
    let support_index = support_point_index(vertices, tx, v)?;

    let n = vertices.len();
    let prev_index = if support_index == 0 { n - 1 } else { support_index - 1 };
    let next_index = if support_index == n - 1 { 0 } else { support_index + 1 };

    let prev_edge = (vertices[support_index] - vertices[prev_index])
        .try_normalized()
        .unwrap_or_else(Vector2::zero);
    let next_edge = (vertices[support_index] - vertices[next_index])
        .try_normalized()
        .unwrap_or_else(Vector2::zero);

    let local_v = tx.rotation.inverse_rotate(v);
    let support_vertex = tx.transform_point(vertices[support_index]);

    if prev_edge.dot(local_v) < next_edge.dot(local_v) {
        let prev_vertex = tx.transform_point(vertices[prev_index]);
        Some(Edge {
            data: [prev_vertex, support_vertex, support_vertex],
            indexes: [prev_index, support_index],
            count: 2,
        })
    } else {
        let next_vertex = tx.transform_point(vertices[next_index]);
        Some(Edge {
            data: [support_vertex, next_vertex, support_vertex],
            indexes: [support_index, next_index],
            count: 2,
        })
    }
}

/// Finds the axis of `s1` (among its face normals) with minimum penetration
/// into `s2`. Returns `None` if `s1` has no vertices; `depth >= 0` means
/// separated along that axis (no collision).
fn separating_axis_index(
    s1: &Shape,
    tx1: &Transform,
    s2: &Shape,
    tx2: &Transform,
) -> Option<(usize, f64)> {
    let vertices1 = s1.vertices();
    let normals1 = s1.normals();
    let vertices2 = s2.vertices();

    let mut max_depth = f64::MIN;
    let mut max_index = None;

    for i in 0..normals1.len() {
        let vertex = tx1.transform_point(vertices1[i]);
        let normal = tx1.rotation.rotate(normals1[i]);

        let support_index = support_point_index(vertices2, tx2, -normal)?;
        let support_point = tx2.transform_point(vertices2[support_index]);

        let depth = normal.dot(support_point - vertex);
        if depth > max_depth {
            max_depth = depth;
            max_index = Some(i);
        }
    }

    max_index.map(|index| (index, max_depth))
}

/// Clip `edge` against the half-plane `dot(x, v) >= dot`, replacing whichever
/// endpoint falls outside with the intersection point. Returns `false` if both
/// endpoints fall outside (nothing survives the clip).
fn clip_edge(edge: &mut Edge, v: Vector2, dot: f64) -> bool {
    edge.count = 0;

    let dot1 = edge.data[0].dot(v) - dot;
    let dot2 = edge.data[1].dot(v) - dot;

    if dot1 >= 0.0 && dot2 >= 0.0 {
        edge.count = 2;
        return true;
    }

    let edge_vector = edge.data[1] - edge.data[0];
    let mid_point = edge.data[0] + edge_vector * (dot1 / (dot1 - dot2));

    if dot1 > 0.0 && dot2 < 0.0 {
        edge.data[1] = mid_point;
        edge.count = 2;
        true
    } else if dot1 < 0.0 && dot2 > 0.0 {
        edge.data[0] = edge.data[1];
        edge.data[1] = mid_point;
        edge.count = 2;
        true
    } else {
        false
    }
}

/// Polygon-polygon via SAT: test both shapes' face normals as candidate
/// separating axes, then clip the incident edge against the reference edge's
/// side planes to produce up to two contact points.
fn collide_polygons(s1: &Shape, tx1: &Transform, s2: &Shape, tx2: &Transform) -> Option<Collision> {
    let (index1, max_depth1) = separating_axis_index(s1, tx1, s2, tx2)?;
    if max_depth1 >= 0.0 {
        return None;
    }

    let (index2, max_depth2) = separating_axis_index(s2, tx2, s1, tx1)?;
    if max_depth2 >= 0.0 {
        return None;
    }

    let mut direction = if max_depth1 > max_depth2 {
        tx1.rotation.rotate(s1.normals()[index1])
    } else {
        tx2.rotation.rotate(s2.normals()[index2])
    };

    let delta_position = tx2.position - tx1.position;
    if delta_position.dot(direction) < 0.0 {
        direction = -direction;
    }

    let e1 = contact_edge(s1, tx1, direction)?;
    let e2 = contact_edge(s2, tx2, -direction)?;

    let edge_vector1 = e1.data[1] - e1.data[0];
    let edge_vector2 = e2.data[1] - e2.data[0];

    let edge_dot1 = edge_vector1.dot(direction);
    let edge_dot2 = edge_vector2.dot(direction);

    let (ref_edge, mut inc_edge, ref_edge_flipped) = if edge_dot1.abs() > edge_dot2.abs() {
        (e2, e1, true)
    } else {
        (e1, e2, false)
    };

    let ref_edge_vector = (ref_edge.data[1] - ref_edge.data[0])
        .try_normalized()
        .unwrap_or_else(Vector2::zero);

    let ref_dot1 = ref_edge.data[0].dot(ref_edge_vector);
    let ref_dot2 = ref_edge.data[1].dot(ref_edge_vector);

    if !clip_edge(&mut inc_edge, ref_edge_vector, ref_dot1) {
        return None;
    }
    if !clip_edge(&mut inc_edge, -ref_edge_vector, -ref_dot2) {
        return None;
    }

    let ref_edge_normal = right_normal_vec(ref_edge_vector);
    let max_depth = ref_edge.data[2].dot(ref_edge_normal);

    let depth1 = inc_edge.data[0].dot(ref_edge_normal) - max_depth;
    let depth2 = inc_edge.data[1].dot(ref_edge_normal) - max_depth;

    let bit_mask = pack_feature_id(ref_edge_flipped, ref_edge.indexes[0] as u32, 0) & !0xff;

    let mut contacts = ArrayVec::<Contact, 2>::new();

    if depth1 < 0.0 {
        contacts.push(Contact {
            id: bit_mask | (inc_edge.indexes[1] as u32 & 0xff),
            point: inc_edge.data[1],
            depth: depth2,
            ..Contact::default()
        });
    } else if depth2 < 0.0 {
        contacts.push(Contact {
            id: bit_mask | (inc_edge.indexes[0] as u32 & 0xff),
            point: inc_edge.data[0],
            depth: depth1,
            ..Contact::default()
        });
    } else {
        contacts.push(Contact {
            id: bit_mask | (inc_edge.indexes[0] as u32 & 0xff),
            point: inc_edge.data[0],
            depth: depth1,
            ..Contact::default()
        });
        contacts.push(Contact {
            id: bit_mask | (inc_edge.indexes[1] as u32 & 0xff),
            point: inc_edge.data[1],
            depth: depth2,
            ..Contact::default()
        });
    }

    Some(Collision {
        friction: 0.0,
        restitution: 0.0,
        direction,
        contacts,
    })
}

impl Collision {
    fn empty_with_direction(direction: Vector2) -> Self {
        let mut collision = Collision::empty();
        collision.direction = direction;
        collision
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
    fn circles_overlap_when_close() {
        let circle = Shape::circle(mat(), 1.0).unwrap();
        let tx1 = Transform::from_position(Vector2::new(0.0, 0.0));
        let tx2 = Transform::from_position(Vector2::new(1.5, 0.0));

        let collision = compute_collision(&circle, &tx1, &circle, &tx2).unwrap();
        assert_eq!(collision.count(), 1);
        assert!(collision.contacts[0].depth > 0.0);
        assert!((collision.direction - Vector2::new(1.0, 0.0)).magnitude() < 1e-9);
    }

    #[test]
    fn circles_separate_when_far() {
        let circle = Shape::circle(mat(), 1.0).unwrap();
        let tx1 = Transform::from_position(Vector2::new(0.0, 0.0));
        let tx2 = Transform::from_position(Vector2::new(5.0, 0.0));

        assert!(compute_collision(&circle, &tx1, &circle, &tx2).is_none());
    }

    #[test]
    fn circle_rests_on_polygon_edge() {
        let circle = Shape::circle(mat(), 1.0).unwrap();
        let ground = Shape::rectangle(mat(), 10.0, 1.0).unwrap();

        let circle_tx = Transform::from_position(Vector2::new(0.0, -1.4));
        let ground_tx = Transform::from_position(Vector2::new(0.0, 0.0));

        let collision = compute_collision(&circle, &circle_tx, &ground, &ground_tx).unwrap();
        assert_eq!(collision.count(), 1);
        assert!(collision.contacts[0].depth > 0.0);
    }

    #[test]
    fn circle_above_polygon_does_not_collide() {
        let circle = Shape::circle(mat(), 1.0).unwrap();
        let ground = Shape::rectangle(mat(), 10.0, 1.0).unwrap();

        let circle_tx = Transform::from_position(Vector2::new(0.0, -10.0));
        let ground_tx = Transform::from_position(Vector2::new(0.0, 0.0));

        assert!(compute_collision(&circle, &circle_tx, &ground, &ground_tx).is_none());
    }

    #[test]
    fn two_boxes_face_to_face_produce_two_contacts() {
        let box1 = Shape::rectangle(mat(), 2.0, 2.0).unwrap();
        let box2 = Shape::rectangle(mat(), 2.0, 2.0).unwrap();

        let tx1 = Transform::from_position(Vector2::new(0.0, 0.0));
        let tx2 = Transform::from_position(Vector2::new(1.8, 0.0));

        let collision = compute_collision(&box1, &tx1, &box2, &tx2).unwrap();
        assert_eq!(collision.count(), 2);
        for contact in &collision.contacts {
            assert!(contact.depth > 0.0);
        }
    }

    #[test]
    fn separated_boxes_do_not_collide() {
        let box1 = Shape::rectangle(mat(), 2.0, 2.0).unwrap();
        let box2 = Shape::rectangle(mat(), 2.0, 2.0).unwrap();

        let tx1 = Transform::from_position(Vector2::new(0.0, 0.0));
        let tx2 = Transform::from_position(Vector2::new(10.0, 0.0));

        assert!(compute_collision(&box1, &tx1, &box2, &tx2).is_none());
    }

    #[test]
    fn rotated_box_corner_against_box_produces_one_contact() {
        let box1 = Shape::rectangle(mat(), 2.0, 2.0).unwrap();
        let box2 = Shape::rectangle(mat(), 2.0, 2.0).unwrap();

        let tx1 = Transform::from_position(Vector2::new(0.0, 0.0));
        let tx2 = Transform::new(Vector2::new(1.9, 1.9), 45f64.to_radians());

        let collision = compute_collision(&box1, &tx1, &box2, &tx2);
        assert!(collision.is_some());
    }
}
