//! Ray / face intersection.
//!
//! Faces are convex polygons, so they are intersected as a triangle fan
//! using the Moller-Trumbore algorithm. Culling decides whether a hit on
//! the front side, the back side, or either side counts.

use glam::DVec3;

use crate::math::{Ray3, Side};

/// Epsilon for floating point comparisons in ray intersection
const EPSILON: f64 = 1e-9;

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray to the intersection point
    pub t: f64,
    /// Barycentric coordinate u (weight for vertex 1)
    pub u: f64,
    /// Barycentric coordinate v (weight for vertex 2)
    pub v: f64,
}

/// Moller-Trumbore ray-triangle intersection algorithm.
///
/// The triangle's front side is the one from which `v0, v1, v2` appear
/// counter-clockwise. Hits on a culled side are ignored. Hits exactly on the
/// triangle's edges count.
pub fn ray_triangle_intersection(
    ray: &Ray3,
    v0: DVec3,
    v1: DVec3,
    v2: DVec3,
    side: Side,
) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);

    // det > 0 means the ray travels against the triangle normal, i.e. it
    // hits the front side
    match side {
        Side::Front if det < EPSILON => return None,
        Side::Back if det > -EPSILON => return None,
        Side::Both if det.abs() < EPSILON => return None,
        _ => {}
    }

    let inv_det = 1.0 / det;
    let tvec = ray.origin - v0;

    let u = tvec.dot(pvec) * inv_det;
    if !(-EPSILON..=1.0 + EPSILON).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < -EPSILON || u + v > 1.0 + EPSILON {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < 0.0 {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Intersect a ray with a convex polygon given as a counter-clockwise loop.
///
/// Returns the distance along the ray to the closest hit.
pub fn ray_polygon_intersection(ray: &Ray3, vertices: &[DVec3], side: Side) -> Option<f64> {
    if vertices.len() < 3 {
        return None;
    }

    let v0 = vertices[0];
    vertices
        .windows(2)
        .skip(1)
        .filter_map(|pair| ray_triangle_intersection(ray, v0, pair[0], pair[1], side))
        .map(|hit| hit.t)
        .min_by(|a, b| a.total_cmp(b))
}
