//! Geometric primitives shared by the polyhedron and brush crates.
//!
//! All comparisons are tolerance based. The tolerances live in
//! `brushwork_config` so both crates agree on them.

use brushwork_config::{COLINEAR_EPSILON, POINT_STATUS_EPSILON};
use glam::{DMat3, DMat4, DVec3};
use serde::{Deserialize, Serialize};

/// Position of a point relative to a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneStatus {
    /// In front of the plane, on the side the normal points to
    Above,
    /// Behind the plane
    Below,
    /// On the plane within `POINT_STATUS_EPSILON`
    Inside,
}

/// Which side of a face a ray may hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
    Both,
}

/// An oriented plane `normal . p = distance` with a unit normal.
///
/// For brush faces the normal points out of the solid, so the solid lies
/// below every one of its planes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: DVec3,
    pub distance: f64,
}

impl Plane {
    pub fn new(normal: DVec3, distance: f64) -> Self {
        Self { normal, distance }
    }

    /// Plane through `point` with the given (not necessarily unit) normal
    pub fn from_point_and_normal(point: DVec3, normal: DVec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: normal.dot(point),
        }
    }

    /// Plane through three points. The normal is `(p1 - p0) x (p2 - p0)`,
    /// i.e. the points appear counter-clockwise when seen from above.
    ///
    /// Returns `None` if the points are collinear.
    pub fn from_points(p0: DVec3, p1: DVec3, p2: DVec3) -> Option<Self> {
        let normal = (p1 - p0).cross(p2 - p0);
        let length = normal.length();
        if length < COLINEAR_EPSILON || !length.is_finite() {
            return None;
        }
        let normal = normal / length;
        Some(Self {
            normal,
            distance: normal.dot(p0),
        })
    }

    /// Signed distance of `point` from the plane
    pub fn point_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.distance
    }

    pub fn point_status(&self, point: DVec3) -> PlaneStatus {
        self.point_status_with_epsilon(point, POINT_STATUS_EPSILON)
    }

    pub fn point_status_with_epsilon(&self, point: DVec3, epsilon: f64) -> PlaneStatus {
        let distance = self.point_distance(point);
        if distance > epsilon {
            PlaneStatus::Above
        } else if distance < -epsilon {
            PlaneStatus::Below
        } else {
            PlaneStatus::Inside
        }
    }

    /// Same plane, opposite orientation
    pub fn flip(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    pub fn translate(&self, delta: DVec3) -> Self {
        Self {
            normal: self.normal,
            distance: self.distance + self.normal.dot(delta),
        }
    }

    /// Apply an affine transform. Returns `None` if the linear part is singular.
    pub fn transform(&self, matrix: &DMat4) -> Option<Self> {
        let linear = DMat3::from_mat4(*matrix);
        if linear.determinant().abs() < f64::EPSILON {
            return None;
        }
        let normal = (linear.inverse().transpose() * self.normal).normalize();
        let anchor = matrix.transform_point3(self.anchor());
        Some(Self::from_point_and_normal(anchor, normal))
    }

    /// The point on the plane closest to the origin
    pub fn anchor(&self) -> DVec3 {
        self.normal * self.distance
    }

    /// Tolerance aware equality of normal and distance
    pub fn is_equal(&self, other: &Plane, epsilon: f64) -> bool {
        self.normal.abs_diff_eq(other.normal, epsilon)
            && (self.distance - other.distance).abs() <= epsilon
    }
}

/// Axis aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox3 {
    pub min: DVec3,
    pub max: DVec3,
}

impl BBox3 {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Cube centered at the origin with the given half size
    pub fn cube(extent: f64) -> Self {
        Self::new(DVec3::splat(-extent), DVec3::splat(extent))
    }

    /// Smallest box containing all points, `None` for an empty iterator
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn contains(&self, other: &BBox3) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    pub fn intersects(&self, other: &BBox3) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn expand(&self, amount: f64) -> Self {
        Self {
            min: self.min - DVec3::splat(amount),
            max: self.max + DVec3::splat(amount),
        }
    }

    pub fn translate(&self, delta: DVec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }

    pub fn is_equal(&self, other: &BBox3, epsilon: f64) -> bool {
        self.min.abs_diff_eq(other.min, epsilon) && self.max.abs_diff_eq(other.max, epsilon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    pub origin: DVec3,
    /// Should be normalized for distances to be meaningful
    pub direction: DVec3,
}

impl Ray3 {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    pub fn point_at(&self, distance: f64) -> DVec3 {
        self.origin + self.direction * distance
    }
}

/// A line segment between two positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment3 {
    pub start: DVec3,
    pub end: DVec3,
}

impl Segment3 {
    pub fn new(start: DVec3, end: DVec3) -> Self {
        Self { start, end }
    }

    pub fn translate(&self, delta: DVec3) -> Self {
        Self::new(self.start + delta, self.end + delta)
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Equal if the endpoints match in either order
    pub fn is_equal(&self, other: &Segment3, epsilon: f64) -> bool {
        (self.start.abs_diff_eq(other.start, epsilon) && self.end.abs_diff_eq(other.end, epsilon))
            || (self.start.abs_diff_eq(other.end, epsilon)
                && self.end.abs_diff_eq(other.start, epsilon))
    }

    /// Endpoints of all segments, in order
    pub fn collect_vertices(segments: &[Segment3]) -> Vec<DVec3> {
        segments.iter().flat_map(|s| [s.start, s.end]).collect()
    }
}

/// A planar polygon given by its vertex loop
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon3 {
    vertices: Vec<DVec3>,
}

impl Polygon3 {
    pub fn new(vertices: Vec<DVec3>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn translate(&self, delta: DVec3) -> Self {
        Self::new(self.vertices.iter().map(|v| *v + delta).collect())
    }

    pub fn center(&self) -> DVec3 {
        if self.vertices.is_empty() {
            return DVec3::ZERO;
        }
        self.vertices.iter().copied().sum::<DVec3>() / self.vertices.len() as f64
    }

    /// Whether `vertices` describes the same loop, allowing any rotation
    /// of the starting vertex and either winding.
    pub fn has_vertices(&self, vertices: &[DVec3], epsilon: f64) -> bool {
        cyclic_match(&self.vertices, vertices, epsilon)
    }

    pub fn is_equal(&self, other: &Polygon3, epsilon: f64) -> bool {
        self.has_vertices(&other.vertices, epsilon)
    }

    /// Vertices of all polygons, in order
    pub fn collect_vertices(polygons: &[Polygon3]) -> Vec<DVec3> {
        polygons.iter().flat_map(|p| p.vertices.iter().copied()).collect()
    }
}

/// Compare two vertex loops up to rotation and winding
pub fn cyclic_match(lhs: &[DVec3], rhs: &[DVec3], epsilon: f64) -> bool {
    if lhs.len() != rhs.len() {
        return false;
    }
    if lhs.is_empty() {
        return true;
    }
    let n = lhs.len();
    let Some(offset) = rhs.iter().position(|v| v.abs_diff_eq(lhs[0], epsilon)) else {
        return false;
    };
    let forward = (0..n).all(|i| lhs[i].abs_diff_eq(rhs[(offset + i) % n], epsilon));
    let backward = (0..n).all(|i| lhs[i].abs_diff_eq(rhs[(offset + n - i) % n], epsilon));
    forward || backward
}

pub fn is_zero(v: DVec3, epsilon: f64) -> bool {
    v.abs().max_element() <= epsilon
}

/// Snap each coordinate that lies within `epsilon` of an integer onto it
pub fn correct(v: DVec3, epsilon: f64) -> DVec3 {
    let snap = |c: f64| {
        let rounded = c.round();
        if (c - rounded).abs() < epsilon {
            rounded
        } else {
            c
        }
    };
    DVec3::new(snap(v.x), snap(v.y), snap(v.z))
}

/// Round every coordinate to the nearest multiple of `grid`
pub fn snap_to_grid(v: DVec3, grid: f64) -> DVec3 {
    (v / grid).round() * grid
}

/// Weight of a normal used to order face planes the way QBSP does:
/// faces whose normals are close to the positive axes come first.
pub fn plane_normal_weight(normal: DVec3) -> i32 {
    fn component_weight(c: f64) -> i32 {
        if (c - 1.0).abs() < 0.9 {
            0
        } else if (c + 1.0).abs() < 0.9 {
            1
        } else {
            2
        }
    }
    component_weight(normal.x) * 100 + component_weight(normal.y) * 10 + component_weight(normal.z)
}

/// Affine transform that maps the three `input` points onto the three
/// `output` points. A fourth point off each triangle's plane pins down the
/// out of plane behaviour.
///
/// The result contains non-finite values if either triangle is degenerate.
pub fn points_transformation_matrix(input: [DVec3; 3], output: [DVec3; 3]) -> DMat4 {
    let in3 = input[0] + (input[2] - input[0]).cross(input[1] - input[0]);
    let out3 = output[0] + (output[2] - output[0]).cross(output[1] - output[0]);

    let from = DMat3::from_cols(input[1] - input[0], input[2] - input[0], in3 - input[0]);
    let to = DMat3::from_cols(output[1] - output[0], output[2] - output[0], out3 - output[0]);

    let linear = to * from.inverse();
    let translation = output[0] - linear * input[0];

    DMat4::from_cols(
        linear.x_axis.extend(0.0),
        linear.y_axis.extend(0.0),
        linear.z_axis.extend(0.0),
        translation.extend(1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_from_points_orientation() {
        let plane = Plane::from_points(DVec3::ZERO, DVec3::X, DVec3::Y).unwrap();
        assert!(plane.normal.abs_diff_eq(DVec3::Z, 1e-12));
        assert_eq!(plane.point_status(DVec3::new(0.0, 0.0, 1.0)), PlaneStatus::Above);
        assert_eq!(plane.point_status(DVec3::new(0.0, 0.0, -1.0)), PlaneStatus::Below);
        assert_eq!(plane.point_status(DVec3::new(5.0, 3.0, 0.0)), PlaneStatus::Inside);
    }

    #[test]
    fn test_plane_from_collinear_points() {
        assert!(Plane::from_points(DVec3::ZERO, DVec3::X, DVec3::X * 2.0).is_none());
    }

    #[test]
    fn test_plane_translate_and_flip() {
        let plane = Plane::new(DVec3::Z, 4.0);
        let moved = plane.translate(DVec3::new(3.0, 0.0, 2.0));
        assert!((moved.distance - 6.0).abs() < 1e-12);
        let flipped = plane.flip();
        assert!(flipped.normal.abs_diff_eq(-DVec3::Z, 1e-12));
        assert_eq!(flipped.point_status(DVec3::new(0.0, 0.0, 10.0)), PlaneStatus::Below);
    }

    #[test]
    fn test_plane_transform() {
        let plane = Plane::new(DVec3::Z, 2.0);
        let rotation = DMat4::from_rotation_x(std::f64::consts::FRAC_PI_2);
        let rotated = plane.transform(&rotation).unwrap();
        // +Z rotated a quarter turn about X points along -Y
        assert!(rotated.normal.abs_diff_eq(-DVec3::Y, 1e-9));
        assert!((rotated.distance - 2.0).abs() < 1e-9);

        let scaled = plane.transform(&DMat4::from_scale(DVec3::new(1.0, 1.0, 3.0))).unwrap();
        assert!((scaled.distance - 6.0).abs() < 1e-9);

        assert!(plane.transform(&DMat4::from_scale(DVec3::ZERO)).is_none());
    }

    #[test]
    fn test_bbox_containment() {
        let outer = BBox3::cube(10.0);
        let inner = BBox3::new(DVec3::ZERO, DVec3::splat(10.0));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.intersects(&inner.translate(DVec3::splat(5.0))));
        assert!(!outer.intersects(&inner.translate(DVec3::splat(25.0))));
    }

    #[test]
    fn test_polygon_cyclic_match() {
        let square = vec![DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y];
        let polygon = Polygon3::new(square.clone());

        let rotated = vec![square[2], square[3], square[0], square[1]];
        assert!(polygon.has_vertices(&rotated, 1e-6));

        let reversed: Vec<_> = square.iter().rev().copied().collect();
        assert!(polygon.has_vertices(&reversed, 1e-6));

        let scrambled = vec![square[0], square[2], square[1], square[3]];
        assert!(!polygon.has_vertices(&scrambled, 1e-6));
    }

    #[test]
    fn test_correct_snaps_near_integers() {
        let v = correct(DVec3::new(1.0004, 2.5, -2.9999), 0.001);
        assert_eq!(v, DVec3::new(1.0, 2.5, -3.0));
    }

    #[test]
    fn test_plane_normal_weight_order() {
        let diagonal = DVec3::new(1.0, 1.0, 1.0).normalize();
        assert_eq!(plane_normal_weight(diagonal), 0);
        assert_eq!(plane_normal_weight(DVec3::X), 22);
        assert_eq!(plane_normal_weight(-DVec3::X), 122);
        assert_eq!(plane_normal_weight(-DVec3::Z), 221);
        assert!(plane_normal_weight(diagonal) < plane_normal_weight(DVec3::X));
        assert!(plane_normal_weight(DVec3::X) < plane_normal_weight(-DVec3::X));
    }

    #[test]
    fn test_points_transformation_matrix_translation() {
        let input = [DVec3::ZERO, DVec3::X, DVec3::Y];
        let delta = DVec3::new(3.0, -2.0, 5.0);
        let output = input.map(|p| p + delta);
        let matrix = points_transformation_matrix(input, output);
        assert!(matrix.is_finite());
        let moved = matrix.transform_point3(DVec3::new(0.25, 0.5, 2.0));
        assert!(moved.abs_diff_eq(DVec3::new(3.25, -1.5, 7.0), 1e-9));
    }

    #[test]
    fn test_points_transformation_matrix_degenerate() {
        let input = [DVec3::ZERO, DVec3::X, DVec3::X * 2.0];
        let matrix = points_transformation_matrix(input, input);
        assert!(!matrix.is_finite());
    }
}
