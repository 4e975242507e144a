//! Construction methods for Polyhedron.

use std::collections::{BTreeSet, HashMap};

use brushwork_config::{ALMOST_ZERO, POINT_STATUS_EPSILON};
use glam::{DVec2, DVec3};
use tracing::trace;

use super::types::{Edge, EdgeId, FaceGeometry, FaceId, HalfEdge, HalfEdgeId, PayloadId, Vertex, VertexId};
use super::Polyhedron;
use crate::math::{BBox3, Plane};

/// Positions closer than this are welded into one vertex while building
const WELD_EPSILON: f64 = 1e-9;

/// One face to be assembled into a polyhedron
///
/// `positions` run counter-clockwise when seen from the side `plane.normal`
/// points to.
#[derive(Debug, Clone)]
pub struct FaceLoop {
    pub positions: Vec<DVec3>,
    pub plane: Plane,
    pub payload: Option<PayloadId>,
}

impl FaceLoop {
    pub fn new(positions: Vec<DVec3>, plane: Plane, payload: Option<PayloadId>) -> Self {
        Self {
            positions,
            plane,
            payload,
        }
    }
}

impl Polyhedron {
    /// Polyhedron without any vertices
    pub fn empty() -> Self {
        Self::default()
    }

    /// Axis aligned box
    pub fn from_bounds(bounds: &BBox3) -> Self {
        let (a, b) = (bounds.min, bounds.max);
        let corner = |x: f64, y: f64, z: f64| DVec3::new(x, y, z);

        let loops = [
            (
                -DVec3::X,
                [corner(a.x, a.y, a.z), corner(a.x, a.y, b.z), corner(a.x, b.y, b.z), corner(a.x, b.y, a.z)],
            ),
            (
                DVec3::X,
                [corner(b.x, a.y, a.z), corner(b.x, b.y, a.z), corner(b.x, b.y, b.z), corner(b.x, a.y, b.z)],
            ),
            (
                -DVec3::Y,
                [corner(a.x, a.y, a.z), corner(b.x, a.y, a.z), corner(b.x, a.y, b.z), corner(a.x, a.y, b.z)],
            ),
            (
                DVec3::Y,
                [corner(a.x, b.y, a.z), corner(a.x, b.y, b.z), corner(b.x, b.y, b.z), corner(b.x, b.y, a.z)],
            ),
            (
                -DVec3::Z,
                [corner(a.x, a.y, a.z), corner(a.x, b.y, a.z), corner(b.x, b.y, a.z), corner(b.x, a.y, a.z)],
            ),
            (
                DVec3::Z,
                [corner(a.x, a.y, b.z), corner(b.x, a.y, b.z), corner(b.x, b.y, b.z), corner(a.x, b.y, b.z)],
            ),
        ];

        Self::from_face_loops(
            loops
                .into_iter()
                .map(|(normal, positions)| {
                    FaceLoop::new(
                        positions.to_vec(),
                        Plane::from_point_and_normal(positions[0], normal),
                        None,
                    )
                })
                .collect(),
        )
    }

    /// Convex hull of a point set
    ///
    /// Points closer than `ALMOST_ZERO` to an earlier point are dropped.
    /// Depending on the input the result is empty, a point, an edge, a
    /// polygon, or a polyhedron. Points that are not extreme are discarded.
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        let mut unique: Vec<DVec3> = Vec::new();
        for point in points {
            if !unique.iter().any(|p| p.abs_diff_eq(point, ALMOST_ZERO)) {
                unique.push(point);
            }
        }

        match unique.len() {
            0 => return Self::empty(),
            1 => return Self::point(unique[0]),
            2 => return Self::segment(unique[0], unique[1]),
            _ => {}
        }

        // Two far apart points span a line, the point farthest from that line
        // spans a plane with them
        let a = unique[0];
        let b = farthest_from(&unique, |p| p.distance(a));
        let axis = (b - a).normalize();
        let c = farthest_from(&unique, |p| line_distance(p, a, axis));

        if line_distance(c, a, axis) <= POINT_STATUS_EPSILON {
            let project = |p: &DVec3| (*p - a).dot(axis);
            let first = farthest_from(&unique, |p| -project(&p));
            let last = farthest_from(&unique, |p| project(&p));
            return Self::segment(first, last);
        }

        let Some(base) = Plane::from_points(a, b, c) else {
            return Self::segment(a, b);
        };
        let d = farthest_from(&unique, |p| base.point_distance(p).abs());

        if base.point_distance(d).abs() <= POINT_STATUS_EPSILON {
            let hull = convex_loop(&unique, base.normal);
            let positions: Vec<DVec3> = hull.into_iter().map(|i| unique[i]).collect();
            return Self::from_face_loops(vec![FaceLoop::new(positions, base, None)]);
        }

        Self::from_face_loops(supporting_faces(&unique))
    }

    /// Add a point to the polyhedron, rebuilding the hull
    pub fn add_point(&mut self, point: DVec3) {
        let mut points = self.vertex_positions();
        points.push(point);
        *self = Self::from_points(points);
    }

    pub(crate) fn point(position: DVec3) -> Self {
        Self {
            vertices: vec![Vertex {
                id: VertexId(0),
                position,
                leaving: None,
            }],
            ..Default::default()
        }
    }

    pub(crate) fn segment(start: DVec3, end: DVec3) -> Self {
        Self {
            vertices: vec![
                Vertex {
                    id: VertexId(0),
                    position: start,
                    leaving: None,
                },
                Vertex {
                    id: VertexId(1),
                    position: end,
                    leaving: None,
                },
            ],
            edges: vec![Edge {
                id: EdgeId(0),
                first_vertex: VertexId(0),
                second_vertex: VertexId(1),
                first_half_edge: None,
                second_half_edge: None,
            }],
            ..Default::default()
        }
    }

    /// Assemble a polyhedron from face loops
    ///
    /// Equal positions are welded into shared vertices and opposite
    /// half-edges are linked as twins. Loops with fewer than three distinct
    /// positions are skipped. Face ids follow the order of the accepted loops.
    pub fn from_face_loops(loops: Vec<FaceLoop>) -> Self {
        // First pass: weld positions so that every accepted loop refers to
        // canonical positions only
        let mut canonical: Vec<DVec3> = Vec::new();
        let mut accepted: Vec<FaceLoop> = Vec::with_capacity(loops.len());

        for face_loop in loops {
            let mut positions: Vec<DVec3> = face_loop
                .positions
                .iter()
                .map(|p| weld(&mut canonical, *p))
                .collect();
            positions.dedup();
            while positions.len() > 1 && positions.first() == positions.last() {
                positions.pop();
            }

            let distinct: BTreeSet<[u64; 3]> = positions.iter().map(|p| position_key(*p)).collect();
            if positions.len() < 3 || distinct.len() != positions.len() {
                trace!(
                    "from_face_loops: skipping degenerate loop with {} positions",
                    positions.len()
                );
                continue;
            }
            accepted.push(FaceLoop { positions, ..face_loop });
        }

        let mut polyhedron = Self::default();
        let mut vertex_lookup: HashMap<[u64; 3], VertexId> = HashMap::new();

        for face_loop in accepted {
            let ids: Vec<VertexId> = face_loop
                .positions
                .iter()
                .map(|p| {
                    *vertex_lookup.entry(position_key(*p)).or_insert_with(|| {
                        let id = VertexId(polyhedron.vertices.len() as u32);
                        polyhedron.vertices.push(Vertex {
                            id,
                            position: *p,
                            leaving: None,
                        });
                        id
                    })
                })
                .collect();
            polyhedron.push_face(&ids, face_loop.plane, face_loop.payload);
        }

        polyhedron
    }

    /// Append a face made of the given vertex loop
    fn push_face(&mut self, ids: &[VertexId], plane: Plane, payload: Option<PayloadId>) -> FaceId {
        let face_id = FaceId(self.faces.len() as u32);
        let base = self.half_edges.len() as u32;
        let count = ids.len() as u32;

        for (i, &origin) in ids.iter().enumerate() {
            let i = i as u32;
            let id = HalfEdgeId(base + i);
            let destination = ids[((i + 1) % count) as usize];

            let edge = match self.edge_map.get(&(destination, origin)) {
                Some(&twin_id) => {
                    // Link twins
                    self.half_edges[twin_id.0 as usize].twin = Some(id);
                    let edge = self.half_edges[twin_id.0 as usize].edge;
                    self.edges[edge.0 as usize].second_half_edge = Some(id);
                    edge
                }
                None => {
                    let edge = EdgeId(self.edges.len() as u32);
                    self.edges.push(Edge {
                        id: edge,
                        first_vertex: origin,
                        second_vertex: destination,
                        first_half_edge: Some(id),
                        second_half_edge: None,
                    });
                    edge
                }
            };

            self.half_edges.push(HalfEdge {
                id,
                origin,
                twin: self.edge_map.get(&(destination, origin)).copied(),
                next: HalfEdgeId(base + (i + 1) % count),
                prev: HalfEdgeId(base + (i + count - 1) % count),
                face: face_id,
                edge,
            });
            self.edge_map.insert((origin, destination), id);

            let vertex = &mut self.vertices[origin.0 as usize];
            if vertex.leaving.is_none() {
                vertex.leaving = Some(id);
            }
        }

        self.faces.push(FaceGeometry {
            id: face_id,
            half_edge: HalfEdgeId(base),
            plane,
            payload,
        });
        face_id
    }
}

/// Exact key of a position, used to identify welded vertices
pub(crate) fn position_key(p: DVec3) -> [u64; 3] {
    // -0.0 and 0.0 must map to the same key
    let normalize = |c: f64| if c == 0.0 { 0.0f64.to_bits() } else { c.to_bits() };
    [normalize(p.x), normalize(p.y), normalize(p.z)]
}

fn weld(canonical: &mut Vec<DVec3>, position: DVec3) -> DVec3 {
    match canonical.iter().find(|p| p.abs_diff_eq(position, WELD_EPSILON)) {
        Some(p) => *p,
        None => {
            canonical.push(position);
            position
        }
    }
}

fn farthest_from(points: &[DVec3], metric: impl Fn(DVec3) -> f64) -> DVec3 {
    points
        .iter()
        .copied()
        .max_by(|p, q| metric(*p).total_cmp(&metric(*q)))
        .unwrap_or_default()
}

fn line_distance(p: DVec3, origin: DVec3, axis: DVec3) -> f64 {
    (p - origin).cross(axis).length()
}

/// Indices of the convex hull of coplanar points, counter-clockwise around
/// `normal`. Points on the hull boundary between two corners are dropped.
pub(crate) fn convex_loop(points: &[DVec3], normal: DVec3) -> Vec<usize> {
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);
    let projected: Vec<DVec2> = points.iter().map(|p| DVec2::new(p.dot(u), p.dot(v))).collect();

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&i, &j| {
        projected[i]
            .x
            .total_cmp(&projected[j].x)
            .then(projected[i].y.total_cmp(&projected[j].y))
    });
    if order.len() < 3 {
        return order;
    }

    // Keep a corner only if it turns left by more than the point tolerance
    let turns_left = |hull: &[usize], next: usize| {
        let o = projected[hull[hull.len() - 2]];
        let a = projected[hull[hull.len() - 1]];
        let b = projected[next];
        let base = (b - o).length();
        base > 0.0 && (a - o).perp_dot(b - o) / base > POINT_STATUS_EPSILON
    };

    let mut lower: Vec<usize> = Vec::new();
    for &i in &order {
        while lower.len() >= 2 && !turns_left(&lower, i) {
            lower.pop();
        }
        lower.push(i);
    }

    let mut upper: Vec<usize> = Vec::new();
    for &i in order.iter().rev() {
        while upper.len() >= 2 && !turns_left(&upper, i) {
            upper.pop();
        }
        upper.push(i);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Faces of the convex hull of points that span a volume
///
/// Every plane through three of the points that has all points on or below
/// it supports a face. The face consists of the points on that plane.
fn supporting_faces(points: &[DVec3]) -> Vec<FaceLoop> {
    let mut found: Vec<BTreeSet<usize>> = Vec::new();
    let mut loops = Vec::new();
    let n = points.len();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if found
                    .iter()
                    .any(|face| face.contains(&i) && face.contains(&j) && face.contains(&k))
                {
                    continue;
                }
                let Some(plane) = Plane::from_points(points[i], points[j], points[k]) else {
                    continue;
                };

                let mut above = false;
                let mut below = false;
                for p in points {
                    let distance = plane.point_distance(*p);
                    above |= distance > POINT_STATUS_EPSILON;
                    below |= distance < -POINT_STATUS_EPSILON;
                    if above && below {
                        break;
                    }
                }
                if above && below {
                    continue;
                }
                let plane = if above { plane.flip() } else { plane };

                let on_plane: BTreeSet<usize> = (0..n)
                    .filter(|&index| plane.point_distance(points[index]).abs() <= POINT_STATUS_EPSILON)
                    .collect();
                if found.contains(&on_plane) {
                    continue;
                }

                let members: Vec<usize> = on_plane.iter().copied().collect();
                let member_points: Vec<DVec3> = members.iter().map(|&m| points[m]).collect();
                let hull = convex_loop(&member_points, plane.normal);
                found.push(on_plane);

                if hull.len() >= 3 {
                    let positions = hull.into_iter().map(|h| member_points[h]).collect();
                    loops.push(FaceLoop::new(positions, plane, None));
                }
            }
        }
    }

    loops
}
