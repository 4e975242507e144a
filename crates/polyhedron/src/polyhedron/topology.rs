//! Topology query methods for Polyhedron.

use std::collections::HashSet;

use glam::DVec3;

use super::types::{Edge, EdgeId, FaceGeometry, FaceId, HalfEdge, HalfEdgeId, PayloadId, Vertex, VertexId};
use super::Polyhedron;
use crate::math::{cyclic_match, BBox3, PlaneStatus, Polygon3, Ray3, Segment3, Side};
use crate::raycast::ray_polygon_intersection;

impl Polyhedron {
    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get vertex by ID
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0 as usize)
    }

    /// Get half-edge by ID
    pub fn half_edge(&self, id: HalfEdgeId) -> Option<&HalfEdge> {
        self.half_edges.get(id.0 as usize)
    }

    /// Get edge by ID
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0 as usize)
    }

    /// Get face by ID
    pub fn face(&self, id: FaceId) -> Option<&FaceGeometry> {
        self.faces.get(id.0 as usize)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn faces(&self) -> &[FaceGeometry] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Positions of all vertices, in id order
    pub fn vertex_positions(&self) -> Vec<DVec3> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Smallest box containing every vertex, the default box if empty
    pub fn bounds(&self) -> BBox3 {
        BBox3::from_points(self.vertices.iter().map(|v| v.position)).unwrap_or_default()
    }

    pub fn set_face_payload(&mut self, face: FaceId, payload: Option<PayloadId>) {
        if let Some(face) = self.faces.get_mut(face.0 as usize) {
            face.payload = payload;
        }
    }

    /// Face whose payload is `payload`
    pub fn face_by_payload(&self, payload: PayloadId) -> Option<FaceId> {
        self.faces
            .iter()
            .find(|f| f.payload == Some(payload))
            .map(|f| f.id)
    }

    // ========================================================================
    // Topology Queries
    // ========================================================================

    /// The vertex a half-edge points to
    pub fn destination(&self, id: HalfEdgeId) -> Option<VertexId> {
        let half_edge = self.half_edge(id)?;
        self.half_edge(half_edge.next).map(|next| next.origin)
    }

    /// Half-edges around a face, starting at the face's first half-edge
    pub fn face_half_edges(&self, face_id: FaceId) -> Vec<HalfEdgeId> {
        let mut result = Vec::new();
        let Some(face) = self.face(face_id) else {
            return result;
        };

        let start = face.half_edge;
        let mut current = start;
        loop {
            result.push(current);
            match self.half_edge(current) {
                Some(he) if he.next != start && result.len() <= self.half_edges.len() => {
                    current = he.next;
                }
                _ => break,
            }
        }
        result
    }

    /// Vertices of a face in counter-clockwise order
    pub fn face_vertices(&self, face_id: FaceId) -> Vec<VertexId> {
        self.face_half_edges(face_id)
            .into_iter()
            .filter_map(|he| self.half_edge(he).map(|he| he.origin))
            .collect()
    }

    /// Vertex positions of a face in counter-clockwise order
    pub fn face_positions(&self, face_id: FaceId) -> Vec<DVec3> {
        self.face_vertices(face_id)
            .into_iter()
            .filter_map(|v| self.vertex(v).map(|v| v.position))
            .collect()
    }

    pub fn face_polygon(&self, face_id: FaceId) -> Polygon3 {
        Polygon3::new(self.face_positions(face_id))
    }

    /// Vertex loops of all faces
    pub fn face_polygons(&self) -> Vec<Polygon3> {
        self.faces.iter().map(|f| self.face_polygon(f.id)).collect()
    }

    pub fn edge_segment(&self, edge_id: EdgeId) -> Option<Segment3> {
        let edge = self.edge(edge_id)?;
        let start = self.vertex(edge.first_vertex)?.position;
        let end = self.vertex(edge.second_vertex)?.position;
        Some(Segment3::new(start, end))
    }

    /// Segments of all edges
    pub fn edge_segments(&self) -> Vec<Segment3> {
        self.edges
            .iter()
            .filter_map(|e| self.edge_segment(e.id))
            .collect()
    }

    /// The faces on either side of an edge
    pub fn edge_faces(&self, edge_id: EdgeId) -> (Option<FaceId>, Option<FaceId>) {
        let Some(edge) = self.edge(edge_id) else {
            return (None, None);
        };
        let face_of = |he: Option<HalfEdgeId>| he.and_then(|he| self.half_edge(he)).map(|he| he.face);
        (face_of(edge.first_half_edge), face_of(edge.second_half_edge))
    }

    /// All faces incident to a vertex
    ///
    /// Walks the half-edges leaving the vertex: from an outgoing half-edge,
    /// its predecessor comes into the vertex and the predecessor's twin leaves
    /// it again in the neighbouring face.
    pub fn incident_faces(&self, vertex_id: VertexId) -> Vec<FaceId> {
        let mut faces = Vec::new();
        let Some(start) = self.vertex(vertex_id).and_then(|v| v.leaving) else {
            return faces;
        };

        let mut visited = HashSet::new();
        let mut current = start;
        while visited.insert(current) {
            let Some(he) = self.half_edge(current) else {
                break;
            };
            if !faces.contains(&he.face) {
                faces.push(he.face);
            }

            match self.half_edge(he.prev).and_then(|prev| prev.twin) {
                Some(twin) if twin != start => current = twin,
                // Boundary or full loop
                _ => break,
            }
        }
        faces
    }

    // ========================================================================
    // Lookup by position
    // ========================================================================

    pub fn find_vertex_by_position(&self, position: DVec3, epsilon: f64) -> Option<VertexId> {
        self.vertices
            .iter()
            .find(|v| v.position.abs_diff_eq(position, epsilon))
            .map(|v| v.id)
    }

    pub fn has_vertex(&self, position: DVec3, epsilon: f64) -> bool {
        self.find_vertex_by_position(position, epsilon).is_some()
    }

    /// The vertex closest to `position`, if it is within `max_distance`
    pub fn find_closest_vertex(&self, position: DVec3, max_distance: f64) -> Option<VertexId> {
        self.vertices
            .iter()
            .map(|v| (v.id, v.position.distance_squared(position)))
            .filter(|(_, d)| *d <= max_distance * max_distance)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(id, _)| id)
    }

    /// Edge joining the two positions, in either direction
    pub fn find_edge_by_positions(&self, first: DVec3, second: DVec3, epsilon: f64) -> Option<EdgeId> {
        let wanted = Segment3::new(first, second);
        self.edges
            .iter()
            .find(|e| {
                self.edge_segment(e.id)
                    .is_some_and(|segment| segment.is_equal(&wanted, epsilon))
            })
            .map(|e| e.id)
    }

    pub fn has_edge(&self, first: DVec3, second: DVec3, epsilon: f64) -> bool {
        self.find_edge_by_positions(first, second, epsilon).is_some()
    }

    /// The edge whose farther endpoint is closest to the given endpoints,
    /// if that distance is within `max_distance`
    pub fn find_closest_edge(&self, first: DVec3, second: DVec3, max_distance: f64) -> Option<EdgeId> {
        self.edges
            .iter()
            .filter_map(|e| {
                let segment = self.edge_segment(e.id)?;
                let forward = segment.start.distance(first).max(segment.end.distance(second));
                let backward = segment.start.distance(second).max(segment.end.distance(first));
                Some((e.id, forward.min(backward)))
            })
            .filter(|(_, d)| *d <= max_distance)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(id, _)| id)
    }

    /// Face with exactly these vertices, up to rotation and winding
    pub fn find_face_by_positions(&self, positions: &[DVec3], epsilon: f64) -> Option<FaceId> {
        self.faces
            .iter()
            .find(|f| cyclic_match(&self.face_positions(f.id), positions, epsilon))
            .map(|f| f.id)
    }

    pub fn has_face(&self, positions: &[DVec3], epsilon: f64) -> bool {
        self.find_face_by_positions(positions, epsilon).is_some()
    }

    /// The face with as many vertices as `positions` whose vertices are all
    /// closest to them, if every vertex is within `max_distance`
    pub fn find_closest_face(&self, positions: &[DVec3], max_distance: f64) -> Option<FaceId> {
        self.faces
            .iter()
            .filter_map(|f| {
                let face_positions = self.face_positions(f.id);
                if face_positions.len() != positions.len() {
                    return None;
                }
                let error = positions
                    .iter()
                    .map(|p| {
                        face_positions
                            .iter()
                            .map(|q| q.distance(*p))
                            .fold(f64::INFINITY, f64::min)
                    })
                    .fold(0.0, f64::max);
                Some((f.id, error))
            })
            .filter(|(_, e)| *e <= max_distance)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(id, _)| id)
    }

    // ========================================================================
    // Face queries
    // ========================================================================

    pub fn face_point_status(&self, face_id: FaceId, point: DVec3) -> Option<PlaneStatus> {
        self.face(face_id).map(|f| f.plane.point_status(point))
    }

    /// Distance along the ray to where it hits the face polygon
    pub fn face_intersect_with_ray(&self, face_id: FaceId, ray: &Ray3, side: Side) -> Option<f64> {
        ray_polygon_intersection(ray, &self.face_positions(face_id), side)
    }
}
