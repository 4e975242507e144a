//! Correlates the faces of a polyhedron before and after an edit.
//!
//! The left polyhedron is the old geometry, the right one the new. A vertex
//! correspondence says where each old vertex went; faces are paired by how
//! many of their vertices map onto each other.

use std::collections::{HashMap, HashSet};

use brushwork_config::ALMOST_ZERO;
use glam::DVec3;

use crate::polyhedron::{FaceId, Polyhedron, VertexId};

pub struct PolyhedronMatcher<'a> {
    left: &'a Polyhedron,
    right: &'a Polyhedron,
    /// Right vertex to the left vertex it came from
    right_to_left: HashMap<VertexId, VertexId>,
}

impl<'a> PolyhedronMatcher<'a> {
    /// Vertices correspond where their positions are equal
    pub fn new(left: &'a Polyhedron, right: &'a Polyhedron) -> Self {
        Self::with_vertex_mapping(left, right, &[])
    }

    /// Use an explicit `(old position, new position)` correspondence.
    /// Vertices it does not mention correspond by position.
    pub fn with_vertex_mapping(left: &'a Polyhedron, right: &'a Polyhedron, mapping: &[(DVec3, DVec3)]) -> Self {
        let mut right_to_left = HashMap::new();
        let mut mapped_left = HashSet::new();

        for (old, new) in mapping {
            let (Some(left_vertex), Some(right_vertex)) = (
                left.find_vertex_by_position(*old, ALMOST_ZERO),
                right.find_vertex_by_position(*new, ALMOST_ZERO),
            ) else {
                continue;
            };
            right_to_left.entry(right_vertex).or_insert(left_vertex);
            mapped_left.insert(left_vertex);
        }

        for left_vertex in left.vertices() {
            if mapped_left.contains(&left_vertex.id) {
                continue;
            }
            if let Some(right_vertex) = right.find_vertex_by_position(left_vertex.position, ALMOST_ZERO) {
                right_to_left.entry(right_vertex).or_insert(left_vertex.id);
            }
        }

        Self {
            left,
            right,
            right_to_left,
        }
    }

    pub fn left(&self) -> &'a Polyhedron {
        self.left
    }

    pub fn right(&self) -> &'a Polyhedron {
        self.right
    }

    /// Call `visitor` with the best matching old face for every new face
    ///
    /// The best match shares the most mapped vertices; ties go to the face
    /// whose normal is closest.
    pub fn process_right_faces(&self, mut visitor: impl FnMut(FaceId, FaceId)) {
        let left_faces: Vec<(FaceId, HashSet<VertexId>, DVec3)> = self
            .left
            .faces()
            .iter()
            .map(|f| (f.id, self.left.face_vertices(f.id).into_iter().collect(), f.plane.normal))
            .collect();

        for right_face in self.right.faces() {
            let mapped: Vec<VertexId> = self
                .right
                .face_vertices(right_face.id)
                .iter()
                .filter_map(|v| self.right_to_left.get(v).copied())
                .collect();

            let best = left_faces
                .iter()
                .map(|(id, vertices, normal)| {
                    let shared = mapped.iter().filter(|v| vertices.contains(v)).count();
                    (*id, shared, normal.dot(right_face.plane.normal))
                })
                .max_by(|a, b| a.1.cmp(&b.1).then(a.2.total_cmp(&b.2)));

            if let Some((left_face, _, _)) = best {
                visitor(left_face, right_face.id);
            }
        }
    }

    /// Call `visitor` with every pair of corresponding vertices of the two faces
    pub fn visit_matching_vertex_pairs(&self, left_face: FaceId, right_face: FaceId, mut visitor: impl FnMut(VertexId, VertexId)) {
        let left_vertices: HashSet<VertexId> = self.left.face_vertices(left_face).into_iter().collect();
        for right_vertex in self.right.face_vertices(right_face) {
            if let Some(left_vertex) = self.right_to_left.get(&right_vertex) {
                if left_vertices.contains(left_vertex) {
                    visitor(*left_vertex, right_vertex);
                }
            }
        }
    }
}
