//! Shape classification and validation for Polyhedron.

use super::types::{GeometryError, Shape};
use super::Polyhedron;

impl Polyhedron {
    /// Classify by element counts
    pub fn shape(&self) -> Shape {
        match (self.vertex_count(), self.face_count()) {
            (0, _) => Shape::Empty,
            (1, _) => Shape::Point,
            (2, _) => Shape::Edge,
            (_, faces) if faces >= 4 => Shape::Polyhedron,
            _ => Shape::Polygon,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shape() == Shape::Empty
    }

    pub fn is_point(&self) -> bool {
        self.shape() == Shape::Point
    }

    pub fn is_edge(&self) -> bool {
        self.shape() == Shape::Edge
    }

    pub fn is_polygon(&self) -> bool {
        self.shape() == Shape::Polygon
    }

    pub fn is_polyhedron(&self) -> bool {
        self.shape() == Shape::Polyhedron
    }

    /// Whether the faces enclose a volume
    ///
    /// Every half-edge must have a twin running the opposite way and the
    /// element counts must satisfy Euler's formula for a sphere.
    pub fn closed(&self) -> bool {
        if !self.is_polyhedron() {
            return false;
        }

        let twins_ok = self.half_edges.iter().all(|he| {
            let Some(twin) = he.twin.and_then(|t| self.half_edge(t)) else {
                return false;
            };
            twin.twin == Some(he.id) && self.destination(twin.id) == Some(he.origin)
        });

        let euler = self.vertex_count() as i64 - self.edge_count() as i64 + self.face_count() as i64;
        twins_ok && euler == 2
    }

    /// Check the internal consistency of the half-edge links
    ///
    /// Validates that:
    /// 1. Every face loop closes through consistent next/prev links
    /// 2. All twin relationships are symmetric
    /// 3. Every vertex's leaving half-edge starts at that vertex
    pub fn validate(&self) -> Result<(), GeometryError> {
        for he in &self.half_edges {
            let next = self.half_edge(he.next).ok_or_else(|| {
                GeometryError::InvalidTopology(format!("Half-edge {:?}: next {:?} doesn't exist", he.id, he.next))
            })?;
            if next.prev != he.id {
                return Err(GeometryError::InvalidTopology(format!(
                    "Half-edge {:?}: next.prev = {:?}, expected {:?}",
                    he.id, next.prev, he.id
                )));
            }
            if next.face != he.face {
                return Err(GeometryError::InvalidTopology(format!(
                    "Half-edge {:?}: next belongs to face {:?}, expected {:?}",
                    he.id, next.face, he.face
                )));
            }

            if let Some(twin_id) = he.twin {
                let twin = self.half_edge(twin_id).ok_or_else(|| {
                    GeometryError::InvalidTopology(format!("Half-edge {:?}: twin {:?} doesn't exist", he.id, twin_id))
                })?;
                if twin.twin != Some(he.id) {
                    return Err(GeometryError::InvalidTopology(format!(
                        "Half-edge {:?}: twin.twin = {:?}, expected {:?}",
                        he.id, twin.twin, he.id
                    )));
                }
                if twin.edge != he.edge {
                    return Err(GeometryError::InvalidTopology(format!(
                        "Half-edge {:?}: twin on edge {:?}, expected {:?}",
                        he.id, twin.edge, he.edge
                    )));
                }
            }
        }

        for face in &self.faces {
            let loop_len = self.face_half_edges(face.id).len();
            if loop_len < 3 {
                return Err(GeometryError::InvalidTopology(format!(
                    "Face {:?} has only {} half-edges",
                    face.id, loop_len
                )));
            }
        }

        for vertex in &self.vertices {
            if let Some(leaving) = vertex.leaving {
                let origin = self.half_edge(leaving).map(|he| he.origin);
                if origin != Some(vertex.id) {
                    return Err(GeometryError::InvalidTopology(format!(
                        "Vertex {:?}: leaving half-edge {:?} starts at {:?}",
                        vertex.id, leaving, origin
                    )));
                }
            }
        }

        Ok(())
    }
}
