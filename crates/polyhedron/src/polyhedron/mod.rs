//! Half-edge convex polyhedron
//!
//! Elements live in arenas owned by the polyhedron and refer to each other
//! through typed ids. Degenerate point sets are represented too: a single
//! vertex (point), two vertices joined by an edge without half-edges (edge),
//! or one face whose half-edges have no twins (polygon).

mod boolean;
mod construction;
mod modification;
mod topology;
mod types;
mod validation;

use std::collections::HashMap;

pub use construction::FaceLoop;
pub use types::{
    ClipResult, Edge, EdgeId, FaceGeometry, FaceId, GeometryError, GeometryEvent, HalfEdge,
    HalfEdgeId, PayloadId, Shape, Vertex, VertexId,
};

/// Convex polyhedron stored as a half-edge structure
#[derive(Debug, Clone, Default)]
pub struct Polyhedron {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) half_edges: Vec<HalfEdge>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) faces: Vec<FaceGeometry>,
    /// Map from (origin, destination) vertex pair to half-edge
    pub(crate) edge_map: HashMap<(VertexId, VertexId), HalfEdgeId>,
}
