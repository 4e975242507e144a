//! Type definitions for the half-edge polyhedron.

use glam::DVec3;

use crate::math::Plane;

/// Type-safe vertex identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Type-safe half-edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HalfEdgeId(pub u32);

/// Type-safe edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

/// Type-safe face identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

/// Handle of the object a face geometry belongs to.
///
/// The polyhedron never owns what a payload refers to. Brushes use it as an
/// index into their own face list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PayloadId(pub u32);

impl PayloadId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A vertex of the polyhedron
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub position: DVec3,
    /// One half-edge leaving this vertex (None for point and edge shapes)
    pub leaving: Option<HalfEdgeId>,
}

/// A half-edge on the boundary of a face
///
/// Faces are wound counter-clockwise when seen from outside the solid.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub id: HalfEdgeId,
    /// The vertex this half-edge originates from
    pub origin: VertexId,
    /// The opposite half-edge (None only for polygon shapes)
    pub twin: Option<HalfEdgeId>,
    /// The next half-edge around the face
    pub next: HalfEdgeId,
    /// The previous half-edge around the face
    pub prev: HalfEdgeId,
    pub face: FaceId,
    pub edge: EdgeId,
}

/// An undirected edge, made of up to two half-edges
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub first_vertex: VertexId,
    pub second_vertex: VertexId,
    pub first_half_edge: Option<HalfEdgeId>,
    pub second_half_edge: Option<HalfEdgeId>,
}

/// A face of the polyhedron
#[derive(Debug, Clone)]
pub struct FaceGeometry {
    pub id: FaceId,
    /// One half-edge on the boundary of this face
    pub half_edge: HalfEdgeId,
    /// Supporting plane, normal pointing out of the solid
    pub plane: Plane,
    /// Back-reference to the object that produced this face, if any
    pub payload: Option<PayloadId>,
}

/// Degeneracy class of a polyhedron
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Empty,
    Point,
    Edge,
    Polygon,
    Polyhedron,
}

/// Outcome of clipping a polyhedron with a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipResult {
    /// No vertex was above the plane
    Unchanged,
    /// No vertex was below the plane, nothing remains
    Empty,
    /// The polyhedron was cut and gained a face on the plane
    Success,
}

impl ClipResult {
    pub fn is_empty(self) -> bool {
        self == ClipResult::Empty
    }
}

/// Topology changes reported while a polyhedron is modified
///
/// Owners of payload objects listen to these to keep their objects in
/// step with the face geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryEvent {
    /// A new face was created, `payload` is what it was given
    FaceCreated {
        face: FaceId,
        payload: Option<PayloadId>,
    },
    /// The face is about to disappear together with its payload reference
    FaceWillBeDeleted {
        face: FaceId,
        payload: Option<PayloadId>,
    },
    /// `removed` is merged into `kept`, only `kept`'s payload survives
    FacesWillBeMerged {
        kept: FaceId,
        removed: FaceId,
        removed_payload: Option<PayloadId>,
    },
}

/// Errors that can occur during polyhedron operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Degenerate plane points: {0:?}")]
    DegeneratePlanePoints([DVec3; 3]),
    #[error("Invalid polyhedron topology: {0}")]
    InvalidTopology(String),
}
