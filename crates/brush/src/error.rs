use glam::DVec3;
use polyhedron::GeometryError;

/// Errors raised when a brush cannot be built or rebuilt
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BrushError {
    #[error("Brush is empty")]
    Empty,
    #[error("Brush is invalid")]
    Invalid,
    #[error("Brush is not fully specified")]
    NotFullySpecified,
    #[error("Face points are collinear: {0:?}")]
    DegenerateFace([DVec3; 3]),
    #[error("Face index {0} out of range")]
    FaceIndexOutOfRange(usize),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
