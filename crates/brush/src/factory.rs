//! Face creation for operations that derive new brushes from geometry

use glam::DVec3;

use crate::error::BrushError;
use crate::face::BrushFace;
use crate::tex_coords::BrushFaceAttributes;

/// Builds faces from three plane points
///
/// Boolean operations produce geometry without faces; the factory decides
/// how faces for it are set up.
pub trait FaceFactory {
    fn create_face(
        &self,
        p0: DVec3,
        p1: DVec3,
        p2: DVec3,
        attributes: &BrushFaceAttributes,
    ) -> Result<BrushFace, BrushError>;
}

/// Faces with paraxial texture axes
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFaceFactory;

impl FaceFactory for StandardFaceFactory {
    fn create_face(
        &self,
        p0: DVec3,
        p1: DVec3,
        p2: DVec3,
        attributes: &BrushFaceAttributes,
    ) -> Result<BrushFace, BrushError> {
        BrushFace::new([p0, p1, p2], attributes.clone())
    }
}
